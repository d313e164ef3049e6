//! Named, level-filtered loggers used by the gateway and query layers.
//!
//! Every component owns a `static` [`Logger`] named `@kinto/<component>`. Levels and
//! handlers can be changed per instance or for every live instance at once through
//! [`set_log_level`] and [`set_log_handler`]. Transport-level request tracing goes
//! through the `log` facade instead.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INSTANCES: LazyLock<Mutex<Vec<Weak<LoggerInner>>>> =
    LazyLock::new(|| Mutex::new(Vec::new()));

pub type LogHandler = Arc<dyn Fn(&LogRecord) + Send + Sync + 'static>;

/// One emitted log line, as handed to handlers.
#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub logger: String,
    pub level: LogLevel,
    pub message: String,
    /// Structured key/values attached with the `*_with` methods.
    pub context: Option<Value>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let now = self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true);
        write!(f, "[{now}]  {}: {}", self.logger, self.message)?;
        if let Some(context) = &self.context {
            write!(f, " {context}")?;
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    name: String,
    log_level: AtomicU8,
    handler: RwLock<Option<LogHandler>>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        let inner = Arc::new(LoggerInner {
            name: name.into(),
            log_level: AtomicU8::new(GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)),
            handler: RwLock::new(None),
        });
        INSTANCES.lock().unwrap().push(Arc::downgrade(&inner));
        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.log_level.load(Ordering::SeqCst))
    }

    pub fn set_log_level(&self, level: LogLevel) {
        self.inner.log_level.store(level as u8, Ordering::SeqCst);
    }

    /// Replaces the default stdout/stderr output with `handler`.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&LogRecord) + Send + Sync + 'static,
    {
        *self.inner.handler.write().unwrap() = Some(Arc::new(handler));
    }

    pub fn clear_handler(&self) {
        self.inner.handler.write().unwrap().take();
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(LogLevel::Debug, message.into(), None);
    }

    pub fn debug_with(&self, message: impl Into<String>, context: Value) {
        self.emit(LogLevel::Debug, message.into(), Some(context));
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message.into(), None);
    }

    pub fn info_with(&self, message: impl Into<String>, context: Value) {
        self.emit(LogLevel::Info, message.into(), Some(context));
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warn, message.into(), None);
    }

    pub fn warn_with(&self, message: impl Into<String>, context: Value) {
        self.emit(LogLevel::Warn, message.into(), Some(context));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message.into(), None);
    }

    fn emit(&self, level: LogLevel, message: String, context: Option<Value>) {
        if level == LogLevel::Silent || level < self.log_level() {
            return;
        }
        let record = LogRecord {
            timestamp: Utc::now(),
            logger: self.name().to_owned(),
            level,
            message,
            context,
        };
        let handler = self.inner.handler.read().unwrap().clone();
        match handler {
            Some(handler) => handler(&record),
            None => default_log_handler(&record),
        }
    }
}

fn default_log_handler(record: &LogRecord) {
    match record.level {
        LogLevel::Warn | LogLevel::Error => eprintln!("{record}"),
        _ => println!("{record}"),
    }
}

fn with_instances<F>(mut f: F)
where
    F: FnMut(Logger),
{
    let mut instances = INSTANCES.lock().unwrap();
    instances.retain(|weak| weak.strong_count() > 0);
    for inner in instances.iter().filter_map(Weak::upgrade) {
        f(Logger { inner });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Silent = 4,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Silent => "silent",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Warn,
            3 => LogLevel::Error,
            _ => LogLevel::Silent,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "silent" => Ok(LogLevel::Silent),
            other => Err(LogError::InvalidLogLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogError {
    InvalidLogLevel(String),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidLogLevel(level) => write!(f, "Invalid log level \"{level}\""),
        }
    }
}

impl std::error::Error for LogError {}

/// Sets the level of every live logger and of loggers created afterwards.
pub fn set_log_level(level: LogLevel) {
    GLOBAL_LOG_LEVEL.store(level as u8, Ordering::SeqCst);
    with_instances(|logger| logger.set_log_level(level));
}

/// Installs `handler` on every live logger, or restores the default output with `None`.
pub fn set_log_handler(handler: Option<LogHandler>) {
    with_instances(|logger| match &handler {
        Some(handler) => {
            let handler = Arc::clone(handler);
            logger.set_handler(move |record| handler(record));
        }
        None => logger.clear_handler(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static TEST_GUARD: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    fn capture(logger: &Logger) -> Arc<Mutex<Vec<LogRecord>>> {
        let records = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&records);
        logger.set_handler(move |record| sink.lock().unwrap().push(record.clone()));
        records
    }

    #[test]
    fn respects_instance_level() {
        let _guard = TEST_GUARD.lock().unwrap();
        let logger = Logger::new("@kinto/logger-level-test");
        logger.set_log_level(LogLevel::Warn);
        let records = capture(&logger);

        logger.debug("debug message");
        logger.info("info message");
        logger.warn("warn message");
        logger.error("error message");

        let levels: Vec<_> = records.lock().unwrap().iter().map(|r| r.level).collect();
        assert_eq!(levels, [LogLevel::Warn, LogLevel::Error]);
    }

    #[test]
    fn global_level_reaches_live_instances() {
        let _guard = TEST_GUARD.lock().unwrap();
        let logger = Logger::new("@kinto/logger-global-test");
        set_log_level(LogLevel::Debug);
        assert_eq!(logger.log_level(), LogLevel::Debug);
        set_log_level(LogLevel::Info);
        assert_eq!(logger.log_level(), LogLevel::Info);
    }

    #[test]
    fn context_is_attached_to_records() {
        let _guard = TEST_GUARD.lock().unwrap();
        let logger = Logger::new("@kinto/logger-context-test");
        logger.set_log_level(LogLevel::Debug);
        let records = capture(&logger);

        logger.info_with("created record", json!({"bucket": "blog", "id": "abc"}));

        let stored = records.lock().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].logger, "@kinto/logger-context-test");
        assert_eq!(stored[0].context, Some(json!({"bucket": "blog", "id": "abc"})));
        assert!(stored[0]
            .to_string()
            .ends_with("@kinto/logger-context-test: created record {\"bucket\":\"blog\",\"id\":\"abc\"}"));
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
