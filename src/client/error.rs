use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KintoErrorCode {
    Configuration,
    InvalidArgument,
    Network,
    UnexpectedStatus,
    Decode,
    Internal,
}

impl KintoErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KintoErrorCode::Configuration => "kinto/configuration",
            KintoErrorCode::InvalidArgument => "kinto/invalid-argument",
            KintoErrorCode::Network => "kinto/network",
            KintoErrorCode::UnexpectedStatus => "kinto/unexpected-status",
            KintoErrorCode::Decode => "kinto/decode",
            KintoErrorCode::Internal => "kinto/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct KintoError {
    pub code: KintoErrorCode,
    message: String,
    status: Option<u16>,
}

impl KintoError {
    pub fn new(code: KintoErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status returned by the server, when the failure came from one.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Whether the error was raised locally before any request was sent.
    pub fn is_configuration(&self) -> bool {
        self.code == KintoErrorCode::Configuration
    }
}

impl Display for KintoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for KintoError {}

pub type KintoResult<T> = Result<T, KintoError>;

pub fn configuration_error(message: impl Into<String>) -> KintoError {
    KintoError::new(KintoErrorCode::Configuration, message)
}

pub fn invalid_argument(message: impl Into<String>) -> KintoError {
    KintoError::new(KintoErrorCode::InvalidArgument, message)
}

pub fn network_error(message: impl Into<String>) -> KintoError {
    KintoError::new(KintoErrorCode::Network, message)
}

pub fn unexpected_status(status: u16, message: impl Into<String>) -> KintoError {
    KintoError {
        status: Some(status),
        ..KintoError::new(KintoErrorCode::UnexpectedStatus, message)
    }
}

pub fn decode_error(message: impl Into<String>) -> KintoError {
    KintoError::new(KintoErrorCode::Decode, message)
}

pub fn internal_error(message: impl Into<String>) -> KintoError {
    KintoError::new(KintoErrorCode::Internal, message)
}
