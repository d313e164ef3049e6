use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::engine::Engine as _;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::client::constants::{DEFAULT_TIMEOUT, KINTO_TOKEN_ENV, KINTO_URL_ENV};
use crate::client::error::{
    configuration_error, decode_error, internal_error, invalid_argument, network_error,
    unexpected_status, KintoError, KintoResult,
};

/// A single HTTP exchange against the Kinto API, relative to the server URL.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<JsonValue>,
    /// Accepted status codes. `None` accepts any 2xx response.
    pub expects: Option<Vec<u16>>,
}

impl TransportRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            expects: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn expecting(mut self, codes: &[u16]) -> Self {
        self.expects = Some(codes.to_vec());
        self
    }
}

/// Performs HTTP+JSON requests on behalf of the resource client.
pub trait Transport: Send + Sync {
    fn request(&self, request: TransportRequest) -> KintoResult<JsonValue>;
}

/// Blocking `reqwest` transport carrying the server URL and encoded credential.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
    timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct HttpTransportBuilder {
    server_url: String,
    token: Option<String>,
    timeout: Duration,
    client: Option<Client>,
}

impl HttpTransportBuilder {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> KintoResult<HttpTransport> {
        let mut base_url = Url::parse(&self.server_url).map_err(|err| {
            invalid_argument(format!("Invalid server url '{}': {err}", self.server_url))
        })?;

        // Relative joins drop the last segment unless the base ends with a slash.
        if !base_url.path().ends_with('/') {
            let mut path = base_url.path().trim_end_matches('/').to_owned();
            path.push('/');
            base_url.set_path(&path);
        }

        let authorization = match self.token.as_deref() {
            Some(token) if !token.is_empty() => Some(basic_authorization(token)?),
            _ => None,
        };

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|err| internal_error(format!("Failed to build HTTP client: {err}")))?,
        };

        Ok(HttpTransport {
            client,
            base_url,
            authorization,
            timeout: self.timeout,
        })
    }
}

impl HttpTransport {
    pub fn builder(server_url: impl Into<String>) -> HttpTransportBuilder {
        HttpTransportBuilder::new(server_url)
    }

    /// Builds a transport from `KINTO_URL` and the optional `KINTO_TOKEN`.
    pub fn from_env() -> KintoResult<Self> {
        let url = std::env::var(KINTO_URL_ENV)
            .map_err(|_| configuration_error(format!("{KINTO_URL_ENV} must be set")))?;
        let mut builder = Self::builder(url);
        if let Ok(token) = std::env::var(KINTO_TOKEN_ENV) {
            builder = builder.with_token(token);
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str, query: &[(String, String)]) -> KintoResult<Url> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| invalid_argument(format!("Failed to compose url for '{path}': {err}")))?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

impl Transport for HttpTransport {
    fn request(&self, request: TransportRequest) -> KintoResult<JsonValue> {
        let TransportRequest {
            method,
            path,
            query,
            body,
            expects,
        } = request;

        let url = self.url_for(&path, &query)?;
        log::debug!("kinto request {method} {url}");

        let mut builder = self
            .client
            .request(method.clone(), url)
            .timeout(self.timeout);
        if let Some(authorization) = &self.authorization {
            builder = builder.header(AUTHORIZATION, authorization.clone());
        }
        if let Some(payload) = &body {
            builder = builder.json(payload);
        }

        let response = builder.send().map_err(map_reqwest_error)?;
        log::debug!("kinto response {method} {path}: {}", response.status());
        handle_response(response, expects.as_deref())
    }
}

fn basic_authorization(token: &str) -> KintoResult<HeaderValue> {
    let encoded = STANDARD.encode(format!("token:{token}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .map_err(|err| invalid_argument(format!("Invalid authorization token: {err}")))?;
    value.set_sensitive(true);
    Ok(value)
}

fn handle_response(response: Response, expects: Option<&[u16]>) -> KintoResult<JsonValue> {
    let status = response.status();
    let text = response
        .text()
        .map_err(|err| decode_error(format!("Failed to read response body: {err}")))?;

    let accepted = match expects {
        Some(codes) => codes.contains(&status.as_u16()),
        None => status.is_success(),
    };
    if !accepted {
        return Err(map_http_error(status, &text));
    }

    if text.is_empty() {
        return Ok(JsonValue::Null);
    }

    serde_json::from_str(&text)
        .map_err(|err| decode_error(format!("Response is not valid JSON: {err}")))
}

fn map_reqwest_error(err: reqwest::Error) -> KintoError {
    if err.is_timeout() {
        return network_error(format!("Kinto request timed out: {err}"));
    }
    if err.is_connect() {
        return network_error(format!("Failed to connect to Kinto: {err}"));
    }
    if err.is_decode() {
        return decode_error(format!("Unable to decode Kinto response: {err}"));
    }
    if let Some(status) = err.status() {
        return map_http_error(status, "");
    }
    network_error(format!("Kinto request failed: {err}"))
}

#[derive(Debug, Deserialize)]
struct KintoErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn map_http_error(status: StatusCode, body: &str) -> KintoError {
    let message = extract_message(body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("HTTP error").to_string());
    unexpected_status(
        status.as_u16(),
        format!("Kinto responded with status {}: {message}", status.as_u16()),
    )
}

fn extract_message(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<KintoErrorBody>(body) {
        Ok(payload) => payload.message.or(payload.error),
        Err(_) => Some(body.to_string()),
    }
}
