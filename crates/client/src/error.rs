//! Error types for restbridge-client.

use std::time::Duration;

/// Result type alias for restbridge-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for restbridge-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    /// Returns the HTTP status code for HTTP and rate-limit errors.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            ErrorKind::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// Returns true if this is a rate limit error (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self.kind, ErrorKind::RateLimited { .. })
    }

    /// Returns true for transport-level failures that drive failover.
    pub fn is_connection_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Connection(_))
    }

    /// Returns true if this is an authentication error (HTTP 401).
    pub fn is_auth_error(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns true if the resource does not exist (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns true for missing or invalid configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Configuration(_))
    }

    /// Returns the retry-after hint if this is a rate limit error.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            ErrorKind::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Response body of an HTTP error, if any.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match &self.kind {
            ErrorKind::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Stable transport failure classes.
///
/// Their Display output is what callers see; the transport's own wording is
/// only kept in the error source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    Refused,
    HostNotFound,
    TimedOut,
    Reset,
    Other,
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConnectionFailure::Refused => "connection refused",
            ConnectionFailure::HostNotFound => "host not found",
            ConnectionFailure::TimedOut => "connection timed out",
            ConnectionFailure::Reset => "connection reset",
            ConnectionFailure::Other => "connection failed",
        })
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Missing or invalid configuration. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input. Never sent over the wire.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Token endpoint failure.
    #[error("Token error: {0}")]
    Token(String),

    /// Non-2xx response.
    #[error("HTTP error: {status} {message}")]
    Http {
        status: u16,
        message: String,
        body: serde_json::Value,
    },

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limited{}", retry_suffix(retry_after))]
    RateLimited { retry_after: Option<Duration> },

    /// Transport-level failure.
    #[error("{0}")]
    Connection(ConnectionFailure),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Body serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

fn retry_suffix(retry_after: &Option<Duration>) -> String {
    retry_after
        .map(|d| format!(", retry after {:?}", d))
        .unwrap_or_default()
}

/// Classify a transport error by walking its source chain.
fn classify_transport(err: &reqwest::Error) -> ConnectionFailure {
    if err.is_timeout() {
        return ConnectionFailure::TimedOut;
    }

    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(current) = source {
        if let Some(io) = current.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::ConnectionRefused => return ConnectionFailure::Refused,
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                    return ConnectionFailure::Reset
                }
                std::io::ErrorKind::TimedOut => return ConnectionFailure::TimedOut,
                _ => {}
            }
        }
        let message = current.to_string().to_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
            || message.contains("no such host")
        {
            return ConnectionFailure::HostNotFound;
        }
        if message.contains("connection refused") {
            return ConnectionFailure::Refused;
        }
        source = current.source();
    }

    ConnectionFailure::Other
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_builder() {
            ErrorKind::Configuration(err.to_string())
        } else if err.is_timeout() || err.is_connect() || err.is_request() {
            ErrorKind::Connection(classify_transport(&err))
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                message: err.to_string(),
                body: serde_json::Value::Null,
            }
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidUrl(err.to_string()), err)
    }
}

impl From<restbridge_auth::Error> for Error {
    fn from(err: restbridge_auth::Error) -> Self {
        let kind = match &err.kind {
            restbridge_auth::ErrorKind::Configuration(message) => {
                ErrorKind::Configuration(message.clone())
            }
            restbridge_auth::ErrorKind::Token { error, description } => {
                ErrorKind::Token(format!("{} - {}", error, description))
            }
            other => ErrorKind::Token(other.to_string()),
        };
        Error::with_source(kind, err)
    }
}
