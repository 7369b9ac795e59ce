//! Error types for restbridge-ops.

/// Result type alias for restbridge-ops operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for restbridge-ops operations.
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

    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation(message.into()))
    }

    /// Returns true if the caller's input was rejected before any request.
    pub fn is_validation_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_))
    }

    /// The request engine error, if this error came from a downstream call.
    pub fn client_error(&self) -> Option<&restbridge_client::Error> {
        match &self.kind {
            ErrorKind::Client(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the downstream resource does not exist (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        self.client_error().is_some_and(|e| e.is_not_found())
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed caller input. Never sent over the wire.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the request engine.
    #[error("{0}")]
    Client(restbridge_client::Error),
}

impl From<restbridge_client::Error> for Error {
    fn from(err: restbridge_client::Error) -> Self {
        Error::new(ErrorKind::Client(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = Error::validation("id is required");
        assert!(err.is_validation_error());
        assert_eq!(err.to_string(), "Validation error: id is required");
        assert!(err.client_error().is_none());
    }

    #[test]
    fn test_client_error_keeps_message() {
        let err: Error = restbridge_client::Error::new(restbridge_client::ErrorKind::Connection(
            restbridge_client::ConnectionFailure::HostNotFound,
        ))
        .into();
        assert_eq!(err.to_string(), "host not found");
        assert!(err.client_error().is_some_and(|e| e.is_connection_error()));
        assert!(!err.is_not_found());
    }
}
