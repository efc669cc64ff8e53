//! Error types for bucketfs
//!
//! A single error enum is shared by the adapter, the storage clients and the CLI.
//! Storage clients translate their SDK failures into these variants; the adapter
//! passes them through unchanged except where an operation documents otherwise.

use thiserror::Error;

/// Result type alias using the bucketfs error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by filesystem operations and storage clients
#[derive(Debug, Error)]
pub enum Error {
    /// Path, container or key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Structurally disallowed request, e.g. mkdir at the root
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Operation is declared but has no implementation
    #[error("{0}: Not Implemented")]
    NotImplemented(&'static str),

    /// Raw listing record that does not fit the listing it came from
    #[error("Unsupported record: {0}")]
    UnsupportedRecord(String),

    /// Conditional read matched the current entity tag
    #[error("Not modified: {0}")]
    NotModified(String),

    /// Opaque failure reported by the storage service
    #[error("Backend error: {0}")]
    Backend(String),

    /// Transport failure talking to the storage service
    #[error("Network error: {0}")]
    Network(String),

    /// Storage service asked the caller to back off (HTTP 429 or 503)
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Credentials rejected by the storage service
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid or unusable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this error means the addressed path is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Whether the failure is transient, so repeating the call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Network(_) | Error::Throttled(_) => true,
            Error::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Name of the operation for `NotImplemented` errors
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Error::NotImplemented(op) => Some(op),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_message_names_operation() {
        let err = Error::NotImplemented("rename");
        assert_eq!(err.to_string(), "rename: Not Implemented");
        assert_eq!(err.operation(), Some("rename"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("/docs/a.txt".to_string()).is_not_found());
        assert!(!Error::Backend("boom".to_string()).is_not_found());
        assert_eq!(Error::Backend("boom".to_string()).operation(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_is_transient() {
        assert!(Error::Throttled("HTTP 503: SlowDown".into()).is_transient());
        assert!(Error::Network("Request timeout".into()).is_transient());
        assert!(
            Error::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_transient()
        );
        assert!(!Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_transient());
        assert!(!Error::Auth("HTTP 403: denied".into()).is_transient());
        assert!(!Error::Backend("HTTP 500: boom".into()).is_transient());
        assert!(!Error::NotModified("/docs/a".into()).is_transient());
    }
}
