//! Error types for encryptor storage and shared utilities.

use thiserror::Error;

/// Result type alias using encryptor-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for encryptor-core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Store key is empty or contains characters outside the allowed set
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_display() {
        let err = Error::InvalidKey("../etc".into());
        assert!(err.to_string().contains("../etc"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
