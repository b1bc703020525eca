//! Error types for cryptographic operations.

use thiserror::Error;

/// Coarse classification of a [`CryptoError`].
///
/// Callers that only need to decide how to report a failure match on the
/// kind instead of on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input rejected before any cryptographic work (empty, oversized, weak key).
    Validation,
    /// Serialized input is malformed or uses an unknown version/algorithm.
    Format,
    /// Decryption produced no plausible output: wrong key or corrupted data.
    CryptoFailure,
    /// The requested algorithm is not in the registry.
    UnsupportedAlgorithm,
    /// Unexpected failure in an underlying primitive or I/O.
    Internal,
}

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Required input is empty or blank.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Password too short.
    #[error("Password too short (minimum {0} characters required)")]
    PasswordTooShort(usize),

    /// Payload exceeds the configured maximum.
    #[error("Payload too large: {size} bytes (maximum {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid public parameters or key material.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Unsupported format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// Invalid format.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A required field is absent from a serialized structure.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Algorithm selector not in the registry.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Decryption failed - wrong key or corrupted data.
    #[error("Decryption failed: wrong key or corrupted data")]
    Decryption,

    /// Encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Key generation failed.
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key-value store error.
    #[error("Store error: {0}")]
    Store(#[from] encryptor_core::Error),
}

impl CryptoError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CryptoError::EmptyInput(_)
            | CryptoError::PasswordTooShort(_)
            | CryptoError::PayloadTooLarge { .. }
            | CryptoError::InvalidInput(_)
            | CryptoError::InvalidParameters(_) => ErrorKind::Validation,
            CryptoError::UnsupportedVersion(_)
            | CryptoError::InvalidFormat(_)
            | CryptoError::MissingField(_) => ErrorKind::Format,
            CryptoError::Decryption => ErrorKind::CryptoFailure,
            CryptoError::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            CryptoError::Store(encryptor_core::Error::InvalidKey(_)) => ErrorKind::Validation,
            CryptoError::Encryption(_)
            | CryptoError::KeyGeneration(_)
            | CryptoError::Io(_)
            | CryptoError::Json(_)
            | CryptoError::Store(_) => ErrorKind::Internal,
        }
    }
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
