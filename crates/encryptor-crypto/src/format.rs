//! Shared encoding utilities for the textual wire formats.

use base64::Engine;

use crate::error::{CryptoError, CryptoResult};

/// Encode bytes as standard base64.
pub fn base64_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

/// Decode a standard base64 string to bytes.
pub fn base64_decode(data: &str) -> CryptoResult<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid base64: {}", e)))
}

/// Decode a hex field, naming the field in the error.
pub fn hex_decode(data: &str, field: &str) -> CryptoResult<Vec<u8>> {
    hex::decode(data.trim())
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid hex in {}: {}", field, e)))
}
