//! Format detection for encrypted documents.
//!
//! Classifies a buffer by its shape only; nothing is decrypted and a match
//! does not guarantee the document parses.

use serde::Serialize;
use serde_json::Value;

use crate::keystore::is_key_file;

/// Detected document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    /// Password envelope (`version`, `alg`, `ctB64`, …).
    Envelope,
    /// ECIES message (`ephemeralPublicKey`, `encrypted`).
    Ecies,
    /// Hybrid key-wrap package (`encryptedMessage`, `encryptedAesKey`).
    Hybrid,
    /// ElGamal ciphertext (`[{"a": …, "b": …}, …]`).
    ElGamal,
    /// Passphrase-protected key file (ENCKEY01).
    KeyFile,
    /// Anything else.
    Unknown,
}

/// Detect the format of a document from its bytes.
pub fn detect_format(data: &[u8]) -> DocumentFormat {
    if is_key_file(data) {
        return DocumentFormat::KeyFile;
    }

    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return DocumentFormat::Unknown;
    };

    match &value {
        Value::Object(obj) => {
            if obj.contains_key("ephemeralPublicKey") {
                DocumentFormat::Ecies
            } else if obj.contains_key("encryptedAesKey") || obj.contains_key("encryptedMessage") {
                DocumentFormat::Hybrid
            } else if obj.contains_key("ctB64") && obj.contains_key("alg") {
                DocumentFormat::Envelope
            } else {
                DocumentFormat::Unknown
            }
        }
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) if first.contains_key("a") && first.contains_key("b") => {
                DocumentFormat::ElGamal
            }
            _ => DocumentFormat::Unknown,
        },
        _ => DocumentFormat::Unknown,
    }
}

/// Check if a document looks encrypted.
pub fn is_encrypted(data: &[u8]) -> bool {
    !matches!(detect_format(data), DocumentFormat::Unknown)
}
