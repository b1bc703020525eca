//! Password-based key derivation.
//!
//! Envelopes use PBKDF2-HMAC-SHA256 with a fixed iteration count; the key
//! length is expressed in 32-bit words, matching the cipher registry. Private
//! key material stored by the CLI keystore uses Argon2id instead.

use argon2::{Algorithm, Argon2, Params, Version};
use encryptor_core::defaults::{MIN_PASSWORD_LENGTH, PBKDF2_ITERATIONS};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::trace;
use zeroize::{Zeroizing, ZeroizeOnDrop};

use crate::codec::{bytes_to_words, WordArray};
use crate::error::{CryptoError, CryptoResult};

#[cfg(test)]
thread_local! {
    /// PBKDF2 runs performed on this thread.
    pub(crate) static DERIVATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Key wrapper with automatic zeroization on drop.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKey {
    key: WordArray,
}

impl DerivedKey {
    /// Create a derived key from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            key: bytes_to_words(bytes),
        }
    }

    /// Key length in bytes.
    pub fn len(&self) -> usize {
        self.key.sig_bytes()
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.key.sig_bytes() == 0
    }

    /// The key as packed words.
    pub fn words(&self) -> &WordArray {
        &self.key
    }

    /// Unpack the key bytes.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.key.to_bytes())
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Validate a password before any derivation work.
pub fn validate_password(password: &str) -> CryptoResult<()> {
    if password.trim().is_empty() {
        return Err(CryptoError::EmptyInput("password".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CryptoError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Derive a key of `output_len_words` 32-bit words with PBKDF2-HMAC-SHA256.
///
/// Deterministic for a given `(password, salt, output_len_words)`. Every call
/// performs the full iteration count; results are never cached.
pub fn derive_key(
    password: &str,
    salt: &[u8],
    output_len_words: usize,
) -> CryptoResult<DerivedKey> {
    validate_password(password)?;
    if output_len_words == 0 {
        return Err(CryptoError::InvalidInput(
            "Key length must be at least one word".to_string(),
        ));
    }
    if salt.is_empty() {
        return Err(CryptoError::InvalidInput("Salt must not be empty".to_string()));
    }

    let mut out = Zeroizing::new(vec![0u8; output_len_words * 4]);
    #[cfg(test)]
    DERIVATIONS.with(|n| n.set(n.get() + 1));
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    trace!(subsystem = "kdf", words = output_len_words, "Derived key");

    Ok(DerivedKey {
        key: bytes_to_words(&out),
    })
}

/// Argon2id parameters for protecting stored private keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageKdfParams {
    /// Memory in KiB (default: 65536 = 64 MiB).
    pub memory_kib: u32,
    /// Time iterations (default: 3).
    pub iterations: u32,
    /// Parallelism degree (default: 4).
    pub parallelism: u32,
}

impl Default for StorageKdfParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MiB
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl StorageKdfParams {
    /// Low-memory parameters (for resource-constrained environments and tests).
    pub fn low_memory() -> Self {
        Self {
            memory_kib: 8192, // 8 MiB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Derive a 256-bit storage key from a passphrase using Argon2id.
pub fn derive_storage_key(
    passphrase: &str,
    salt: &[u8],
    params: &StorageKdfParams,
) -> CryptoResult<Zeroizing<[u8; 32]>> {
    validate_password(passphrase)?;

    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CryptoError::InvalidParameters(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::InvalidParameters(e.to_string()))?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_key_lengths() {
        let salt = [7u8; 16];
        for words in [2usize, 4, 6, 8] {
            let key = derive_key("correct-horse", &salt, words).unwrap();
            assert_eq!(key.len(), words * 4);
            assert_eq!(key.words().words().len(), words);
            assert_eq!(key.to_bytes().len(), words * 4);
        }
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [42u8; 16];
        let key1 = derive_key("my-password", &salt, 8).unwrap();
        let key2 = derive_key("my-password", &salt, 8).unwrap();
        assert_eq!(*key1.to_bytes(), *key2.to_bytes());
    }

    #[test]
    fn test_derive_key_different_salts() {
        let key1 = derive_key("my-password", &[1u8; 16], 8).unwrap();
        let key2 = derive_key("my-password", &[2u8; 16], 8).unwrap();
        assert_ne!(*key1.to_bytes(), *key2.to_bytes());
    }

    #[test]
    fn test_derive_key_prefix_property() {
        // PBKDF2 output blocks are independent of the requested length
        let salt = [3u8; 16];
        let short = derive_key("my-password", &salt, 4).unwrap();
        let long = derive_key("my-password", &salt, 8).unwrap();
        assert_eq!(short.to_bytes()[..], long.to_bytes()[..16]);
    }

    #[test]
    fn test_derive_key_rejects_zero_words() {
        let result = derive_key("my-password", &[0u8; 16], 0);
        assert!(matches!(result, Err(CryptoError::InvalidInput(_))));
    }

    #[test]
    fn test_derive_key_rejects_short_password() {
        let result = derive_key("abc", &[0u8; 16], 8);
        assert!(matches!(result, Err(CryptoError::PasswordTooShort(_))));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("sixsix").is_ok());
        assert!(matches!(
            validate_password("   "),
            Err(CryptoError::EmptyInput(_))
        ));
        assert!(matches!(
            validate_password("five5"),
            Err(CryptoError::PasswordTooShort(6))
        ));
    }

    #[test]
    fn test_validate_password_counts_chars_not_bytes() {
        // Five multi-byte characters are still five characters
        assert!(validate_password("ééééé").is_err());
        assert!(validate_password("éééééé").is_ok());
    }

    #[test]
    fn test_derived_key_debug_redacted() {
        let key = DerivedKey::from_bytes(&[0u8; 32]);
        let debug_str = format!("{:?}", key);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains('0'));
    }

    #[test]
    fn test_storage_key_deterministic() {
        let params = StorageKdfParams::low_memory();
        let salt = [9u8; 16];
        let k1 = derive_storage_key("keystore-pass", &salt, &params).unwrap();
        let k2 = derive_storage_key("keystore-pass", &salt, &params).unwrap();
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_storage_kdf_params_serialization() {
        let params = StorageKdfParams::default();
        let json = serde_json::to_string(&params).unwrap();
        let parsed: StorageKdfParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, parsed);
    }
}
