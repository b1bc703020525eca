//! Hybrid encryption: a random AES-256 key encrypts the message and is
//! itself wrapped for the recipient.
//!
//! ```json
//! { "encryptedMessage": "<base64(iv || aes-256-cbc ciphertext)>",
//!   "encryptedAesKey": "<base64(wrapped key)>" }
//! ```

use encryptor_core::defaults::{IV_LEN, WRAP_KEY_LEN};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use crate::cipher::{decrypt_raw, encrypt_raw, generate_iv, generate_random_with, Algorithm};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};
use crate::keywrap::{UnwrappingKey, WrappingKey};

/// Wrapped key plus encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridPackage {
    #[serde(rename = "encryptedMessage")]
    pub encrypted_message: String,
    #[serde(rename = "encryptedAesKey")]
    pub encrypted_aes_key: String,
}

impl HybridPackage {
    /// Parse from JSON. Either field missing is [`CryptoError::MissingField`].
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CryptoError::InvalidFormat(format!("Invalid hybrid package JSON: {}", e)))?;

        let field = |name: &'static str| -> CryptoResult<String> {
            match value.get(name) {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                Some(Value::String(_)) | Some(Value::Null) | None => {
                    Err(CryptoError::MissingField(name))
                }
                Some(_) => Err(CryptoError::InvalidFormat(format!("{} must be a string", name))),
            }
        };

        Ok(Self {
            encrypted_message: field("encryptedMessage")?,
            encrypted_aes_key: field("encryptedAesKey")?,
        })
    }

    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Encrypt `message` for the holder of `recipient` using the thread CSPRNG.
pub fn encrypt<K: WrappingKey>(message: &[u8], recipient: &K) -> CryptoResult<HybridPackage> {
    encrypt_with_rng(message, recipient, &mut rand::thread_rng())
}

/// Encrypt `message` with an explicit random source.
pub fn encrypt_with_rng<K: WrappingKey, R: RngCore + CryptoRng>(
    message: &[u8],
    recipient: &K,
    rng: &mut R,
) -> CryptoResult<HybridPackage> {
    let key = Zeroizing::new(generate_random_with::<WRAP_KEY_LEN, _>(rng));
    let iv = generate_iv(rng);

    let ciphertext = encrypt_raw(Algorithm::Aes, &key[..], &iv, message)?;
    let wrapped = recipient.wrap_key(&key[..], rng)?;

    let mut body = Vec::with_capacity(IV_LEN + ciphertext.len());
    body.extend_from_slice(&iv);
    body.extend_from_slice(&ciphertext);

    debug!(
        subsystem = "keywrap",
        op = "wrap",
        scheme = recipient.scheme(),
        input_len = message.len(),
        output_len = body.len(),
        "Hybrid encrypted"
    );

    Ok(HybridPackage {
        encrypted_message: base64_encode(&body),
        encrypted_aes_key: base64_encode(&wrapped),
    })
}

/// Unwrap the key and decrypt the payload.
pub fn decrypt<K: UnwrappingKey>(package: &HybridPackage, recipient: &K) -> CryptoResult<Vec<u8>> {
    if package.encrypted_message.is_empty() {
        return Err(CryptoError::MissingField("encryptedMessage"));
    }
    if package.encrypted_aes_key.is_empty() {
        return Err(CryptoError::MissingField("encryptedAesKey"));
    }
    let body = base64_decode(&package.encrypted_message)?;
    let wrapped = base64_decode(&package.encrypted_aes_key)?;

    let key = recipient.unwrap_key(&wrapped)?;
    if key.len() != WRAP_KEY_LEN || body.len() <= IV_LEN {
        return Err(CryptoError::Decryption);
    }
    let (iv, ciphertext) = body.split_at(IV_LEN);
    let plaintext = decrypt_raw(Algorithm::Aes, &key, iv, ciphertext)?;

    debug!(
        subsystem = "keywrap",
        op = "unwrap",
        output_len = plaintext.len(),
        "Hybrid decrypted"
    );
    Ok(plaintext)
}
