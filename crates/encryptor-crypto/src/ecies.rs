//! ECIES-style hybrid encryption.
//!
//! # Protocol
//!
//! For encryption:
//! 1. Sender generates an ephemeral key pair on the recipient's curve
//! 2. Sender computes: shared = ECDH(ephemeral_private, recipient_public)
//! 3. The fixed-width hex of the shared x-coordinate becomes the password of
//!    an AES [`Envelope`]
//! 4. The ephemeral public key travels next to the envelope
//!
//! For decryption the recipient computes ECDH(recipient_private,
//! ephemeral_public), which yields the same secret.
//!
//! ```json
//! { "ephemeralPublicKey": "04…", "encrypted": { "version": 1, "alg": "AES", … } }
//! ```

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cipher::Algorithm;
use crate::ecc::{ecdh, EcKeyPair, EcPrivateKey, EcPublicKey};
use crate::envelope::{Envelope, Payload};
use crate::error::{CryptoError, CryptoResult};

/// Serialized ECIES ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EciesMessage {
    /// Uncompressed SEC1 hex of the ephemeral public key.
    #[serde(rename = "ephemeralPublicKey")]
    pub ephemeral_public_key: String,
    /// Payload sealed under the shared secret.
    pub encrypted: Envelope,
}

impl EciesMessage {
    /// Parse from JSON, reporting absent fields by name.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CryptoError::InvalidFormat(format!("Invalid ECIES JSON: {}", e)))?;
        let mut obj = match value {
            Value::Object(obj) => obj,
            _ => {
                return Err(CryptoError::InvalidFormat(
                    "ECIES message must be a JSON object".into(),
                ))
            }
        };

        let ephemeral_public_key = match obj.remove("ephemeralPublicKey") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => return Err(CryptoError::MissingField("ephemeralPublicKey")),
            Some(_) => {
                return Err(CryptoError::InvalidFormat(
                    "ephemeralPublicKey must be a string".into(),
                ))
            }
        };
        let encrypted = match obj.remove("encrypted") {
            Some(Value::Null) | None => return Err(CryptoError::MissingField("encrypted")),
            Some(Value::String(s)) => Envelope::from_json(&s)?,
            Some(v) => Envelope::from_value(v)?,
        };

        Ok(Self {
            ephemeral_public_key,
            encrypted,
        })
    }

    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Encrypt for a recipient using the thread-local CSPRNG.
pub fn encrypt(payload: &Payload, recipient: &EcPublicKey) -> CryptoResult<EciesMessage> {
    encrypt_with_rng(payload, recipient, &mut rand::thread_rng())
}

/// Encrypt for a recipient with an explicit random source.
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    payload: &Payload,
    recipient: &EcPublicKey,
    rng: &mut R,
) -> CryptoResult<EciesMessage> {
    let ephemeral = EcKeyPair::generate(recipient.curve(), rng);
    let shared = ecdh(&ephemeral.private, recipient)?;

    let encrypted = Envelope::seal_with_rng(payload, &shared.to_hex(), Algorithm::Aes, rng)?;

    debug!(
        subsystem = "ecies",
        op = "encrypt",
        curve = %recipient.curve(),
        input_len = payload.len(),
        "Encrypted ECIES message"
    );

    Ok(EciesMessage {
        ephemeral_public_key: ephemeral.public.to_hex()?,
        encrypted,
    })
}

/// Decrypt with the recipient's private key.
///
/// An ephemeral key that is not a point on the recipient's curve is a format
/// error; a wrong private key surfaces as [`CryptoError::Decryption`].
pub fn decrypt(message: &EciesMessage, recipient: &EcPrivateKey) -> CryptoResult<Payload> {
    let ephemeral = EcPublicKey::from_hex(recipient.curve(), &message.ephemeral_public_key)?;
    let shared = ecdh(recipient, &ephemeral)?;

    let payload = message.encrypted.open(&shared.to_hex())?;

    debug!(
        subsystem = "ecies",
        op = "decrypt",
        curve = %recipient.curve(),
        output_len = payload.len(),
        "Decrypted ECIES message"
    );
    Ok(payload)
}
