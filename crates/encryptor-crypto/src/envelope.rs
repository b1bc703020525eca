//! Versioned, self-describing password envelope.
//!
//! An [`Envelope`] records everything needed to reverse a password-based
//! encryption except the password itself: format version, cipher name, salt,
//! IV, ciphertext, and what kind of payload was sealed.
//!
//! ```json
//! { "version": 1, "alg": "AES", "saltHex": "…", "ivHex": "…",
//!   "ctB64": "…", "kind": "file", "name": "report.pdf",
//!   "type": "application/pdf" }
//! ```
//!
//! Envelopes are immutable. Opening one checks the version and ciphertext
//! size before any key derivation happens.

use encryptor_core::defaults::{
    DEFAULT_DECRYPTED_FILE_NAME, DEFAULT_FILE_MIME_TYPE, ENCRYPTED_FILE_SUFFIX, ENVELOPE_VERSION,
    MAX_PAYLOAD_BYTES, TEXT_MIME_TYPE,
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cipher::{decrypt_with_password, encrypt_with_password, Algorithm, CipherPayload};
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::validate_password;

/// Fields every envelope must carry.
const REQUIRED_FIELDS: [&str; 6] = ["version", "alg", "saltHex", "ivHex", "ctB64", "kind"];

/// Kind of sealed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// UTF-8 text.
    Text,
    /// Opaque file bytes with a name and MIME type.
    File,
}

/// Plaintext going into, or coming out of, an envelope.
#[derive(Clone, PartialEq, Eq)]
pub enum Payload {
    /// Text, encoded as UTF-8 before sealing.
    Text(String),
    /// File contents, passed through unchanged.
    File {
        name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

impl Payload {
    /// Text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    /// File payload. A missing or blank MIME type becomes
    /// `application/octet-stream`.
    pub fn file(name: impl Into<String>, mime_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let mime_type = match mime_type.map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => DEFAULT_FILE_MIME_TYPE.to_string(),
        };
        Payload::File {
            name: name.into(),
            mime_type,
            bytes,
        }
    }

    /// The payload kind.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Text(_) => PayloadKind::Text,
            Payload::File { .. } => PayloadKind::File,
        }
    }

    /// Plaintext bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::File { bytes, .. } => bytes,
        }
    }

    /// Consume the payload, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.into_bytes(),
            Payload::File { bytes, .. } => bytes,
        }
    }

    /// Plaintext length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the plaintext is empty.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Check the payload can be sealed.
    ///
    /// Text must contain a non-whitespace character; files may be empty but
    /// need a name. Both are capped at `MAX_PAYLOAD_BYTES`.
    pub fn validate(&self) -> CryptoResult<()> {
        match self {
            Payload::Text(text) if text.trim().is_empty() => {
                return Err(CryptoError::EmptyInput("text".to_string()));
            }
            Payload::File { name, .. } if name.trim().is_empty() => {
                return Err(CryptoError::EmptyInput("file name".to_string()));
            }
            _ => {}
        }
        if self.len() > MAX_PAYLOAD_BYTES {
            return Err(CryptoError::PayloadTooLarge {
                size: self.len(),
                max: MAX_PAYLOAD_BYTES,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Payload::File {
                name,
                mime_type,
                bytes,
            } => f
                .debug_struct("File")
                .field("name", name)
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

fn default_mime_type() -> String {
    DEFAULT_FILE_MIME_TYPE.to_string()
}

/// `null` and blank types fall back to the default like a missing field.
fn mime_type_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(default_mime_type))
}

/// A sealed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    version: u32,
    alg: Algorithm,
    #[serde(flatten)]
    cipher: CipherPayload,
    kind: PayloadKind,
    #[serde(default)]
    name: Option<String>,
    #[serde(
        rename = "type",
        default = "default_mime_type",
        deserialize_with = "mime_type_or_default"
    )]
    mime_type: String,
}

impl Envelope {
    /// Seal a payload using the thread-local CSPRNG.
    pub fn seal(payload: &Payload, password: &str, alg: Algorithm) -> CryptoResult<Self> {
        Self::seal_with_rng(payload, password, alg, &mut rand::thread_rng())
    }

    /// Seal a payload with an explicit random source for salt and IV.
    pub fn seal_with_rng<R: RngCore + CryptoRng>(
        payload: &Payload,
        password: &str,
        alg: Algorithm,
        rng: &mut R,
    ) -> CryptoResult<Self> {
        validate_password(password)?;
        payload.validate()?;

        let cipher = encrypt_with_password(payload.as_bytes(), password, alg, rng)?;

        let (name, mime_type) = match payload {
            Payload::Text(_) => (None, TEXT_MIME_TYPE.to_string()),
            Payload::File {
                name, mime_type, ..
            } => (Some(name.clone()), mime_type.clone()),
        };

        debug!(
            subsystem = "envelope",
            op = "seal",
            alg = %alg,
            kind = ?payload.kind(),
            input_len = payload.len(),
            "Sealed envelope"
        );

        Ok(Self {
            version: ENVELOPE_VERSION,
            alg,
            cipher,
            kind: payload.kind(),
            name,
            mime_type,
        })
    }

    /// Decrypt and return the raw plaintext bytes, ignoring the payload kind.
    pub fn open_bytes(&self, password: &str) -> CryptoResult<Vec<u8>> {
        if self.version != ENVELOPE_VERSION {
            return Err(CryptoError::UnsupportedVersion(self.version));
        }
        // Base64 of at most MAX_PAYLOAD_BYTES plus one padding block.
        let max_ct_b64 = (MAX_PAYLOAD_BYTES + 16).div_ceil(3) * 4;
        if self.cipher.ct_b64.len() > max_ct_b64 {
            return Err(CryptoError::PayloadTooLarge {
                size: self.cipher.ct_b64.len() / 4 * 3,
                max: MAX_PAYLOAD_BYTES,
            });
        }
        validate_password(password)?;

        let plaintext = decrypt_with_password(&self.cipher, password, self.alg)?;

        debug!(
            subsystem = "envelope",
            op = "open",
            alg = %self.alg,
            output_len = plaintext.len(),
            "Opened envelope"
        );
        Ok(plaintext)
    }

    /// Decrypt and rebuild the sealed payload.
    ///
    /// Text that does not decode as UTF-8 is reported as a decryption
    /// failure: it is what a wrong key produces for a stream cipher.
    pub fn open(&self, password: &str) -> CryptoResult<Payload> {
        let bytes = self.open_bytes(password)?;
        match self.kind {
            PayloadKind::Text => String::from_utf8(bytes)
                .map(Payload::Text)
                .map_err(|_| CryptoError::Decryption),
            PayloadKind::File => Ok(Payload::File {
                name: self
                    .name
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DECRYPTED_FILE_NAME.to_string()),
                mime_type: self.mime_type.clone(),
                bytes,
            }),
        }
    }

    /// Parse an envelope from JSON.
    ///
    /// Missing required fields, unknown algorithms and malformed JSON are all
    /// format errors. The version is checked by [`Envelope::open`], so an
    /// envelope from a newer writer can still be inspected.
    pub fn from_json(json: &str) -> CryptoResult<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| CryptoError::InvalidFormat(format!("Invalid envelope JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Parse an envelope from an already-decoded JSON value.
    pub fn from_value(value: Value) -> CryptoResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CryptoError::InvalidFormat("Envelope must be a JSON object".into()))?;

        for field in REQUIRED_FIELDS {
            if obj.get(field).map_or(true, Value::is_null) {
                return Err(CryptoError::MissingField(field));
            }
        }

        match obj.get("alg").and_then(Value::as_str) {
            Some(name) if Algorithm::ALL.iter().any(|a| a.as_str() == name) => {}
            Some(name) => {
                return Err(CryptoError::InvalidFormat(format!(
                    "Unknown algorithm: {}",
                    name
                )))
            }
            None => return Err(CryptoError::InvalidFormat("alg must be a string".into())),
        }

        serde_json::from_value(value)
            .map_err(|e| CryptoError::InvalidFormat(format!("Invalid envelope: {}", e)))
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON.
    pub fn to_json_pretty(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn algorithm(&self) -> Algorithm {
        self.alg
    }

    pub fn salt_hex(&self) -> &str {
        &self.cipher.salt_hex
    }

    pub fn iv_hex(&self) -> &str {
        &self.cipher.iv_hex
    }

    pub fn ciphertext_b64(&self) -> &str {
        &self.cipher.ct_b64
    }

    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Original file name (`None` for text).
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Salt, IV and ciphertext as a unit.
    pub fn cipher_payload(&self) -> &CipherPayload {
        &self.cipher
    }
}

/// File name under which an encrypted file is stored.
pub fn encrypted_file_name(name: &str) -> String {
    format!("{}{}", name, ENCRYPTED_FILE_SUFFIX)
}

/// Strip the `.enc` suffix, if present.
pub fn decrypted_file_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(ENCRYPTED_FILE_SUFFIX) && name.len() > ENCRYPTED_FILE_SUFFIX.len() {
        name[..name.len() - ENCRYPTED_FILE_SUFFIX.len()].to_string()
    } else {
        name.to_string()
    }
}

/// Soft check that a file is likely an envelope: a `.enc` suffix or a JSON or
/// text MIME type. Parsing still decides.
pub fn looks_like_envelope_file(file_name: &str, mime_type: Option<&str>) -> bool {
    if file_name.to_ascii_lowercase().ends_with(ENCRYPTED_FILE_SUFFIX) {
        return true;
    }
    mime_type
        .map(|m| {
            let m = m.to_ascii_lowercase();
            m.contains("json") || m.contains("text")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    #[test]
    fn test_seal_open_text() {
        let env = Envelope::seal_with_rng(
            &Payload::text("Hello World"),
            "secret1",
            Algorithm::Aes,
            &mut seeded(),
        )
        .unwrap();

        assert_eq!(env.version(), 1);
        assert_eq!(env.kind(), PayloadKind::Text);
        assert_eq!(env.name(), None);
        assert_eq!(env.mime_type(), "text/plain");
        assert_eq!(env.open("secret1").unwrap(), Payload::text("Hello World"));
    }

    #[test]
    fn test_seal_open_file_preserves_metadata() {
        let payload = Payload::file("photo.png", Some("image/png"), vec![0x89, b'P', b'N', b'G']);
        let env = Envelope::seal_with_rng(&payload, "password1", Algorithm::TripleDes, &mut seeded())
            .unwrap();

        assert_eq!(env.name(), Some("photo.png"));
        assert_eq!(env.mime_type(), "image/png");
        assert_eq!(env.open("password1").unwrap(), payload);
    }

    #[test]
    fn test_empty_file_is_allowed() {
        let payload = Payload::file("empty.bin", None, Vec::new());
        let env =
            Envelope::seal_with_rng(&payload, "password1", Algorithm::Aes, &mut seeded()).unwrap();
        assert_eq!(env.mime_type(), "application/octet-stream");
        assert!(env.open_bytes("password1").unwrap().is_empty());
    }

    #[test]
    fn test_blank_text_rejected() {
        let result = Envelope::seal(&Payload::text("  \n"), "password1", Algorithm::Aes);
        assert!(matches!(result, Err(CryptoError::EmptyInput(_))));
    }

    #[test]
    fn test_short_password_rejected_on_seal() {
        let result = Envelope::seal(&Payload::text("hi"), "12345", Algorithm::Aes);
        assert!(matches!(result, Err(CryptoError::PasswordTooShort(6))));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = Payload::file("big.bin", None, vec![0u8; MAX_PAYLOAD_BYTES + 1]);
        let result = Envelope::seal(&payload, "password1", Algorithm::Aes);
        assert!(matches!(result, Err(CryptoError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_json_wire_names() {
        let env = Envelope::seal_with_rng(
            &Payload::text("wire"),
            "password1",
            Algorithm::Blowfish,
            &mut seeded(),
        )
        .unwrap();
        let value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["alg"], "Blowfish");
        assert_eq!(value["kind"], "text");
        assert_eq!(value["type"], "text/plain");
        assert!(value["name"].is_null());
        assert_eq!(value["saltHex"].as_str().unwrap().len(), 32);
        assert_eq!(value["ivHex"].as_str().unwrap().len(), 32);
        assert!(value["ctB64"].is_string());
    }

    #[test]
    fn test_json_roundtrip() {
        let env = Envelope::seal_with_rng(
            &Payload::file("a.txt", Some("text/plain"), b"abc".to_vec()),
            "password1",
            Algorithm::Rabbit,
            &mut seeded(),
        )
        .unwrap();
        let parsed = Envelope::from_json(&env.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, env);
    }

    #[test]
    fn test_from_json_missing_field() {
        let json = r#"{"version":1,"alg":"AES","ivHex":"00","ctB64":"","kind":"text"}"#;
        let result = Envelope::from_json(json);
        assert!(matches!(result, Err(CryptoError::MissingField("saltHex"))));
    }

    #[test]
    fn test_from_json_unknown_algorithm() {
        let json = r#"{"version":1,"alg":"DES","saltHex":"00","ivHex":"00","ctB64":"","kind":"text"}"#;
        let err = Envelope::from_json(json).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidFormat(_)));
        assert!(err.to_string().contains("DES"));
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            Envelope::from_json("{not json"),
            Err(CryptoError::InvalidFormat(_))
        ));
        assert!(matches!(
            Envelope::from_json("[1,2,3]"),
            Err(CryptoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_open_rejects_unknown_version() {
        let env = Envelope::seal_with_rng(
            &Payload::text("versioned"),
            "password1",
            Algorithm::Aes,
            &mut seeded(),
        )
        .unwrap();
        let mut value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        value["version"] = 2.into();
        let future = Envelope::from_value(value).unwrap();

        // Even the right password must not be tried against an unknown version
        let result = future.open("password1");
        assert!(matches!(result, Err(CryptoError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_null_or_blank_type_falls_back_to_octet_stream() {
        let env = Envelope::seal_with_rng(
            &Payload::file("blob", Some("image/png"), vec![1, 2, 3]),
            "password1",
            Algorithm::Aes,
            &mut seeded(),
        )
        .unwrap();
        let sealed: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();

        for replacement in [Value::Null, Value::from(""), Value::from("   ")] {
            let mut value = sealed.clone();
            value["type"] = replacement;
            let parsed = Envelope::from_value(value).unwrap();
            assert_eq!(parsed.mime_type(), "application/octet-stream");
            match parsed.open("password1").unwrap() {
                Payload::File { mime_type, bytes, .. } => {
                    assert_eq!(mime_type, "application/octet-stream");
                    assert_eq!(bytes, vec![1, 2, 3]);
                }
                other => panic!("expected file payload, got {:?}", other),
            }
        }

        let mut missing = sealed.clone();
        missing.as_object_mut().unwrap().remove("type");
        assert_eq!(
            Envelope::from_value(missing).unwrap().mime_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_gating_happens_before_key_derivation() {
        use crate::kdf::DERIVATIONS;

        let derivations = || DERIVATIONS.with(|n| n.get());
        let env = Envelope::seal_with_rng(
            &Payload::text("gated"),
            "password1",
            Algorithm::Aes,
            &mut seeded(),
        )
        .unwrap();
        let sealed: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();

        let mut future = sealed.clone();
        future["version"] = 2.into();
        let future = Envelope::from_value(future).unwrap();
        let before = derivations();
        assert!(matches!(
            future.open("password1"),
            Err(CryptoError::UnsupportedVersion(2))
        ));
        assert_eq!(derivations(), before);

        let before = derivations();
        assert!(matches!(
            env.open("short"),
            Err(CryptoError::PasswordTooShort(_))
        ));
        assert_eq!(derivations(), before);

        let mut bad_salt = sealed.clone();
        bad_salt["saltHex"] = "zz".into();
        let bad_salt = Envelope::from_value(bad_salt).unwrap();
        let before = derivations();
        assert!(matches!(
            bad_salt.open("password1"),
            Err(CryptoError::InvalidFormat(_))
        ));
        assert_eq!(derivations(), before);

        let before = derivations();
        assert_eq!(env.open("password1").unwrap(), Payload::text("gated"));
        assert_eq!(derivations(), before + 1);
    }

    #[test]
    fn test_text_kind_with_invalid_utf8_is_decryption_failure() {
        let env = Envelope::seal_with_rng(
            &Payload::file("bin", None, vec![0xFF, 0xFE]),
            "password1",
            Algorithm::Aes,
            &mut seeded(),
        )
        .unwrap();
        let mut value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        value["kind"] = "text".into();
        let relabelled = Envelope::from_value(value).unwrap();

        assert!(matches!(
            relabelled.open("password1"),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_file_name_helpers() {
        assert_eq!(encrypted_file_name("notes.txt"), "notes.txt.enc");
        assert_eq!(decrypted_file_name("notes.txt.enc"), "notes.txt");
        assert_eq!(decrypted_file_name("NOTES.ENC"), "NOTES");
        assert_eq!(decrypted_file_name("plain.txt"), "plain.txt");
        assert_eq!(decrypted_file_name(".enc"), ".enc");
    }

    #[test]
    fn test_looks_like_envelope_file() {
        assert!(looks_like_envelope_file("secret.txt.enc", None));
        assert!(looks_like_envelope_file("secret.json", Some("application/json")));
        assert!(looks_like_envelope_file("secret", Some("text/plain")));
        assert!(!looks_like_envelope_file("photo.png", Some("image/png")));
        assert!(!looks_like_envelope_file("photo.png", None));
    }

    #[test]
    fn test_payload_debug_hides_content() {
        let debug = format!("{:?}", Payload::text("top secret"));
        assert!(!debug.contains("top secret"));
    }
}
