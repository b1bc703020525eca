//! Passphrase-protected storage for private key material.
//!
//! Secrets are encrypted with AES-256-GCM under a key derived from the
//! passphrase with Argon2id, and kept in any [`KeyValueStore`].
//!
//! # Format: ENCKEY01
//!
//! ```text
//! +------------------+
//! | Magic: ENCKEY01  | 8 bytes
//! +------------------+
//! | Header Length    | 4 bytes (little-endian)
//! +------------------+
//! | Header (JSON)    | Variable
//! +------------------+
//! | Encrypted secret | len(secret) + 16-byte auth tag
//! +------------------+
//! ```

use chrono::{DateTime, Utc};
use encryptor_core::store::KeyValueStore;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::cipher::{aes_gcm_decrypt, aes_gcm_encrypt, generate_random_with};
use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode};
use crate::kdf::{derive_storage_key, StorageKdfParams};

/// Magic bytes for key files.
pub const MAGIC_KEYFILE: &[u8; 8] = b"ENCKEY01";

const KEYFILE_VERSION: u8 = 1;
const STORAGE_SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MAX_HEADER_LEN: usize = 64 * 1024;

/// What kind of secret a key file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyKind {
    /// PKCS#8 PEM RSA private key.
    RsaPkcs8Pem,
    /// Hex secp256k1 private scalar.
    EcSecp256k1,
    /// Hex P-256 private scalar.
    EcP256,
    /// ElGamal key pair JSON.
    ElGamal,
}

/// Header for encrypted key files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFileHeader {
    /// Format version.
    pub version: u8,
    /// KDF algorithm (always "argon2id").
    pub kdf: String,
    /// KDF parameters.
    pub kdf_params: StorageKdfParams,
    /// Salt for key derivation (base64).
    pub salt: String,
    /// Nonce for encryption (base64).
    pub nonce: String,
    /// Kind of stored secret.
    pub kind: KeyKind,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A decrypted key file.
pub struct StoredKey {
    pub kind: KeyKind,
    pub secret: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKey")
            .field("kind", &self.kind)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt a secret with a passphrase into ENCKEY01 bytes.
pub fn seal_secret<R: RngCore + CryptoRng>(
    secret: &[u8],
    kind: KeyKind,
    passphrase: &str,
    params: &StorageKdfParams,
    rng: &mut R,
) -> CryptoResult<Vec<u8>> {
    let salt: [u8; STORAGE_SALT_LEN] = generate_random_with(rng);
    let nonce: [u8; NONCE_LEN] = generate_random_with(rng);

    let key = derive_storage_key(passphrase, &salt, params)?;
    let ciphertext = aes_gcm_encrypt(&key, &nonce, secret)?;

    let header = KeyFileHeader {
        version: KEYFILE_VERSION,
        kdf: "argon2id".to_string(),
        kdf_params: params.clone(),
        salt: base64_encode(&salt),
        nonce: base64_encode(&nonce),
        kind,
        created_at: Utc::now(),
    };
    let header_json = serde_json::to_vec(&header)?;
    let header_len = (header_json.len() as u32).to_le_bytes();

    let mut output = Vec::with_capacity(8 + 4 + header_json.len() + ciphertext.len());
    output.extend_from_slice(MAGIC_KEYFILE);
    output.extend_from_slice(&header_len);
    output.extend_from_slice(&header_json);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Split ENCKEY01 bytes into header and ciphertext without decrypting.
pub fn read_header(data: &[u8]) -> CryptoResult<(KeyFileHeader, &[u8])> {
    if !is_key_file(data) {
        return Err(CryptoError::InvalidFormat("not an ENCKEY01 key file".into()));
    }
    if data.len() < 12 {
        return Err(CryptoError::InvalidFormat("key file truncated".into()));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&data[8..12]);
    let header_len = u32::from_le_bytes(len_bytes) as usize;

    if header_len > MAX_HEADER_LEN || data.len() < 12 + header_len + TAG_LEN {
        return Err(CryptoError::InvalidFormat("key file truncated".into()));
    }

    let header: KeyFileHeader = serde_json::from_slice(&data[12..12 + header_len])
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid key file header: {}", e)))?;
    if header.version != KEYFILE_VERSION {
        return Err(CryptoError::UnsupportedVersion(u32::from(header.version)));
    }
    if header.kdf != "argon2id" {
        return Err(CryptoError::UnsupportedAlgorithm(header.kdf));
    }
    Ok((header, &data[12 + header_len..]))
}

/// Decrypt ENCKEY01 bytes.
pub fn open_secret(data: &[u8], passphrase: &str) -> CryptoResult<StoredKey> {
    let (header, ciphertext) = read_header(data)?;

    let salt = base64_decode(&header.salt)?;
    let nonce = base64_decode(&header.nonce)?;
    if salt.len() != STORAGE_SALT_LEN || nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidFormat("invalid salt or nonce length".into()));
    }
    let mut nonce_arr = [0u8; NONCE_LEN];
    nonce_arr.copy_from_slice(&nonce);

    let key = derive_storage_key(passphrase, &salt, &header.kdf_params)?;
    let secret = aes_gcm_decrypt(&key, &nonce_arr, ciphertext)?;

    Ok(StoredKey {
        kind: header.kind,
        secret: Zeroizing::new(secret),
    })
}

/// Check if data starts with the ENCKEY01 magic.
pub fn is_key_file(data: &[u8]) -> bool {
    data.len() >= 8 && &data[0..8] == MAGIC_KEYFILE
}

/// Named, passphrase-protected keys on top of a [`KeyValueStore`].
pub struct Keystore<S: KeyValueStore> {
    store: S,
    params: StorageKdfParams,
}

impl<S: KeyValueStore> Keystore<S> {
    pub fn new(store: S) -> Self {
        Self::with_params(store, StorageKdfParams::default())
    }

    pub fn with_params(store: S, params: StorageKdfParams) -> Self {
        Self { store, params }
    }

    /// Encrypt and store a secret under `name`, replacing any previous one.
    pub fn save<R: RngCore + CryptoRng>(
        &mut self,
        name: &str,
        kind: KeyKind,
        secret: &[u8],
        passphrase: &str,
        rng: &mut R,
    ) -> CryptoResult<()> {
        let sealed = seal_secret(secret, kind, passphrase, &self.params, rng)?;
        self.store.set(name, &sealed)?;
        info!(subsystem = "keystore", op = "save", name, kind = ?kind, "Stored key");
        Ok(())
    }

    /// Load and decrypt the secret stored under `name`.
    pub fn load(&self, name: &str, passphrase: &str) -> CryptoResult<StoredKey> {
        let data = self.require(name)?;
        let key = open_secret(&data, passphrase)?;
        debug!(subsystem = "keystore", op = "load", name, kind = ?key.kind, "Loaded key");
        Ok(key)
    }

    /// Header of a stored key, readable without the passphrase.
    pub fn header(&self, name: &str) -> CryptoResult<KeyFileHeader> {
        let data = self.require(name)?;
        Ok(read_header(&data)?.0)
    }

    /// Names of stored keys.
    pub fn list(&self) -> CryptoResult<Vec<String>> {
        Ok(self.store.keys()?)
    }

    /// Delete a key. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> CryptoResult<bool> {
        Ok(self.store.remove(name)?)
    }

    fn require(&self, name: &str) -> CryptoResult<Vec<u8>> {
        self.store
            .get(name)?
            .ok_or_else(|| CryptoError::InvalidInput(format!("no stored key named {:?}", name)))
    }
}
