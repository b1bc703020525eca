//! Symmetric cipher registry and primitives.
//!
//! [`Algorithm`] is the closed set of ciphers an envelope may name. Block
//! ciphers run in CBC mode with PKCS#7 padding; Rabbit is a stream cipher and
//! is applied without padding. AES-256-GCM is used internally for key storage
//! and key wrapping and is not selectable for envelopes.

use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, KeyInit as AeadKeyInit},
    Aes256Gcm, Nonce,
};
use cbc::cipher::{
    block_padding::Pkcs7, BlockCipher, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit,
    StreamCipher,
};
use encryptor_core::defaults::{IV_LEN, SALT_LEN};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};
use crate::format::{base64_decode, base64_encode, hex_decode};
use crate::kdf::derive_key;

/// Supported envelope ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// AES-256, 128-bit block, CBC + PKCS#7.
    #[serde(rename = "AES")]
    Aes,
    /// Triple DES (EDE3), 64-bit block, 192-bit key, CBC + PKCS#7.
    #[serde(rename = "TripleDES")]
    TripleDes,
    /// Blowfish with a 256-bit key, 64-bit block, CBC + PKCS#7.
    #[serde(rename = "Blowfish")]
    Blowfish,
    /// Rabbit stream cipher, 128-bit key, 64-bit IV, no padding.
    #[serde(rename = "Rabbit")]
    Rabbit,
}

impl Algorithm {
    /// Every registered algorithm.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Aes,
        Algorithm::TripleDes,
        Algorithm::Blowfish,
        Algorithm::Rabbit,
    ];

    /// Wire name used in envelopes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Aes => "AES",
            Algorithm::TripleDes => "TripleDES",
            Algorithm::Blowfish => "Blowfish",
            Algorithm::Rabbit => "Rabbit",
        }
    }

    /// Key size in 32-bit words.
    pub fn key_size_words(&self) -> usize {
        match self {
            Algorithm::Aes => 8,
            Algorithm::TripleDes => 6,
            Algorithm::Blowfish => 8,
            Algorithm::Rabbit => 4,
        }
    }

    /// Whether the cipher runs in CBC mode with padding.
    pub fn uses_block_mode(&self) -> bool {
        !matches!(self, Algorithm::Rabbit)
    }

    /// Block size in bytes (`None` for stream ciphers).
    pub fn block_size(&self) -> Option<usize> {
        match self {
            Algorithm::Aes => Some(16),
            Algorithm::TripleDes | Algorithm::Blowfish => Some(8),
            Algorithm::Rabbit => None,
        }
    }

    /// Number of IV bytes the cipher consumes from the 16-byte envelope IV.
    pub fn iv_len(&self) -> usize {
        self.block_size().unwrap_or(8)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = CryptoError;

    /// Parse a selector. Wire names are matched case-insensitively, and the
    /// common aliases `3DES`/`DESede` are accepted for Triple DES.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes" => Ok(Algorithm::Aes),
            "tripledes" | "3des" | "desede" => Ok(Algorithm::TripleDes),
            "blowfish" => Ok(Algorithm::Blowfish),
            "rabbit" => Ok(Algorithm::Rabbit),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Salt, IV and ciphertext produced by password-based encryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherPayload {
    /// Hex-encoded 16-byte salt.
    #[serde(rename = "saltHex")]
    pub salt_hex: String,
    /// Hex-encoded 16-byte IV.
    #[serde(rename = "ivHex")]
    pub iv_hex: String,
    /// Base64-encoded ciphertext.
    #[serde(rename = "ctB64")]
    pub ct_b64: String,
}

/// Generate cryptographically secure random bytes from the given generator.
pub fn generate_random_with<const N: usize, R: RngCore + CryptoRng>(rng: &mut R) -> [u8; N] {
    let mut bytes = [0u8; N];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Generate cryptographically secure random bytes from the thread generator.
pub fn generate_random<const N: usize>() -> [u8; N] {
    generate_random_with(&mut rand::thread_rng())
}

/// Generate a random salt (16 bytes).
pub fn generate_salt<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; SALT_LEN] {
    generate_random_with(rng)
}

/// Generate a random IV (16 bytes).
pub fn generate_iv<R: RngCore + CryptoRng>(rng: &mut R) -> [u8; IV_LEN] {
    generate_random_with(rng)
}

fn cbc_encrypt<C>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockEncryptMut + BlockCipher + KeyInit,
{
    let encryptor = cbc::Encryptor::<C>::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

fn cbc_decrypt<C>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>>
where
    C: BlockDecryptMut + BlockCipher + KeyInit,
{
    let decryptor =
        cbc::Decryptor::<C>::new_from_slices(key, iv).map_err(|_| CryptoError::Decryption)?;
    decryptor
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

fn rabbit_apply(key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut cipher = rabbit::Rabbit::new_from_slices(key, iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    let mut buf = data.to_vec();
    cipher.apply_keystream(&mut buf);
    Ok(buf)
}

fn check_key_iv(alg: Algorithm, key: &[u8], iv: &[u8]) -> CryptoResult<()> {
    if key.len() != alg.key_size_words() * 4 {
        return Err(CryptoError::InvalidInput(format!(
            "{} requires a {}-byte key, got {}",
            alg,
            alg.key_size_words() * 4,
            key.len()
        )));
    }
    if iv.len() < alg.iv_len() {
        return Err(CryptoError::InvalidInput(format!(
            "{} requires at least {} IV bytes, got {}",
            alg,
            alg.iv_len(),
            iv.len()
        )));
    }
    Ok(())
}

/// Encrypt with a raw key and IV.
///
/// Ciphers with a 64-bit block (and Rabbit) use the first 8 IV bytes.
pub fn encrypt_raw(alg: Algorithm, key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key_iv(alg, key, iv)?;
    let iv = &iv[..alg.iv_len()];
    match alg {
        Algorithm::Aes => cbc_encrypt::<aes::Aes256>(key, iv, plaintext),
        Algorithm::TripleDes => cbc_encrypt::<des::TdesEde3>(key, iv, plaintext),
        Algorithm::Blowfish => cbc_encrypt::<blowfish::Blowfish>(key, iv, plaintext),
        Algorithm::Rabbit => rabbit_apply(key, iv, plaintext),
    }
}

/// Decrypt with a raw key and IV.
///
/// For block ciphers the ciphertext must be a positive multiple of the block
/// size and carry valid padding. Any failure is reported as
/// [`CryptoError::Decryption`].
pub fn decrypt_raw(
    alg: Algorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> CryptoResult<Vec<u8>> {
    check_key_iv(alg, key, iv)?;
    let iv = &iv[..alg.iv_len()];

    if let Some(block) = alg.block_size() {
        if ciphertext.is_empty() || ciphertext.len() % block != 0 {
            return Err(CryptoError::Decryption);
        }
    }

    let plaintext = match alg {
        Algorithm::Aes => cbc_decrypt::<aes::Aes256>(key, iv, ciphertext)?,
        Algorithm::TripleDes => cbc_decrypt::<des::TdesEde3>(key, iv, ciphertext)?,
        Algorithm::Blowfish => cbc_decrypt::<blowfish::Blowfish>(key, iv, ciphertext)?,
        Algorithm::Rabbit => rabbit_apply(key, iv, ciphertext).map_err(|_| CryptoError::Decryption)?,
    };

    // PKCS#7 strips 1..=block bytes; a keystream never changes the length.
    let plausible = match alg.block_size() {
        Some(block) => {
            plaintext.len() < ciphertext.len() && ciphertext.len() - plaintext.len() <= block
        }
        None => plaintext.len() == ciphertext.len(),
    };
    if !plausible {
        return Err(CryptoError::Decryption);
    }

    Ok(plaintext)
}

/// Encrypt under a password: fresh salt and IV, PBKDF2 key, named cipher.
pub fn encrypt_with_password<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    password: &str,
    alg: Algorithm,
    rng: &mut R,
) -> CryptoResult<CipherPayload> {
    let salt = generate_salt(rng);
    let iv = generate_iv(rng);

    let key = derive_key(password, &salt, alg.key_size_words())?;
    let ciphertext = encrypt_raw(alg, &key.to_bytes(), &iv, plaintext)?;

    debug!(
        subsystem = "cipher",
        alg = %alg,
        input_len = plaintext.len(),
        output_len = ciphertext.len(),
        "Encrypted payload"
    );

    Ok(CipherPayload {
        salt_hex: hex::encode(salt),
        iv_hex: hex::encode(iv),
        ct_b64: base64_encode(&ciphertext),
    })
}

/// Decrypt a [`CipherPayload`] under a password.
///
/// Malformed hex/base64 or wrong salt/IV lengths are format errors and are
/// detected before the key is derived. A wrong password or corrupted
/// ciphertext is [`CryptoError::Decryption`].
pub fn decrypt_with_password(
    payload: &CipherPayload,
    password: &str,
    alg: Algorithm,
) -> CryptoResult<Vec<u8>> {
    let salt = hex_decode(&payload.salt_hex, "saltHex")?;
    let iv = hex_decode(&payload.iv_hex, "ivHex")?;
    if salt.len() != SALT_LEN {
        return Err(CryptoError::InvalidFormat(format!(
            "saltHex must encode {} bytes, got {}",
            SALT_LEN,
            salt.len()
        )));
    }
    if iv.len() != IV_LEN {
        return Err(CryptoError::InvalidFormat(format!(
            "ivHex must encode {} bytes, got {}",
            IV_LEN,
            iv.len()
        )));
    }
    let ciphertext = base64_decode(&payload.ct_b64)?;

    let key = derive_key(password, &salt, alg.key_size_words())?;
    let plaintext = decrypt_raw(alg, &key.to_bytes(), &iv, &ciphertext)?;

    debug!(
        subsystem = "cipher",
        alg = %alg,
        input_len = ciphertext.len(),
        output_len = plaintext.len(),
        "Decrypted payload"
    );

    Ok(plaintext)
}

/// Encrypt plaintext with AES-256-GCM.
///
/// Returns ciphertext with appended authentication tag (16 bytes).
pub fn aes_gcm_encrypt(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = <Aes256Gcm as AeadKeyInit>::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| CryptoError::Encryption("AES-GCM encryption failed".into()))
}

/// Decrypt ciphertext with AES-256-GCM.
///
/// The ciphertext must include the authentication tag (16 bytes) at the end.
pub fn aes_gcm_decrypt(key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher =
        <Aes256Gcm as AeadKeyInit>::new_from_slice(key).map_err(|_| CryptoError::Decryption)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}
