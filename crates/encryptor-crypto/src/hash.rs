//! Hex message digests, CRC checksums and bcrypt password hashes.
//!
//! MD5 and the CRC models are only offered as checksums for comparing against
//! published values; they are not collision resistant. CRC results are
//! rendered as at least eight lowercase hex digits.

use std::fmt;
use std::io::Read;
use std::str::FromStr;

use crc::{Crc, CRC_16_ARC, CRC_16_IBM_3740, CRC_32_ISO_HDLC, CRC_8_SMBUS};
use encryptor_core::defaults::{BCRYPT_MAX_COST, BCRYPT_MIN_COST};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use crate::error::{CryptoError, CryptoResult};

static CRC_32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
static CRC_16: Crc<u16> = Crc::<u16>::new(&CRC_16_ARC);
static CRC_16_CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);
static CRC_8: Crc<u8> = Crc::<u8>::new(&CRC_8_SMBUS);

/// Supported digest and checksum algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
    #[serde(rename = "MD5")]
    Md5,
    /// CRC-32/ISO-HDLC (zlib, PNG).
    #[serde(rename = "CRC-32")]
    Crc32,
    /// CRC-16/ARC.
    #[serde(rename = "CRC-16")]
    Crc16,
    /// CRC-16/IBM-3740, often called CCITT-FALSE.
    #[serde(rename = "CRC-16-CCITT")]
    Crc16Ccitt,
    /// CRC-8/SMBUS.
    #[serde(rename = "CRC-8")]
    Crc8,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 7] = [
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
        HashAlgorithm::Md5,
        HashAlgorithm::Crc32,
        HashAlgorithm::Crc16,
        HashAlgorithm::Crc16Ccitt,
        HashAlgorithm::Crc8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha512 => "SHA-512",
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Crc32 => "CRC-32",
            HashAlgorithm::Crc16 => "CRC-16",
            HashAlgorithm::Crc16Ccitt => "CRC-16-CCITT",
            HashAlgorithm::Crc8 => "CRC-8",
        }
    }

    /// Digest length in bytes. CRCs are widened to four bytes.
    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Md5 => 16,
            HashAlgorithm::Crc32
            | HashAlgorithm::Crc16
            | HashAlgorithm::Crc16Ccitt
            | HashAlgorithm::Crc8 => 4,
        }
    }

    /// Whether this is a CRC checksum rather than a cryptographic hash.
    pub fn is_checksum(&self) -> bool {
        matches!(
            self,
            HashAlgorithm::Crc32 | HashAlgorithm::Crc16 | HashAlgorithm::Crc16Ccitt | HashAlgorithm::Crc8
        )
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_', '/'], "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "md5" => Ok(HashAlgorithm::Md5),
            "crc32" => Ok(HashAlgorithm::Crc32),
            "crc16" => Ok(HashAlgorithm::Crc16),
            "crc16ccitt" => Ok(HashAlgorithm::Crc16Ccitt),
            "crc8" => Ok(HashAlgorithm::Crc8),
            _ => Err(CryptoError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
    Md5(md5::Context),
    Crc32(crc::Digest<'static, u32>),
    Crc16(crc::Digest<'static, u16>),
    Crc8(crc::Digest<'static, u8>),
}

impl Hasher {
    fn new(alg: HashAlgorithm) -> Self {
        match alg {
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
            HashAlgorithm::Md5 => Hasher::Md5(md5::Context::new()),
            HashAlgorithm::Crc32 => Hasher::Crc32(CRC_32.digest()),
            HashAlgorithm::Crc16 => Hasher::Crc16(CRC_16.digest()),
            HashAlgorithm::Crc16Ccitt => Hasher::Crc16(CRC_16_CCITT.digest()),
            HashAlgorithm::Crc8 => Hasher::Crc8(CRC_8.digest()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Md5(h) => h.consume(data),
            Hasher::Crc32(h) => h.update(data),
            Hasher::Crc16(h) => h.update(data),
            Hasher::Crc8(h) => h.update(data),
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
            Hasher::Md5(h) => h.compute().0.to_vec(),
            Hasher::Crc32(h) => h.finalize().to_be_bytes().to_vec(),
            Hasher::Crc16(h) => u32::from(h.finalize()).to_be_bytes().to_vec(),
            Hasher::Crc8(h) => u32::from(h.finalize()).to_be_bytes().to_vec(),
        }
    }
}

/// Digest of `data`.
pub fn digest(alg: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    let mut hasher = Hasher::new(alg);
    hasher.update(data);
    hasher.finish()
}

/// Lowercase hex digest of `data`.
pub fn digest_hex(alg: HashAlgorithm, data: &[u8]) -> String {
    hex::encode(digest(alg, data))
}

/// Lowercase hex digest of everything readable from `reader`.
pub fn digest_reader<R: Read>(alg: HashAlgorithm, mut reader: R) -> CryptoResult<String> {
    let mut hasher = Hasher::new(alg);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finish()))
}

// =============================================================================
// bcrypt
// =============================================================================

/// Salted bcrypt hash (`$2b$`) of `password` at the given cost factor.
///
/// Only the first 72 bytes of the password take part in the hash.
pub fn bcrypt_hash(password: &[u8], cost: u32) -> CryptoResult<String> {
    if password.is_empty() {
        return Err(CryptoError::EmptyInput("password".to_string()));
    }
    if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&cost) {
        return Err(CryptoError::InvalidParameters(format!(
            "bcrypt cost must lie in [{}, {}], got {}",
            BCRYPT_MIN_COST, BCRYPT_MAX_COST, cost
        )));
    }
    let hashed =
        bcrypt::hash(password, cost).map_err(|e| CryptoError::Encryption(e.to_string()))?;
    debug!(subsystem = "hash", op = "bcrypt_hash", cost, "Hashed password");
    Ok(hashed)
}

/// Check `password` against a bcrypt hash string.
///
/// A mismatch is `Ok(false)`; a string that is not a bcrypt hash is a format
/// error.
pub fn bcrypt_verify(password: &[u8], hash: &str) -> CryptoResult<bool> {
    bcrypt::verify(password, hash.trim())
        .map_err(|e| CryptoError::InvalidFormat(format!("Invalid bcrypt hash: {}", e)))
}
