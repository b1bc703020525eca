//! Centralized default constants for the encryptor workspace.
//!
//! **This module is the single source of truth** for shared limits and
//! format constants. The crypto crate, the CLI and the tests reference these
//! instead of defining their own magic numbers.
//!
//! Organized by domain area. When adding new constants, place them in the
//! appropriate section.

// =============================================================================
// KEY DERIVATION
// =============================================================================

/// PBKDF2 iteration count. Fixed: envelopes carry no KDF parameters, so
/// changing this breaks every existing envelope.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Random salt length in bytes (hex-encoded to 32 chars on the wire).
pub const SALT_LEN: usize = 16;

/// Minimum password length accepted for sealing and opening.
pub const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// ENVELOPE
// =============================================================================

/// Current envelope format version. `open` rejects anything else.
pub const ENVELOPE_VERSION: u32 = 1;

/// Random IV length in bytes (hex-encoded to 32 chars on the wire).
pub const IV_LEN: usize = 16;

/// Largest payload accepted for sealing (50 MiB).
pub const MAX_PAYLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Suffix appended to the original file name of an encrypted file.
pub const ENCRYPTED_FILE_SUFFIX: &str = ".enc";

/// MIME type recorded for text payloads.
pub const TEXT_MIME_TYPE: &str = "text/plain";

/// MIME type used for file payloads when the caller does not know better.
pub const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

/// File name used when a file envelope carries no name.
pub const DEFAULT_DECRYPTED_FILE_NAME: &str = "decrypted.bin";

// =============================================================================
// ASYMMETRIC
// =============================================================================

/// ElGamal primes must exceed this so every byte value is a group element.
pub const ELGAMAL_MAX_PLAINTEXT: u32 = 255;

/// Miller-Rabin rounds used to validate ElGamal primes.
pub const PRIMALITY_ROUNDS: usize = 32;

/// Smallest RSA modulus accepted for key wrapping.
pub const MIN_RSA_BITS: usize = 2048;

/// RSA modulus size for generated wrapping keys.
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Random symmetric key length used by the hybrid key wrap (AES-256).
pub const WRAP_KEY_LEN: usize = 32;

// =============================================================================
// Hashing tools
// =============================================================================

/// bcrypt cost factor when none is given.
pub const BCRYPT_DEFAULT_COST: u32 = 10;

/// Smallest bcrypt cost factor accepted.
pub const BCRYPT_MIN_COST: u32 = 4;

/// Largest bcrypt cost factor accepted.
pub const BCRYPT_MAX_COST: u32 = 31;

// =============================================================================
// CLI
// =============================================================================

/// Default keystore directory for the CLI.
pub const KEYSTORE_DIR: &str = ".encryptor-keys";
