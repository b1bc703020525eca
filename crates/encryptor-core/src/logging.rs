//! Structured logging field names for encryptor.
//!
//! All crates use these names for consistent structured logging fields.
//! `tracing` macros need literal field names, so these constants document
//! the schema and are used where fields are recorded dynamically
//! (e.g. `Span::record`).
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation failed in a way the operator must look at |
//! | WARN  | Recoverable issue (rejected input, failed decryption) |
//! | INFO  | CLI lifecycle events, operation completions |
//! | DEBUG | Decision points: algorithm, sizes, format checks |
//! | TRACE | Per-item iteration (per-byte ElGamal pairs) |
//!
//! Secrets (passwords, keys, shared secrets, plaintext) are never logged.

/// Subsystem originating the log event.
/// Values: "envelope", "cipher", "kdf", "elgamal", "ecies", "keywrap", "keystore", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "seal", "open", "wrap", "unwrap", "keygen"
pub const OPERATION: &str = "op";

/// Cipher algorithm wire name.
pub const ALGORITHM: &str = "alg";

/// Byte length of an operation input.
pub const INPUT_LEN: &str = "input_len";

/// Byte length of an operation output.
pub const OUTPUT_LEN: &str = "output_len";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";
