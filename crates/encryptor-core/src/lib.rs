//! # encryptor-core
//!
//! Shared building blocks for the encryptor workspace.
//!
//! This crate holds the values and abstractions that sit next to the
//! cryptographic core without being part of it: the default limits every
//! surface agrees on, structured logging field names, and the key-value
//! repository used by callers that need to persist state.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod store;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use store::{FileStore, KeyValueStore, MemoryStore};
