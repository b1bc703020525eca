//! # encryptor-crypto
//!
//! Password envelopes and from-scratch public-key constructions.
//!
//! ## Cryptographic Primitives
//!
//! - **Envelope ciphers**: AES-256, Triple DES and Blowfish in CBC mode with
//!   PKCS#7 padding; the Rabbit stream cipher
//! - **Password KDF**: PBKDF2-HMAC-SHA256, 100,000 iterations
//! - **ElGamal**: textbook, one byte per ciphertext pair, over `Z_p^*`
//! - **Elliptic curves**: secp256k1 and P-256, Jacobian arithmetic over
//!   arbitrary-precision integers
//! - **ECIES**: ephemeral ECDH, shared secret keys an AES envelope
//! - **Key wrap**: RSA-OAEP-SHA256, or ECDH + HKDF-SHA256 + AES-256-GCM
//! - **Key storage**: Argon2id + AES-256-GCM (ENCKEY01)
//!
//! ## Envelope Format
//!
//! ```text
//! { "version": 1, "alg": "AES|TripleDES|Blowfish|Rabbit",
//!   "saltHex": <32 hex>, "ivHex": <32 hex>, "ctB64": <base64>,
//!   "kind": "text|file", "name": <string|null>, "type": <mime> }
//! ```
//!
//! ## Examples
//!
//! ### Seal and Open Text
//!
//! ```rust
//! use encryptor_crypto::{Algorithm, CryptoError, Envelope, Payload};
//!
//! let envelope = Envelope::seal(&Payload::text("Hello World"), "secret1", Algorithm::Aes).unwrap();
//! let json = envelope.to_json().unwrap();
//!
//! let parsed = Envelope::from_json(&json).unwrap();
//! assert_eq!(parsed.open("secret1").unwrap(), Payload::text("Hello World"));
//! assert!(matches!(parsed.open("secret2"), Err(CryptoError::Decryption)));
//! ```
//!
//! ### ECIES
//!
//! ```rust
//! use encryptor_crypto::{ecies, Curve, EcKeyPair, Payload};
//!
//! let bob = EcKeyPair::generate(Curve::Secp256k1, &mut rand::thread_rng());
//! let message = ecies::encrypt(&Payload::text("for bob"), &bob.public).unwrap();
//! assert_eq!(ecies::decrypt(&message, &bob.private).unwrap(), Payload::text("for bob"));
//! ```
//!
//! ### ElGamal
//!
//! ```rust
//! use encryptor_crypto::elgamal::{self, ElGamalKeyPair, ElGamalParams};
//!
//! let mut rng = rand::thread_rng();
//! let keys = ElGamalKeyPair::generate(&ElGamalParams::demo(), &mut rng);
//! let pairs = elgamal::encrypt(b"hi", &keys.public_key(), &mut rng);
//! assert_eq!(elgamal::decrypt(&pairs, &keys).unwrap(), b"hi");
//! ```
//!
//! ### Format Detection
//!
//! ```rust
//! use encryptor_crypto::{detect_format, DocumentFormat};
//!
//! match detect_format(b"Some data") {
//!     DocumentFormat::Envelope => println!("Password envelope"),
//!     DocumentFormat::Unknown => println!("Not encrypted"),
//!     other => println!("{:?}", other),
//! }
//! ```

pub mod cipher;
pub mod codec;
pub mod detect;
pub mod ecc;
pub mod ecies;
pub mod elgamal;
pub mod envelope;
pub mod error;
pub mod format;
pub mod hash;
pub mod hybrid;
pub mod kdf;
pub mod keystore;
pub mod keywrap;

// Re-export commonly used types
pub use cipher::{Algorithm, CipherPayload};
pub use detect::{detect_format, is_encrypted, DocumentFormat};
pub use ecc::{Curve, EcKeyPair, EcPrivateKey, EcPublicKey};
pub use ecies::EciesMessage;
pub use elgamal::{ElGamalKeyPair, ElGamalPair, ElGamalParams, ElGamalPublicKey};
pub use envelope::{encrypted_file_name, looks_like_envelope_file, Envelope, Payload, PayloadKind};
pub use error::{CryptoError, CryptoResult, ErrorKind};
pub use hash::HashAlgorithm;
pub use hybrid::HybridPackage;
pub use kdf::{derive_key, validate_password, DerivedKey};
pub use keystore::{KeyKind, Keystore};
pub use keywrap::{
    rsa_decrypt_message, rsa_encrypt_message, EcWrapPrivateKey, EcWrapPublicKey,
    RsaWrapPrivateKey, RsaWrapPublicKey, UnwrappingKey, WrappingKey,
};
