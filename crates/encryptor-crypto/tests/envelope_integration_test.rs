//! Integration tests for password envelopes.
//!
//! This test suite validates:
//! - Round trips for every algorithm across block-boundary lengths
//! - Wrong-password rejection
//! - Fresh salt and IV per seal
//! - Wire format gating (version, algorithm, required fields)

use std::collections::HashSet;

use encryptor_crypto::{
    detect_format, Algorithm, CryptoError, DocumentFormat, Envelope, ErrorKind, Payload,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rstest::rstest;
use serde_json::Value;

fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

// ============================================================================
// Test Category 1: Round Trips
// ============================================================================

#[rstest]
fn test_file_roundtrip_across_lengths(
    #[values(Algorithm::Aes, Algorithm::TripleDes, Algorithm::Blowfish, Algorithm::Rabbit)]
    alg: Algorithm,
    #[values(0, 1, 15, 16, 17, 1024)] len: usize,
) {
    let mut rng = StdRng::seed_from_u64(len as u64);
    let payload = Payload::file("data.bin", None, sample_bytes(len));

    let envelope = Envelope::seal_with_rng(&payload, "roundtrip-pw", alg, &mut rng).unwrap();
    let json = envelope.to_json().unwrap();
    let opened = Envelope::from_json(&json).unwrap().open("roundtrip-pw").unwrap();

    assert_eq!(opened, payload);
}

#[test]
fn test_hello_world_scenario() {
    let envelope = Envelope::seal(&Payload::text("Hello World"), "secret1", Algorithm::Aes).unwrap();
    let json = envelope.to_json().unwrap();

    let parsed = Envelope::from_json(&json).unwrap();
    assert_eq!(parsed.open("secret1").unwrap(), Payload::text("Hello World"));

    let err = parsed.open("secret2").unwrap_err();
    assert!(matches!(err, CryptoError::Decryption));
    assert_eq!(err.kind(), ErrorKind::CryptoFailure);
}

#[test]
fn test_unicode_text_roundtrip() {
    let text = "Grüße, 世界! 🔐";
    for alg in Algorithm::ALL {
        let envelope = Envelope::seal(&Payload::text(text), "unicode-pw", alg).unwrap();
        assert_eq!(envelope.open("unicode-pw").unwrap(), Payload::text(text));
    }
}

#[test]
fn test_file_metadata_survives_json() {
    let payload = Payload::file("photo.png", Some("image/png"), vec![0x89, b'P', b'N', b'G']);
    let envelope = Envelope::seal(&payload, "metadata-pw", Algorithm::Blowfish).unwrap();

    let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
    assert_eq!(value["kind"], "file");
    assert_eq!(value["name"], "photo.png");
    assert_eq!(value["type"], "image/png");

    let opened = Envelope::from_value(value).unwrap().open("metadata-pw").unwrap();
    assert_eq!(opened, payload);
}

// ============================================================================
// Test Category 2: Wrong Password
// ============================================================================

#[rstest]
#[case(Algorithm::Aes)]
#[case(Algorithm::TripleDes)]
#[case(Algorithm::Blowfish)]
#[case(Algorithm::Rabbit)]
fn test_wrong_password_rejected(#[case] alg: Algorithm) {
    let mut rng = StdRng::seed_from_u64(99);
    let text = "The quick brown fox jumps over the lazy dog, twice over.";
    let envelope =
        Envelope::seal_with_rng(&Payload::text(text), "correct-horse", alg, &mut rng).unwrap();

    assert!(matches!(
        envelope.open("battery-staple"),
        Err(CryptoError::Decryption)
    ));
}

#[test]
fn test_short_password_rejected_before_decryption() {
    let envelope = Envelope::seal(&Payload::text("hi there"), "longenough", Algorithm::Aes).unwrap();
    let err = envelope.open("short").unwrap_err();
    assert!(matches!(err, CryptoError::PasswordTooShort(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ============================================================================
// Test Category 3: Randomness
// ============================================================================

fn assert_unique_seals(count: usize) {
    let payload = Payload::text("same plaintext every time");
    let mut salts = HashSet::new();
    let mut ivs = HashSet::new();
    let mut cts = HashSet::new();

    for _ in 0..count {
        let envelope = Envelope::seal(&payload, "same-password", Algorithm::Aes).unwrap();
        salts.insert(envelope.salt_hex().to_string());
        ivs.insert(envelope.iv_hex().to_string());
        cts.insert(envelope.ciphertext_b64().to_string());
    }

    assert_eq!(salts.len(), count);
    assert_eq!(ivs.len(), count);
    assert_eq!(cts.len(), count);
}

#[test]
fn test_salt_and_iv_fresh_per_seal() {
    assert_unique_seals(10);
}

#[test]
#[ignore] // 1000 PBKDF2 derivations
fn test_salt_and_iv_fresh_per_seal_large_sample() {
    assert_unique_seals(1000);
}

#[test]
fn test_salt_and_iv_are_32_hex_chars() {
    for alg in Algorithm::ALL {
        let envelope = Envelope::seal(&Payload::text("shape"), "shape-pw", alg).unwrap();
        assert_eq!(envelope.salt_hex().len(), 32);
        assert_eq!(envelope.iv_hex().len(), 32);
        assert!(envelope.salt_hex().chars().all(|c| c.is_ascii_hexdigit()));
    }
}

// ============================================================================
// Test Category 4: Format Gating
// ============================================================================

fn sealed_value() -> Value {
    let mut rng = StdRng::seed_from_u64(7);
    let envelope =
        Envelope::seal_with_rng(&Payload::text("gate me"), "gating-pw", Algorithm::Aes, &mut rng)
            .unwrap();
    serde_json::from_str(&envelope.to_json().unwrap()).unwrap()
}

#[test]
fn test_unsupported_version_rejected() {
    let mut value = sealed_value();
    value["version"] = Value::from(2);

    let envelope = Envelope::from_value(value).unwrap();
    assert_eq!(envelope.version(), 2);
    assert!(matches!(
        envelope.open("gating-pw"),
        Err(CryptoError::UnsupportedVersion(2))
    ));
}

#[test]
fn test_unknown_algorithm_rejected() {
    let mut value = sealed_value();
    value["alg"] = Value::from("ChaCha20");

    let err = Envelope::from_value(value).unwrap_err();
    assert!(matches!(err, CryptoError::InvalidFormat(ref msg) if msg.contains("ChaCha20")));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[rstest]
#[case("version")]
#[case("alg")]
#[case("saltHex")]
#[case("ivHex")]
#[case("ctB64")]
#[case("kind")]
fn test_missing_required_field(#[case] field: &str) {
    let mut value = sealed_value();
    value.as_object_mut().unwrap().remove(field);

    match Envelope::from_value(value) {
        Err(CryptoError::MissingField(name)) => assert_eq!(name, field),
        other => panic!("expected MissingField({}), got {:?}", field, other),
    }
}

#[test]
fn test_corrupted_hex_is_format_error() {
    let mut value = sealed_value();
    value["saltHex"] = Value::from("not-hex-at-all!!");

    let envelope = Envelope::from_value(value).unwrap();
    assert!(matches!(
        envelope.open("gating-pw"),
        Err(CryptoError::InvalidFormat(_))
    ));
}

#[test]
fn test_detects_sealed_envelope() {
    let json = serde_json::to_string(&sealed_value()).unwrap();
    assert_eq!(detect_format(json.as_bytes()), DocumentFormat::Envelope);
}
