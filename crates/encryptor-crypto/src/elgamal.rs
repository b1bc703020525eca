//! Textbook ElGamal over `Z_p^*`, one plaintext byte per ciphertext pair.
//!
//! This is a teaching-scale construction. Each byte becomes two group
//! elements, so a 2048-bit group expands every byte to roughly 512 bytes of
//! ciphertext, and there is no padding: a zero byte encrypts to `b = 0`.
//! [`ElGamalParams::demo`] uses the 13-bit prime 7919 and offers no security
//! at all; [`ElGamalParams::modp_2048`] is the RFC 3526 group.
//!
//! Ciphertext serializes as `[{"a": "<decimal>", "b": "<decimal>"}, ...]`.

use encryptor_core::defaults::{ELGAMAL_MAX_PLAINTEXT, PRIMALITY_ROUNDS};
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, ToPrimitive, Zero};
use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{CryptoError, CryptoResult};

/// RFC 3526 group 14 (2048-bit MODP), generator 2.
const MODP_2048_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

const SMALL_PRIMES: [u32; 15] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47];

/// Serde helpers for big integers as decimal strings.
mod decimal {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim()
            .parse::<BigUint>()
            .map_err(|_| de::Error::custom(format!("invalid decimal integer: {:?}", s)))
    }
}

/// Miller-Rabin probabilistic primality test.
///
/// A composite passes with probability at most `4^-rounds`.
pub fn is_probable_prime<R: Rng + ?Sized>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    let two = BigUint::from(2u32);
    if n < &two {
        return false;
    }
    for &sp in SMALL_PRIMES.iter() {
        let sp = BigUint::from(sp);
        if n == &sp {
            return true;
        }
        if (n % &sp).is_zero() {
            return false;
        }
    }

    let n_minus_1 = n - 1u32;
    let s = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> s;

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = a.modpow(&d, n);
        if x.is_one() || x == n_minus_1 {
            continue;
        }
        for _ in 1..s {
            x = (&x * &x) % n;
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Public group parameters `(p, g)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ParamsRepr")]
pub struct ElGamalParams {
    #[serde(with = "decimal")]
    p: BigUint,
    #[serde(with = "decimal")]
    g: BigUint,
}

#[derive(Deserialize)]
struct ParamsRepr {
    #[serde(with = "decimal")]
    p: BigUint,
    #[serde(with = "decimal")]
    g: BigUint,
}

impl TryFrom<ParamsRepr> for ElGamalParams {
    type Error = CryptoError;

    fn try_from(repr: ParamsRepr) -> Result<Self, Self::Error> {
        ElGamalParams::new(repr.p, repr.g)
    }
}

impl ElGamalParams {
    /// Validate and build group parameters.
    ///
    /// `p` must be a prime greater than 255 so every byte value is a group
    /// element, and `g` must lie in `[2, p-2]`.
    pub fn new(p: BigUint, g: BigUint) -> CryptoResult<Self> {
        if p <= BigUint::from(ELGAMAL_MAX_PLAINTEXT) {
            return Err(CryptoError::InvalidParameters(format!(
                "prime must exceed {}, got {}",
                ELGAMAL_MAX_PLAINTEXT, p
            )));
        }
        if !is_probable_prime(&p, PRIMALITY_ROUNDS, &mut rand::thread_rng()) {
            return Err(CryptoError::InvalidParameters(
                "modulus is not prime".to_string(),
            ));
        }
        if g < BigUint::from(2u32) || g > &p - 2u32 {
            return Err(CryptoError::InvalidParameters(
                "generator must lie in [2, p-2]".to_string(),
            ));
        }
        debug!(subsystem = "elgamal", bits = p.bits(), "Validated group parameters");
        Ok(Self { p, g })
    }

    /// The demonstration group `p = 7919, g = 2`. Not secure.
    pub fn demo() -> Self {
        Self {
            p: BigUint::from(7919u32),
            g: BigUint::from(2u32),
        }
    }

    /// RFC 3526 2048-bit MODP group with generator 2.
    pub fn modp_2048() -> CryptoResult<Self> {
        let p = BigUint::parse_bytes(MODP_2048_HEX.as_bytes(), 16)
            .ok_or_else(|| CryptoError::InvalidParameters("bad MODP constant".to_string()))?;
        Self::new(p, BigUint::from(2u32))
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn g(&self) -> &BigUint {
        &self.g
    }

    /// Uniform exponent in `[1, p-2]`.
    fn random_exponent<R: RngCore + CryptoRng>(&self, rng: &mut R) -> BigUint {
        rng.gen_biguint_range(&BigUint::one(), &(&self.p - 1u32))
    }
}

/// Public key `y = g^x mod p` with its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PublicKeyRepr")]
pub struct ElGamalPublicKey {
    #[serde(flatten)]
    params: ElGamalParams,
    #[serde(with = "decimal")]
    y: BigUint,
}

#[derive(Deserialize)]
struct PublicKeyRepr {
    #[serde(flatten)]
    params: ElGamalParams,
    #[serde(with = "decimal")]
    y: BigUint,
}

impl TryFrom<PublicKeyRepr> for ElGamalPublicKey {
    type Error = CryptoError;

    fn try_from(repr: PublicKeyRepr) -> Result<Self, Self::Error> {
        if repr.y.is_zero() || repr.y >= repr.params.p {
            return Err(CryptoError::InvalidParameters(
                "public value must lie in [1, p-1]".to_string(),
            ));
        }
        Ok(Self {
            params: repr.params,
            y: repr.y,
        })
    }
}

impl ElGamalPublicKey {
    pub fn params(&self) -> &ElGamalParams {
        &self.params
    }

    pub fn y(&self) -> &BigUint {
        &self.y
    }
}

/// Key pair `(x, y)`. Held in memory only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KeyPairRepr")]
pub struct ElGamalKeyPair {
    #[serde(flatten)]
    params: ElGamalParams,
    #[serde(with = "decimal")]
    x: BigUint,
    #[serde(with = "decimal")]
    y: BigUint,
}

#[derive(Deserialize)]
struct KeyPairRepr {
    #[serde(flatten)]
    params: ElGamalParams,
    #[serde(with = "decimal")]
    x: BigUint,
}

impl TryFrom<KeyPairRepr> for ElGamalKeyPair {
    type Error = CryptoError;

    fn try_from(repr: KeyPairRepr) -> Result<Self, Self::Error> {
        ElGamalKeyPair::from_private(repr.params, repr.x)
    }
}

impl ElGamalKeyPair {
    /// Generate a key pair: `x` uniform in `[1, p-2]`, `y = g^x mod p`.
    pub fn generate<R: RngCore + CryptoRng>(params: &ElGamalParams, rng: &mut R) -> Self {
        let x = params.random_exponent(rng);
        let y = params.g.modpow(&x, &params.p);
        debug!(subsystem = "elgamal", op = "keygen", bits = params.p.bits(), "Generated key pair");
        Self {
            params: params.clone(),
            x,
            y,
        }
    }

    /// Rebuild a key pair from its private exponent.
    pub fn from_private(params: ElGamalParams, x: BigUint) -> CryptoResult<Self> {
        if x.is_zero() || x > &params.p - 2u32 {
            return Err(CryptoError::InvalidParameters(
                "private exponent must lie in [1, p-2]".to_string(),
            ));
        }
        let y = params.g.modpow(&x, &params.p);
        Ok(Self { params, x, y })
    }

    pub fn params(&self) -> &ElGamalParams {
        &self.params
    }

    /// Private exponent.
    pub fn x(&self) -> &BigUint {
        &self.x
    }

    /// Public value.
    pub fn y(&self) -> &BigUint {
        &self.y
    }

    pub fn public_key(&self) -> ElGamalPublicKey {
        ElGamalPublicKey {
            params: self.params.clone(),
            y: self.y.clone(),
        }
    }
}

impl std::fmt::Debug for ElGamalKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElGamalKeyPair")
            .field("params", &self.params)
            .field("x", &"[REDACTED]")
            .field("y", &self.y)
            .finish()
    }
}

/// Ciphertext for one byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElGamalPair {
    #[serde(with = "decimal")]
    pub a: BigUint,
    #[serde(with = "decimal")]
    pub b: BigUint,
}

/// Encrypt one byte under public value `y` with a fresh `k`.
pub fn encrypt_byte<R: RngCore + CryptoRng>(
    m: u8,
    y: &BigUint,
    params: &ElGamalParams,
    rng: &mut R,
) -> ElGamalPair {
    let k = params.random_exponent(rng);
    let a = params.g.modpow(&k, &params.p);
    let shared = y.modpow(&k, &params.p);
    let b = (shared * BigUint::from(m)) % &params.p;
    ElGamalPair { a, b }
}

/// Decrypt one pair with private exponent `x`.
///
/// Computes `m = b * a^(p-1-x) mod p`. Components outside `[0, p)` are a
/// format error; a recovered value above 255 means the wrong key or a
/// corrupted pair.
pub fn decrypt_byte(pair: &ElGamalPair, x: &BigUint, params: &ElGamalParams) -> CryptoResult<u8> {
    let p = &params.p;
    if &pair.a >= p || &pair.b >= p || pair.a.is_zero() {
        return Err(CryptoError::InvalidFormat(
            "ciphertext pair is not in the group".to_string(),
        ));
    }
    if x.is_zero() || x >= &(p - 1u32) {
        return Err(CryptoError::InvalidParameters(
            "private exponent must lie in [1, p-2]".to_string(),
        ));
    }

    let exponent = p - 1u32 - x;
    let m = (&pair.b * pair.a.modpow(&exponent, p)) % p;
    match m.to_u32() {
        Some(v) if v <= ELGAMAL_MAX_PLAINTEXT => Ok(v as u8),
        _ => Err(CryptoError::Decryption),
    }
}

/// Encrypt a byte string, one pair per byte, in order.
pub fn encrypt<R: RngCore + CryptoRng>(
    plaintext: &[u8],
    public: &ElGamalPublicKey,
    rng: &mut R,
) -> Vec<ElGamalPair> {
    let pairs: Vec<ElGamalPair> = plaintext
        .iter()
        .map(|&m| encrypt_byte(m, &public.y, &public.params, rng))
        .collect();
    trace!(subsystem = "elgamal", op = "encrypt", pairs = pairs.len(), "Encrypted bytes");
    pairs
}

/// Decrypt pairs back to bytes, in order.
pub fn decrypt(pairs: &[ElGamalPair], keys: &ElGamalKeyPair) -> CryptoResult<Vec<u8>> {
    let plaintext = pairs
        .iter()
        .map(|pair| decrypt_byte(pair, &keys.x, &keys.params))
        .collect::<CryptoResult<Vec<u8>>>()?;
    trace!(subsystem = "elgamal", op = "decrypt", pairs = pairs.len(), "Decrypted bytes");
    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_primality() {
        let mut rng = StdRng::seed_from_u64(1);
        for p in [2u32, 3, 47, 257, 7919, 65537] {
            assert!(is_probable_prime(&BigUint::from(p), 16, &mut rng), "{}", p);
        }
        // 561 is a Carmichael number
        for c in [0u32, 1, 4, 561, 7917, 65535] {
            assert!(!is_probable_prime(&BigUint::from(c), 16, &mut rng), "{}", c);
        }
    }

    #[test]
    fn test_params_reject_small_prime() {
        let result = ElGamalParams::new(BigUint::from(251u32), BigUint::from(2u32));
        assert!(matches!(result, Err(CryptoError::InvalidParameters(_))));
    }

    #[test]
    fn test_params_reject_composite() {
        let result = ElGamalParams::new(BigUint::from(7917u32), BigUint::from(2u32));
        assert!(matches!(result, Err(CryptoError::InvalidParameters(_))));
    }

    #[test]
    fn test_params_reject_bad_generator() {
        for g in [0u32, 1, 7918] {
            let result = ElGamalParams::new(BigUint::from(7919u32), BigUint::from(g));
            assert!(result.is_err(), "g = {}", g);
        }
    }

    #[test]
    fn test_demo_params_validate() {
        let demo = ElGamalParams::demo();
        assert_eq!(
            ElGamalParams::new(demo.p().clone(), demo.g().clone()).unwrap(),
            demo
        );
    }

    #[test]
    fn test_modp_2048() {
        let params = ElGamalParams::modp_2048().unwrap();
        assert_eq!(params.p().bits(), 2048);
        let mut rng = StdRng::seed_from_u64(3);
        let keys = ElGamalKeyPair::generate(&params, &mut rng);
        let ct = encrypt(b"hi", &keys.public_key(), &mut rng);
        assert_eq!(decrypt(&ct, &keys).unwrap(), b"hi");
    }

    #[test]
    fn test_key_generation_range() {
        let params = ElGamalParams::demo();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..200 {
            let keys = ElGamalKeyPair::generate(&params, &mut rng);
            assert!(keys.x() >= &BigUint::one());
            assert!(keys.x() <= &BigUint::from(7917u32));
            assert_eq!(keys.y(), &params.g().modpow(keys.x(), params.p()));
        }
    }

    #[test]
    fn test_fresh_randomness_per_byte() {
        let params = ElGamalParams::demo();
        let mut rng = StdRng::seed_from_u64(11);
        let keys = ElGamalKeyPair::generate(&params, &mut rng);
        let ct = encrypt(&[b'A'; 16], &keys.public_key(), &mut rng);
        let distinct: std::collections::HashSet<_> = ct.iter().map(|p| p.a.clone()).collect();
        assert!(distinct.len() > 1);
    }

    #[test]
    fn test_decrypt_rejects_out_of_group_pair() {
        let params = ElGamalParams::demo();
        let keys = ElGamalKeyPair::generate(&params, &mut StdRng::seed_from_u64(5));
        let pair = ElGamalPair {
            a: BigUint::from(7919u32),
            b: BigUint::from(1u32),
        };
        assert!(matches!(
            decrypt_byte(&pair, keys.x(), &params),
            Err(CryptoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_decrypt_large_value_is_failure() {
        let params = ElGamalParams::demo();
        let keys = ElGamalKeyPair::generate(&params, &mut StdRng::seed_from_u64(5));
        // a = 1 makes the mask 1, so m = b
        let pair = ElGamalPair {
            a: BigUint::one(),
            b: BigUint::from(4000u32),
        };
        assert!(matches!(
            decrypt_byte(&pair, keys.x(), &params),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_pair_json_is_decimal_strings() {
        let pair = ElGamalPair {
            a: BigUint::from(1234u32),
            b: BigUint::from(56u32),
        };
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"a":"1234","b":"56"}"#);
        let parsed: ElGamalPair = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pair);
        assert!(serde_json::from_str::<ElGamalPair>(r#"{"a":"x","b":"1"}"#).is_err());
    }

    #[test]
    fn test_keypair_json_recomputes_public_value() {
        let params = ElGamalParams::demo();
        let keys = ElGamalKeyPair::generate(&params, &mut StdRng::seed_from_u64(21));
        let json = serde_json::to_string(&keys).unwrap();
        let parsed: ElGamalKeyPair = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, keys);

        let public_json = serde_json::to_string(&keys.public_key()).unwrap();
        let public: ElGamalPublicKey = serde_json::from_str(&public_json).unwrap();
        assert_eq!(public.y(), keys.y());
    }

    #[test]
    fn test_keypair_debug_redacts_private_exponent() {
        let keys = ElGamalKeyPair::from_private(ElGamalParams::demo(), BigUint::from(4321u32)).unwrap();
        assert!(!format!("{:?}", keys).contains("4321"));
    }

    #[test]
    fn test_public_key_rejects_invalid_params() {
        let json = r#"{"p":"7917","g":"2","y":"5"}"#;
        assert!(serde_json::from_str::<ElGamalPublicKey>(json).is_err());
    }
}
