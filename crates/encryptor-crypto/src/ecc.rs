//! Short-Weierstrass elliptic curve arithmetic over arbitrary-precision
//! integers.
//!
//! Points are added and doubled in Jacobian coordinates `(X, Y, Z)` with
//! `x = X/Z^2`, `y = Y/Z^3`, so only the final conversion to affine needs a
//! field inversion. Scalar multiplication is left-to-right double-and-add.
//!
//! None of this is constant time. It backs the ECIES and EC key-wrap
//! constructions of this crate and is not meant for hostile environments.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::format::hex_decode;

/// Length of a field element or scalar in bytes for the supported curves.
pub const FIELD_BYTES: usize = 32;

/// Length of an uncompressed SEC1 point: `04 || X || Y`.
pub const UNCOMPRESSED_POINT_LEN: usize = 1 + 2 * FIELD_BYTES;

const SECP256K1_P: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xFC, 0x2F,
];

const SECP256K1_GX: [u8; 32] = [
    0x79, 0xBE, 0x66, 0x7E, 0xF9, 0xDC, 0xBB, 0xAC,
    0x55, 0xA0, 0x62, 0x95, 0xCE, 0x87, 0x0B, 0x07,
    0x02, 0x9B, 0xFC, 0xDB, 0x2D, 0xCE, 0x28, 0xD9,
    0x59, 0xF2, 0x81, 0x5B, 0x16, 0xF8, 0x17, 0x98,
];

const SECP256K1_GY: [u8; 32] = [
    0x48, 0x3A, 0xDA, 0x77, 0x26, 0xA3, 0xC4, 0x65,
    0x5D, 0xA4, 0xFB, 0xFC, 0x0E, 0x11, 0x08, 0xA8,
    0xFD, 0x17, 0xB4, 0x48, 0xA6, 0x85, 0x54, 0x19,
    0x9C, 0x47, 0xD0, 0x8F, 0xFB, 0x10, 0xD4, 0xB8,
];

const SECP256K1_N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B,
    0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

const P256_P: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x01,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

const P256_B: [u8; 32] = [
    0x5A, 0xC6, 0x35, 0xD8, 0xAA, 0x3A, 0x93, 0xE7,
    0xB3, 0xEB, 0xBD, 0x55, 0x76, 0x98, 0x86, 0xBC,
    0x65, 0x1D, 0x06, 0xB0, 0xCC, 0x53, 0xB0, 0xF6,
    0x3B, 0xCE, 0x3C, 0x3E, 0x27, 0xD2, 0x60, 0x4B,
];

const P256_GX: [u8; 32] = [
    0x6B, 0x17, 0xD1, 0xF2, 0xE1, 0x2C, 0x42, 0x47,
    0xF8, 0xBC, 0xE6, 0xE5, 0x63, 0xA4, 0x40, 0xF2,
    0x77, 0x03, 0x7D, 0x81, 0x2D, 0xEB, 0x33, 0xA0,
    0xF4, 0xA1, 0x39, 0x45, 0xD8, 0x98, 0xC2, 0x96,
];

const P256_GY: [u8; 32] = [
    0x4F, 0xE3, 0x42, 0xE2, 0xFE, 0x1A, 0x7F, 0x9B,
    0x8E, 0xE7, 0xEB, 0x4A, 0x7C, 0x0F, 0x9E, 0x16,
    0x2B, 0xCE, 0x33, 0x57, 0x6B, 0x31, 0x5E, 0xCE,
    0xCB, 0xB6, 0x40, 0x68, 0x37, 0xBF, 0x51, 0xF5,
];

const P256_N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xBC, 0xE6, 0xFA, 0xAD, 0xA7, 0x17, 0x9E, 0x84,
    0xF3, 0xB9, 0xCA, 0xC2, 0xFC, 0x63, 0x25, 0x51,
];

/// Domain parameters of a curve `y^2 = x^3 + ax + b` over `F_p`.
#[derive(Debug)]
pub struct CurveParams {
    pub p: BigUint,
    pub a: BigUint,
    pub b: BigUint,
    pub gx: BigUint,
    pub gy: BigUint,
    /// Order of the base point.
    pub n: BigUint,
}

/// Supported curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[serde(rename = "secp256k1")]
    Secp256k1,
    #[serde(rename = "P-256")]
    P256,
}

impl Curve {
    pub fn name(&self) -> &'static str {
        match self {
            Curve::Secp256k1 => "secp256k1",
            Curve::P256 => "P-256",
        }
    }

    /// Domain parameters, built once per process.
    pub fn params(&self) -> &'static CurveParams {
        static SECP256K1: OnceLock<CurveParams> = OnceLock::new();
        static P256: OnceLock<CurveParams> = OnceLock::new();

        match self {
            Curve::Secp256k1 => SECP256K1.get_or_init(|| CurveParams {
                p: BigUint::from_bytes_be(&SECP256K1_P),
                a: BigUint::zero(),
                b: BigUint::from(7u32),
                gx: BigUint::from_bytes_be(&SECP256K1_GX),
                gy: BigUint::from_bytes_be(&SECP256K1_GY),
                n: BigUint::from_bytes_be(&SECP256K1_N),
            }),
            Curve::P256 => P256.get_or_init(|| {
                let p = BigUint::from_bytes_be(&P256_P);
                CurveParams {
                    a: &p - 3u32,
                    p,
                    b: BigUint::from_bytes_be(&P256_B),
                    gx: BigUint::from_bytes_be(&P256_GX),
                    gy: BigUint::from_bytes_be(&P256_GY),
                    n: BigUint::from_bytes_be(&P256_N),
                }
            }),
        }
    }

    /// Base point.
    pub fn generator(&self) -> Point {
        let params = self.params();
        Point {
            curve: *self,
            coords: Some((params.gx.clone(), params.gy.clone())),
        }
    }

    /// Order of the base point.
    pub fn order(&self) -> &'static BigUint {
        &self.params().n
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "secp256k1" | "k256" => Ok(Curve::Secp256k1),
            "p-256" | "p256" | "secp256r1" | "prime256v1" => Ok(Curve::P256),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("curve {}", s))),
        }
    }
}

/// Arithmetic modulo the field prime.
struct Field<'a> {
    p: &'a BigUint,
}

impl Field<'_> {
    fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % self.p
    }

    fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        ((a + self.p) - (b % self.p)) % self.p
    }

    fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % self.p
    }

    fn sqr(&self, a: &BigUint) -> BigUint {
        self.mul(a, a)
    }

    fn scale(&self, a: &BigUint, k: u32) -> BigUint {
        (a * k) % self.p
    }

    /// Inverse by Fermat's little theorem; `a` must be non-zero.
    fn inv(&self, a: &BigUint) -> BigUint {
        a.modpow(&(self.p - 2u32), self.p)
    }

    /// Square root for `p = 3 (mod 4)`, if one exists.
    fn sqrt(&self, a: &BigUint) -> Option<BigUint> {
        let root = a.modpow(&((self.p + 1u32) >> 2), self.p);
        (self.sqr(&root) == a % self.p).then_some(root)
    }
}

/// Jacobian point; `z == 0` is the point at infinity.
struct Jacobian {
    x: BigUint,
    y: BigUint,
    z: BigUint,
}

impl Jacobian {
    fn infinity() -> Self {
        Self {
            x: BigUint::one(),
            y: BigUint::one(),
            z: BigUint::zero(),
        }
    }

    fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }
}

fn jacobian_double(params: &CurveParams, pt: &Jacobian) -> Jacobian {
    if pt.is_infinity() || pt.y.is_zero() {
        return Jacobian::infinity();
    }
    let f = Field { p: &params.p };

    let y2 = f.sqr(&pt.y);
    let s = f.scale(&f.mul(&pt.x, &y2), 4);
    let z2 = f.sqr(&pt.z);
    let m = f.add(
        &f.scale(&f.sqr(&pt.x), 3),
        &f.mul(&params.a, &f.sqr(&z2)),
    );
    let x3 = f.sub(&f.sqr(&m), &f.scale(&s, 2));
    let y3 = f.sub(&f.mul(&m, &f.sub(&s, &x3)), &f.scale(&f.sqr(&y2), 8));
    let z3 = f.scale(&f.mul(&pt.y, &pt.z), 2);

    Jacobian {
        x: x3,
        y: y3,
        z: z3,
    }
}

fn jacobian_add(params: &CurveParams, p1: &Jacobian, p2: &Jacobian) -> Jacobian {
    if p1.is_infinity() {
        return Jacobian {
            x: p2.x.clone(),
            y: p2.y.clone(),
            z: p2.z.clone(),
        };
    }
    if p2.is_infinity() {
        return Jacobian {
            x: p1.x.clone(),
            y: p1.y.clone(),
            z: p1.z.clone(),
        };
    }
    let f = Field { p: &params.p };

    let z1z1 = f.sqr(&p1.z);
    let z2z2 = f.sqr(&p2.z);
    let u1 = f.mul(&p1.x, &z2z2);
    let u2 = f.mul(&p2.x, &z1z1);
    let s1 = f.mul(&p1.y, &f.mul(&p2.z, &z2z2));
    let s2 = f.mul(&p2.y, &f.mul(&p1.z, &z1z1));

    if u1 == u2 {
        return if s1 == s2 {
            jacobian_double(params, p1)
        } else {
            Jacobian::infinity()
        };
    }

    let h = f.sub(&u2, &u1);
    let r = f.sub(&s2, &s1);
    let h2 = f.sqr(&h);
    let h3 = f.mul(&h, &h2);
    let u1h2 = f.mul(&u1, &h2);

    let x3 = f.sub(&f.sub(&f.sqr(&r), &h3), &f.scale(&u1h2, 2));
    let y3 = f.sub(&f.mul(&r, &f.sub(&u1h2, &x3)), &f.mul(&s1, &h3));
    let z3 = f.mul(&h, &f.mul(&p1.z, &p2.z));

    Jacobian {
        x: x3,
        y: y3,
        z: z3,
    }
}

/// A curve point in affine coordinates, or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    curve: Curve,
    coords: Option<(BigUint, BigUint)>,
}

impl Point {
    pub fn infinity(curve: Curve) -> Self {
        Self {
            curve,
            coords: None,
        }
    }

    /// Build an affine point, checking it lies on the curve.
    pub fn from_affine(curve: Curve, x: BigUint, y: BigUint) -> CryptoResult<Self> {
        let point = Self {
            curve,
            coords: Some((x, y)),
        };
        if !point.is_on_curve() {
            return Err(CryptoError::InvalidFormat(format!(
                "point is not on {}",
                curve
            )));
        }
        Ok(point)
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn is_infinity(&self) -> bool {
        self.coords.is_none()
    }

    pub fn x(&self) -> Option<&BigUint> {
        self.coords.as_ref().map(|(x, _)| x)
    }

    pub fn y(&self) -> Option<&BigUint> {
        self.coords.as_ref().map(|(_, y)| y)
    }

    /// Whether the point satisfies the curve equation.
    pub fn is_on_curve(&self) -> bool {
        let Some((x, y)) = &self.coords else {
            return true;
        };
        let params = self.curve.params();
        if x >= &params.p || y >= &params.p {
            return false;
        }
        let f = Field { p: &params.p };
        let rhs = f.add(
            &f.add(&f.mul(&f.sqr(x), x), &f.mul(&params.a, x)),
            &params.b,
        );
        f.sqr(y) == rhs
    }

    fn to_jacobian(&self) -> Jacobian {
        match &self.coords {
            Some((x, y)) => Jacobian {
                x: x.clone(),
                y: y.clone(),
                z: BigUint::one(),
            },
            None => Jacobian::infinity(),
        }
    }

    fn from_jacobian(curve: Curve, pt: &Jacobian) -> Self {
        if pt.is_infinity() {
            return Self::infinity(curve);
        }
        let params = curve.params();
        let f = Field { p: &params.p };
        let z_inv = f.inv(&pt.z);
        let z_inv2 = f.sqr(&z_inv);
        let x = f.mul(&pt.x, &z_inv2);
        let y = f.mul(&pt.y, &f.mul(&z_inv2, &z_inv));
        Self {
            curve,
            coords: Some((x, y)),
        }
    }

    /// Point addition. Both points must be on the same curve.
    pub fn add(&self, other: &Point) -> CryptoResult<Point> {
        if self.curve != other.curve {
            return Err(CryptoError::InvalidFormat(format!(
                "cannot add a {} point to a {} point",
                other.curve, self.curve
            )));
        }
        let sum = jacobian_add(self.curve.params(), &self.to_jacobian(), &other.to_jacobian());
        Ok(Self::from_jacobian(self.curve, &sum))
    }

    /// Point doubling.
    pub fn double(&self) -> Point {
        let doubled = jacobian_double(self.curve.params(), &self.to_jacobian());
        Self::from_jacobian(self.curve, &doubled)
    }

    /// Additive inverse.
    pub fn negate(&self) -> Point {
        let params = self.curve.params();
        Self {
            curve: self.curve,
            coords: self
                .coords
                .as_ref()
                .map(|(x, y)| (x.clone(), (&params.p - y) % &params.p)),
        }
    }

    /// Uncompressed SEC1 encoding `04 || X || Y`.
    pub fn to_sec1_bytes(&self) -> CryptoResult<Vec<u8>> {
        let (x, y) = self.coords.as_ref().ok_or_else(|| {
            CryptoError::InvalidInput("the point at infinity has no encoding".to_string())
        })?;
        let mut out = Vec::with_capacity(UNCOMPRESSED_POINT_LEN);
        out.push(0x04);
        out.extend_from_slice(&to_fixed_bytes(x));
        out.extend_from_slice(&to_fixed_bytes(y));
        Ok(out)
    }

    /// Compressed SEC1 encoding `02|03 || X`.
    pub fn to_sec1_compressed(&self) -> CryptoResult<Vec<u8>> {
        let (x, y) = self.coords.as_ref().ok_or_else(|| {
            CryptoError::InvalidInput("the point at infinity has no encoding".to_string())
        })?;
        let mut out = Vec::with_capacity(1 + FIELD_BYTES);
        out.push(if y.bit(0) { 0x03 } else { 0x02 });
        out.extend_from_slice(&to_fixed_bytes(x));
        Ok(out)
    }

    /// Decode a SEC1 point (uncompressed or compressed) and validate it.
    pub fn from_sec1_bytes(curve: Curve, bytes: &[u8]) -> CryptoResult<Self> {
        match (bytes.first(), bytes.len()) {
            (Some(0x04), UNCOMPRESSED_POINT_LEN) => {
                let x = BigUint::from_bytes_be(&bytes[1..1 + FIELD_BYTES]);
                let y = BigUint::from_bytes_be(&bytes[1 + FIELD_BYTES..]);
                Self::from_affine(curve, x, y)
            }
            (Some(&tag @ (0x02 | 0x03)), len) if len == 1 + FIELD_BYTES => {
                let params = curve.params();
                let x = BigUint::from_bytes_be(&bytes[1..]);
                if x >= params.p {
                    return Err(CryptoError::InvalidFormat("x is not a field element".into()));
                }
                let f = Field { p: &params.p };
                let rhs = f.add(
                    &f.add(&f.mul(&f.sqr(&x), &x), &f.mul(&params.a, &x)),
                    &params.b,
                );
                let mut y = f
                    .sqrt(&rhs)
                    .ok_or_else(|| CryptoError::InvalidFormat(format!("point is not on {}", curve)))?;
                if y.bit(0) != (tag == 0x03) {
                    y = (&params.p - &y) % &params.p;
                }
                Self::from_affine(curve, x, y)
            }
            _ => Err(CryptoError::InvalidFormat(format!(
                "expected a {}-byte uncompressed or {}-byte compressed SEC1 point, got {} bytes",
                UNCOMPRESSED_POINT_LEN,
                1 + FIELD_BYTES,
                bytes.len()
            ))),
        }
    }

    /// Uncompressed SEC1 encoding as lowercase hex.
    pub fn to_sec1_hex(&self) -> CryptoResult<String> {
        Ok(hex::encode(self.to_sec1_bytes()?))
    }

    /// Decode a hex SEC1 point.
    pub fn from_sec1_hex(curve: Curve, hex_str: &str) -> CryptoResult<Self> {
        Self::from_sec1_bytes(curve, &hex_decode(hex_str, "public key")?)
    }
}

/// Big-endian, left-padded to [`FIELD_BYTES`].
fn to_fixed_bytes(value: &BigUint) -> [u8; FIELD_BYTES] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    let start = FIELD_BYTES.saturating_sub(bytes.len());
    let take = bytes.len().min(FIELD_BYTES);
    out[start..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}

/// Scalar multiplication `k * P` by double-and-add.
pub fn scalar_mul(k: &BigUint, point: &Point) -> Point {
    let params = point.curve.params();
    let base = point.to_jacobian();
    let mut acc = Jacobian::infinity();

    for i in (0..k.bits()).rev() {
        acc = jacobian_double(params, &acc);
        if k.bit(i) {
            acc = jacobian_add(params, &acc, &base);
        }
    }
    Point::from_jacobian(point.curve, &acc)
}

/// Private scalar in `[1, n-1]`.
#[derive(Clone)]
pub struct EcPrivateKey {
    curve: Curve,
    scalar: BigUint,
}

impl EcPrivateKey {
    pub fn generate<R: RngCore + CryptoRng>(curve: Curve, rng: &mut R) -> Self {
        let scalar = rng.gen_biguint_range(&BigUint::one(), curve.order());
        Self { curve, scalar }
    }

    /// Build from a scalar, rejecting values outside `[1, n-1]`.
    pub fn from_scalar(curve: Curve, scalar: BigUint) -> CryptoResult<Self> {
        if scalar.is_zero() || &scalar >= curve.order() {
            return Err(CryptoError::InvalidParameters(format!(
                "private scalar out of range for {}",
                curve
            )));
        }
        Ok(Self { curve, scalar })
    }

    /// Parse a big-endian hex scalar.
    pub fn from_hex(curve: Curve, hex_str: &str) -> CryptoResult<Self> {
        let bytes = Zeroizing::new(hex_decode(hex_str, "private key")?);
        if bytes.len() != FIELD_BYTES {
            return Err(CryptoError::InvalidFormat(format!(
                "private key must be {} bytes, got {}",
                FIELD_BYTES,
                bytes.len()
            )));
        }
        Self::from_scalar(curve, BigUint::from_bytes_be(&bytes))
    }

    /// Fixed-width (64 character) hex encoding.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(to_fixed_bytes(&self.scalar)))
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn scalar(&self) -> &BigUint {
        &self.scalar
    }

    pub fn public_key(&self) -> EcPublicKey {
        EcPublicKey {
            point: scalar_mul(&self.scalar, &self.curve.generator()),
        }
    }
}

impl fmt::Debug for EcPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcPrivateKey")
            .field("curve", &self.curve)
            .field("scalar", &"[REDACTED]")
            .finish()
    }
}

/// Public point; never the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcPublicKey {
    point: Point,
}

impl EcPublicKey {
    pub fn from_point(point: Point) -> CryptoResult<Self> {
        if point.is_infinity() || !point.is_on_curve() {
            return Err(CryptoError::InvalidFormat(
                "public key must be a finite curve point".to_string(),
            ));
        }
        Ok(Self { point })
    }

    pub fn from_sec1_bytes(curve: Curve, bytes: &[u8]) -> CryptoResult<Self> {
        Self::from_point(Point::from_sec1_bytes(curve, bytes)?)
    }

    pub fn from_hex(curve: Curve, hex_str: &str) -> CryptoResult<Self> {
        Self::from_point(Point::from_sec1_hex(curve, hex_str)?)
    }

    pub fn to_sec1_bytes(&self) -> CryptoResult<Vec<u8>> {
        self.point.to_sec1_bytes()
    }

    pub fn to_hex(&self) -> CryptoResult<String> {
        self.point.to_sec1_hex()
    }

    pub fn curve(&self) -> Curve {
        self.point.curve
    }

    pub fn point(&self) -> &Point {
        &self.point
    }
}

/// Key pair on a curve.
#[derive(Debug, Clone)]
pub struct EcKeyPair {
    pub private: EcPrivateKey,
    pub public: EcPublicKey,
}

impl EcKeyPair {
    pub fn generate<R: RngCore + CryptoRng>(curve: Curve, rng: &mut R) -> Self {
        let private = EcPrivateKey::generate(curve, rng);
        let public = private.public_key();
        Self { private, public }
    }
}

/// ECDH output: the x-coordinate of the shared point. Zeroized on drop.
pub struct SharedSecret(Zeroizing<[u8; FIELD_BYTES]>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; FIELD_BYTES] {
        &self.0
    }

    /// Fixed-width lowercase hex.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(*self.0))
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// Elliptic-curve Diffie-Hellman.
pub fn ecdh(private: &EcPrivateKey, public: &EcPublicKey) -> CryptoResult<SharedSecret> {
    if private.curve != public.curve() {
        return Err(CryptoError::InvalidFormat(format!(
            "curve mismatch: private key on {}, public key on {}",
            private.curve,
            public.curve()
        )));
    }
    let shared = scalar_mul(&private.scalar, &public.point);
    let x = shared.x().ok_or_else(|| {
        CryptoError::InvalidParameters("shared point is the point at infinity".to_string())
    })?;
    Ok(SharedSecret(Zeroizing::new(to_fixed_bytes(x))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SECP256K1_2G_X: &str = "c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
    const SECP256K1_3G_X: &str = "f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";
    const P256_2G_X: &str = "7cf27b188d034f7e8a52380304b51ac3c08969e277f21b35a60b48fc47669978";
    const P256_3G_X: &str = "5ecbe4d1a6330a44c8f7ef951d4bf165e6c6b721efada985fb41661bc6e7fd6c";

    fn x_hex(point: &Point) -> String {
        hex::encode(to_fixed_bytes(point.x().unwrap()))
    }

    #[test]
    fn test_generators_on_curve() {
        for curve in [Curve::Secp256k1, Curve::P256] {
            assert!(curve.generator().is_on_curve(), "{}", curve);
        }
    }

    #[test]
    fn test_known_multiples() {
        let g = Curve::Secp256k1.generator();
        assert_eq!(x_hex(&g.double()), SECP256K1_2G_X);
        assert_eq!(x_hex(&scalar_mul(&BigUint::from(2u32), &g)), SECP256K1_2G_X);
        assert_eq!(x_hex(&scalar_mul(&BigUint::from(3u32), &g)), SECP256K1_3G_X);

        let g = Curve::P256.generator();
        assert_eq!(x_hex(&g.double()), P256_2G_X);
        assert_eq!(x_hex(&scalar_mul(&BigUint::from(3u32), &g)), P256_3G_X);
    }

    #[test]
    fn test_add_matches_double() {
        for curve in [Curve::Secp256k1, Curve::P256] {
            let g = curve.generator();
            let three = g.double().add(&g).unwrap();
            assert_eq!(three, scalar_mul(&BigUint::from(3u32), &g));
            assert!(three.is_on_curve());
        }
    }

    #[test]
    fn test_order_annihilates_generator() {
        for curve in [Curve::Secp256k1, Curve::P256] {
            let g = curve.generator();
            assert!(scalar_mul(curve.order(), &g).is_infinity());
            let n_minus_1 = curve.order() - 1u32;
            assert_eq!(scalar_mul(&n_minus_1, &g), g.negate());
        }
    }

    #[test]
    fn test_inverse_points_sum_to_infinity() {
        let g = Curve::P256.generator();
        assert!(g.add(&g.negate()).unwrap().is_infinity());
        assert_eq!(g.add(&Point::infinity(Curve::P256)).unwrap(), g);
        assert!(scalar_mul(&BigUint::zero(), &g).is_infinity());
    }

    #[test]
    fn test_add_rejects_curve_mismatch() {
        let result = Curve::P256.generator().add(&Curve::Secp256k1.generator());
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_sec1_roundtrip_and_compression() {
        let mut rng = StdRng::seed_from_u64(42);
        for curve in [Curve::Secp256k1, Curve::P256] {
            let kp = EcKeyPair::generate(curve, &mut rng);
            let hex_str = kp.public.to_hex().unwrap();
            assert_eq!(hex_str.len(), 130);
            assert!(hex_str.starts_with("04"));
            assert_eq!(EcPublicKey::from_hex(curve, &hex_str).unwrap(), kp.public);

            let compressed = kp.public.point().to_sec1_compressed().unwrap();
            assert_eq!(
                EcPublicKey::from_sec1_bytes(curve, &compressed).unwrap(),
                kp.public
            );
        }
    }

    #[test]
    fn test_sec1_rejects_off_curve_point() {
        let mut bytes = Curve::Secp256k1.generator().to_sec1_bytes().unwrap();
        bytes[64] ^= 0x01;
        let result = Point::from_sec1_bytes(Curve::Secp256k1, &bytes);
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_sec1_rejects_wrong_length() {
        let result = Point::from_sec1_bytes(Curve::P256, &[0x04; 10]);
        assert!(matches!(result, Err(CryptoError::InvalidFormat(_))));
    }

    #[test]
    fn test_private_key_hex_fixed_width() {
        let key = EcPrivateKey::from_scalar(Curve::P256, BigUint::from(1u32)).unwrap();
        let hex_str = key.to_hex();
        assert_eq!(hex_str.len(), 64);
        assert!(hex_str.starts_with("0000"));
        assert_eq!(key.public_key().point(), &Curve::P256.generator());
        let parsed = EcPrivateKey::from_hex(Curve::P256, &hex_str).unwrap();
        assert_eq!(parsed.scalar(), key.scalar());
    }

    #[test]
    fn test_private_key_range() {
        assert!(EcPrivateKey::from_scalar(Curve::Secp256k1, BigUint::zero()).is_err());
        assert!(
            EcPrivateKey::from_scalar(Curve::Secp256k1, Curve::Secp256k1.order().clone()).is_err()
        );
    }

    #[test]
    fn test_ecdh_symmetry() {
        let mut rng = StdRng::seed_from_u64(7);
        for curve in [Curve::Secp256k1, Curve::P256] {
            let alice = EcKeyPair::generate(curve, &mut rng);
            let bob = EcKeyPair::generate(curve, &mut rng);
            let ab = ecdh(&alice.private, &bob.public).unwrap();
            let ba = ecdh(&bob.private, &alice.public).unwrap();
            assert_eq!(ab.as_bytes(), ba.as_bytes());
            assert_eq!(ab.to_hex().len(), 64);
        }
    }

    #[test]
    fn test_ecdh_curve_mismatch() {
        let mut rng = StdRng::seed_from_u64(8);
        let a = EcKeyPair::generate(Curve::Secp256k1, &mut rng);
        let b = EcKeyPair::generate(Curve::P256, &mut rng);
        assert!(matches!(
            ecdh(&a.private, &b.public),
            Err(CryptoError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut rng = StdRng::seed_from_u64(9);
        let kp = EcKeyPair::generate(Curve::P256, &mut rng);
        let debug = format!("{:?}", kp.private);
        assert!(debug.contains("REDACTED"));
        let secret = ecdh(&kp.private, &kp.public).unwrap();
        assert!(!format!("{:?}", secret).contains(&secret.to_hex()[..8]));
    }

    #[test]
    fn test_curve_parse() {
        assert_eq!("secp256k1".parse::<Curve>().unwrap(), Curve::Secp256k1);
        assert_eq!("P-256".parse::<Curve>().unwrap(), Curve::P256);
        assert_eq!("prime256v1".parse::<Curve>().unwrap(), Curve::P256);
        assert!(matches!(
            "ed25519".parse::<Curve>(),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }
}
