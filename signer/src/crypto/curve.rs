//! # secp256k1 Curve Engine
//!
//! Affine point arithmetic on `y^2 = x^3 + 7` over `F_p`: doubling, addition
//! and double-and-add scalar multiplication, plus the one piece of public
//! identity the device ever exposes: the Ethereum address of a point.
//!
//! Every operation that divides calls [`mod_inverse`], so the formulas are
//! slow compared to Jacobian coordinates. The device signs one message at a
//! time behind a PIN prompt.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use super::field::{add_mod, mod_inverse, mul_mod, sub_mod, FieldError};
use super::hash::keccak256;
use crate::config::{ADDRESS_LENGTH, GX, GY, N, P, SCALAR_LENGTH, SECP256K1_B};

/// A point on secp256k1, or the point at infinity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurvePoint {
    /// The group identity.
    Infinity,
    /// A finite point. Invariant: satisfies the curve equation.
    Affine { x: BigUint, y: BigUint },
}

impl CurvePoint {
    /// The generator `G`.
    pub fn generator() -> Self {
        CurvePoint::Affine {
            x: GX.clone(),
            y: GY.clone(),
        }
    }

    /// Build a finite point without checking the curve equation.
    pub fn new(x: BigUint, y: BigUint) -> Self {
        CurvePoint::Affine { x, y }
    }

    pub fn is_infinity(&self) -> bool {
        matches!(self, CurvePoint::Infinity)
    }

    /// The affine coordinates, or `None` at infinity.
    pub fn coordinates(&self) -> Option<(&BigUint, &BigUint)> {
        match self {
            CurvePoint::Infinity => None,
            CurvePoint::Affine { x, y } => Some((x, y)),
        }
    }

    /// `y^2 ≡ x^3 + 7 (mod p)`. Infinity counts as on the curve.
    pub fn is_on_curve(&self) -> bool {
        match self {
            CurvePoint::Infinity => true,
            CurvePoint::Affine { x, y } => {
                let p = &*P;
                if x >= p || y >= p {
                    return false;
                }
                let lhs = mul_mod(y, y, p);
                let rhs = add_mod(&mul_mod(&mul_mod(x, x, p), x, p), &BigUint::from(SECP256K1_B), p);
                lhs == rhs
            }
        }
    }

    /// `-P = (x, p - y)`.
    pub fn negate(&self) -> Self {
        match self {
            CurvePoint::Infinity => CurvePoint::Infinity,
            CurvePoint::Affine { x, y } => CurvePoint::Affine {
                x: x.clone(),
                y: sub_mod(&BigUint::zero(), y, &P),
            },
        }
    }
}

/// `2P`. Returns infinity when `y = 0` (the tangent is vertical).
pub fn point_double(point: &CurvePoint) -> Result<CurvePoint, FieldError> {
    let (px, py) = match point {
        CurvePoint::Infinity => return Ok(CurvePoint::Infinity),
        CurvePoint::Affine { x, y } => (x, y),
    };
    if py.is_zero() {
        return Ok(CurvePoint::Infinity);
    }
    let p = &*P;

    // slope = 3x^2 / 2y
    let three_x_squared = mul_mod(&mul_mod(px, px, p), &BigUint::from(3u32), p);
    let two_y = mul_mod(py, &BigUint::from(2u32), p);
    let slope = mul_mod(&three_x_squared, &mod_inverse(&two_y, p)?, p);

    let rx = sub_mod(&mul_mod(&slope, &slope, p), &mul_mod(px, &BigUint::from(2u32), p), p);
    let ry = sub_mod(&mul_mod(&slope, &sub_mod(px, &rx, p), p), py, p);

    Ok(CurvePoint::Affine { x: rx, y: ry })
}

/// `P + Q`, handling the identity, `P = -Q` and `P = Q`.
pub fn point_add(lhs: &CurvePoint, rhs: &CurvePoint) -> Result<CurvePoint, FieldError> {
    let ((px, py), (qx, qy)) = match (lhs, rhs) {
        (CurvePoint::Infinity, _) => return Ok(rhs.clone()),
        (_, CurvePoint::Infinity) => return Ok(lhs.clone()),
        (CurvePoint::Affine { x: px, y: py }, CurvePoint::Affine { x: qx, y: qy }) => {
            ((px, py), (qx, qy))
        }
    };

    if px == qx {
        return if py == qy {
            point_double(lhs)
        } else {
            Ok(CurvePoint::Infinity)
        };
    }

    let p = &*P;
    let slope = mul_mod(&sub_mod(qy, py, p), &mod_inverse(&sub_mod(qx, px, p), p)?, p);

    let rx = sub_mod(&sub_mod(&mul_mod(&slope, &slope, p), px, p), qx, p);
    let ry = sub_mod(&mul_mod(&slope, &sub_mod(px, &rx, p), p), py, p);

    Ok(CurvePoint::Affine { x: rx, y: ry })
}

/// `k·P` by double-and-add from the least significant bit.
///
/// `k` is reduced mod `n` first; `k ≡ 0` yields infinity. Not constant-time.
pub fn scalar_mult(k: &BigUint, point: &CurvePoint) -> Result<CurvePoint, FieldError> {
    let mut k = k % &*N;
    if k.is_zero() || point.is_infinity() {
        return Ok(CurvePoint::Infinity);
    }
    if k.is_one() {
        return Ok(point.clone());
    }

    let mut result = CurvePoint::Infinity;
    let mut addend = point.clone();

    while !k.is_zero() {
        if k.bit(0) {
            result = point_add(&result, &addend)?;
        }
        k >>= 1u32;
        // The final doubling would be thrown away.
        if !k.is_zero() {
            addend = point_double(&addend)?;
        }
    }

    Ok(result)
}

/// `k·G`, the public key for private scalar `k`.
pub fn public_key_for(private_key: &BigUint) -> Result<CurvePoint, FieldError> {
    scalar_mult(private_key, &CurvePoint::generator())
}

/// Big-endian, left-padded to `SCALAR_LENGTH` bytes.
///
/// Values wider than 32 bytes keep their low 32 bytes; callers only pass
/// reduced field elements and scalars.
pub fn to_be_bytes_32(value: &BigUint) -> [u8; SCALAR_LENGTH] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; SCALAR_LENGTH];
    if bytes.len() >= SCALAR_LENGTH {
        out.copy_from_slice(&bytes[bytes.len() - SCALAR_LENGTH..]);
    } else {
        out[SCALAR_LENGTH - bytes.len()..].copy_from_slice(&bytes);
    }
    out
}

/// Ethereum address for a public key: `0x` + hex of the last 20 bytes of
/// `keccak256(x ‖ y)`, lowercase.
pub fn derive_ethereum_address(pub_x: &BigUint, pub_y: &BigUint) -> String {
    let mut encoded = [0u8; 2 * SCALAR_LENGTH];
    encoded[..SCALAR_LENGTH].copy_from_slice(&to_be_bytes_32(pub_x));
    encoded[SCALAR_LENGTH..].copy_from_slice(&to_be_bytes_32(pub_y));
    let digest = keccak256(&encoded);
    format!("0x{}", hex::encode(&digest[digest.len() - ADDRESS_LENGTH..]))
}
