//! # Field Arithmetic
//!
//! Modular reduction and inversion for the two moduli the curve code cares
//! about: the field prime `p` (coordinates) and the group order `n`
//! (scalars). Both are plain big-integer routines; the curve layer decides
//! which modulus applies.
//!
//! Intermediate values in the point formulas go negative (`s^2 - 2x`,
//! `x1 - x3`, ...), so [`reduce`] takes a signed integer and always returns
//! the true mathematical residue in `[0, m)`, never a truncated remainder.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};
use thiserror::Error;

/// Errors from modular arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldError {
    /// `gcd(a, m) != 1`; in particular `a ≡ 0 (mod m)`.
    #[error("modular inverse does not exist")]
    NoInverse,
}

/// `a mod m`, always in `[0, m)`, including for negative `a`.
pub fn reduce(a: &BigInt, m: &BigUint) -> BigUint {
    let modulus = BigInt::from_biguint(Sign::Plus, m.clone());
    let mut r = a % &modulus;
    if r.sign() == Sign::Minus {
        r += &modulus;
    }
    // r is now in [0, m) so the magnitude is the value.
    r.magnitude().clone()
}

/// `(a - b) mod m` for unsigned operands.
pub fn sub_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    let a = a % m;
    let b = b % m;
    if a >= b {
        a - b
    } else {
        m - (b - a)
    }
}

/// `(a * b) mod m`.
pub fn mul_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a * b) % m
}

/// `(a + b) mod m`.
pub fn add_mod(a: &BigUint, b: &BigUint, m: &BigUint) -> BigUint {
    (a + b) % m
}

/// Modular inverse via the iterative extended Euclidean algorithm.
///
/// Iterative on purpose: recursion depth on 256-bit inputs is small, but the
/// device stack is smaller.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint, FieldError> {
    let a = a % m;
    if a.is_zero() {
        return Err(FieldError::NoInverse);
    }

    let mut old_r = BigInt::from(a);
    let mut r = BigInt::from(m.clone());
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let quotient = &old_r / &r;

        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return Err(FieldError::NoInverse);
    }

    Ok(reduce(&old_s, m))
}

/// `base^exp mod m`.
pub fn pow_mod(base: &BigUint, exp: &BigUint, m: &BigUint) -> BigUint {
    base.modpow(exp, m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{N, P};

    fn big(v: i64) -> BigInt {
        BigInt::from(v)
    }

    fn ubig(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn test_reduce_positive() {
        assert_eq!(reduce(&big(17), &ubig(5)), ubig(2));
        assert_eq!(reduce(&big(5), &ubig(5)), ubig(0));
    }

    #[test]
    fn test_reduce_negative_is_mathematical_modulo() {
        // Truncating remainder would give -2 here. We want 3.
        assert_eq!(reduce(&big(-17), &ubig(5)), ubig(3));
        assert_eq!(reduce(&big(-5), &ubig(5)), ubig(0));
        assert_eq!(reduce(&big(-1), &P), &*P - 1u32);
    }

    #[test]
    fn test_sub_mod_wraps() {
        assert_eq!(sub_mod(&ubig(2), &ubig(5), &ubig(7)), ubig(4));
        assert_eq!(sub_mod(&ubig(5), &ubig(2), &ubig(7)), ubig(3));
        assert_eq!(sub_mod(&ubig(0), &ubig(0), &ubig(7)), ubig(0));
    }

    #[test]
    fn test_add_mod_wraps() {
        assert_eq!(add_mod(&ubig(5), &ubig(4), &ubig(7)), ubig(2));
        assert_eq!(add_mod(&(&*P - 1u32), &ubig(1), &P), ubig(0));
    }

    #[test]
    fn test_mod_inverse_small() {
        // 3 * 5 = 15 ≡ 1 (mod 7)
        assert_eq!(mod_inverse(&ubig(3), &ubig(7)).unwrap(), ubig(5));
    }

    #[test]
    fn test_mod_inverse_over_field_and_order() {
        for v in [1u64, 2, 7, 0xdead_beef, u64::MAX] {
            let a = ubig(v);
            let inv_p = mod_inverse(&a, &P).unwrap();
            assert_eq!(mul_mod(&a, &inv_p, &P), ubig(1));
            let inv_n = mod_inverse(&a, &N).unwrap();
            assert_eq!(mul_mod(&a, &inv_n, &N), ubig(1));
        }
    }

    #[test]
    fn test_mod_inverse_of_zero_fails() {
        assert_eq!(mod_inverse(&ubig(0), &P), Err(FieldError::NoInverse));
        // A multiple of the modulus is zero in disguise.
        assert_eq!(mod_inverse(&P, &P), Err(FieldError::NoInverse));
    }

    #[test]
    fn test_mod_inverse_non_coprime_fails() {
        assert_eq!(mod_inverse(&ubig(4), &ubig(8)), Err(FieldError::NoInverse));
    }

    #[test]
    fn test_pow_mod_matches_fermat_inverse() {
        let a = ubig(123_456_789);
        let exp = &*P - 2u32;
        assert_eq!(pow_mod(&a, &exp, &P), mod_inverse(&a, &P).unwrap());
    }
}
