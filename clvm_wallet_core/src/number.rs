//! Arbitrary precision integers with canonical CLVM byte encoding
//!
//! Atoms are read as big-endian two's complement. The canonical form is the
//! shortest such encoding; zero is the empty atom.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::types::ClvmError;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Number(BigInt);

/// Mask isolating the most significant set bit of `byte`
pub fn msb_mask(byte: u8) -> u8 {
    let mut b = byte;
    b |= b >> 1;
    b |= b >> 2;
    b |= b >> 4;
    // b is now all ones below and including the top bit
    b ^ (b >> 1)
}

impl Number {
    pub fn zero() -> Self {
        Number(BigInt::zero())
    }

    /// Read canonical (or non-canonical) signed big-endian bytes
    pub fn from_signed_bytes(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::zero();
        }
        Number(BigInt::from_signed_bytes_be(bytes))
    }

    /// Read `bytes` as an unsigned magnitude, applying the sign separately
    pub fn from_magnitude(bytes: &[u8], negative: bool) -> Self {
        let sign = if negative { Sign::Minus } else { Sign::Plus };
        Number(BigInt::from_bytes_be(sign, bytes))
    }

    pub fn from_unsigned_bytes(bytes: &[u8]) -> Self {
        Self::from_magnitude(bytes, false)
    }

    /// Canonical encoding: minimal two's complement, zero as empty
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.0.is_zero() {
            return Vec::new();
        }
        let mut bytes = self.0.to_signed_bytes_be();
        trim_redundant_sign_bytes(&mut bytes);
        bytes
    }

    /// Big-endian magnitude of a non-negative value, left padded to `width`
    pub fn to_unsigned_padded(&self, width: usize) -> Result<Vec<u8>, ClvmError> {
        if self.is_negative() {
            return Err(ClvmError::RangeError(format!(
                "{} has no unsigned encoding",
                self
            )));
        }
        let (_, magnitude) = self.0.to_bytes_be();
        let magnitude = if self.is_zero() { Vec::new() } else { magnitude };
        if magnitude.len() > width {
            return Err(ClvmError::RangeError(format!(
                "{} does not fit in {} bytes",
                self, width
            )));
        }
        let mut out = vec![0u8; width - magnitude.len()];
        out.extend_from_slice(&magnitude);
        Ok(out)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn into_bigint(self) -> BigInt {
        self.0
    }

    pub fn to_i64(&self) -> Result<i64, ClvmError> {
        self.0.to_i64().ok_or_else(|| self.range_error("i64"))
    }

    pub fn to_u64(&self) -> Result<u64, ClvmError> {
        self.0.to_u64().ok_or_else(|| self.range_error("u64"))
    }

    pub fn to_u32(&self) -> Result<u32, ClvmError> {
        self.0.to_u32().ok_or_else(|| self.range_error("u32"))
    }

    pub fn to_i32(&self) -> Result<i32, ClvmError> {
        self.0.to_i32().ok_or_else(|| self.range_error("i32"))
    }

    pub fn to_u8(&self) -> Result<u8, ClvmError> {
        self.0.to_u8().ok_or_else(|| self.range_error("u8"))
    }

    pub fn to_usize(&self) -> Result<usize, ClvmError> {
        self.0.to_usize().ok_or_else(|| self.range_error("usize"))
    }

    fn range_error(&self, width: &str) -> ClvmError {
        ClvmError::RangeError(format!("{} does not fit in {}", self, width))
    }

    /// Truncating division, rounds toward zero
    pub fn checked_div(&self, other: &Number) -> Result<Number, ClvmError> {
        self.ensure_divisor(other)?;
        Ok(Number(&self.0 / &other.0))
    }

    /// Remainder of truncating division, takes the sign of the dividend
    pub fn checked_rem(&self, other: &Number) -> Result<Number, ClvmError> {
        self.ensure_divisor(other)?;
        Ok(Number(&self.0 % &other.0))
    }

    /// Floor division, rounds toward negative infinity
    pub fn div_floor(&self, other: &Number) -> Result<Number, ClvmError> {
        self.ensure_divisor(other)?;
        Ok(Number(self.0.div_floor(&other.0)))
    }

    /// Floor modulo, takes the sign of the divisor
    pub fn mod_floor(&self, other: &Number) -> Result<Number, ClvmError> {
        self.ensure_divisor(other)?;
        Ok(Number(self.0.mod_floor(&other.0)))
    }

    /// Reduce into `[0, modulus)`
    pub fn modulo(&self, modulus: &Number) -> Result<Number, ClvmError> {
        if !modulus.0.is_positive() {
            return Err(ClvmError::RangeError(format!(
                "modulus must be positive, got {}",
                modulus
            )));
        }
        Ok(Number(self.0.mod_floor(&modulus.0)))
    }

    fn ensure_divisor(&self, other: &Number) -> Result<(), ClvmError> {
        if other.is_zero() {
            return Err(ClvmError::RangeError("division by zero".to_string()));
        }
        Ok(())
    }

    /// Arithmetic shift; negative `shift` shifts right rounding toward -inf
    pub fn shift(&self, shift: i32) -> Number {
        if shift >= 0 {
            Number(&self.0 << shift as usize)
        } else {
            Number(&self.0 >> shift.unsigned_abs() as usize)
        }
    }

    pub fn bitand(&self, other: &Number) -> Number {
        Number(&self.0 & &other.0)
    }

    pub fn bitor(&self, other: &Number) -> Number {
        Number(&self.0 | &other.0)
    }

    pub fn bitxor(&self, other: &Number) -> Number {
        Number(&self.0 ^ &other.0)
    }

    pub fn not(&self) -> Number {
        Number(!&self.0)
    }
}

// BigInt is already minimal; kept so hand-built buffers normalise too
fn trim_redundant_sign_bytes(bytes: &mut Vec<u8>) {
    let mut start = 0;
    while start + 1 < bytes.len() {
        let (lead, next) = (bytes[start], bytes[start + 1]);
        let redundant = (lead == 0x00 && msb_mask(next) != 0x80)
            || (lead == 0xff && msb_mask(next) == 0x80);
        if !redundant {
            break;
        }
        start += 1;
    }
    if start > 0 {
        bytes.drain(..start);
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(value: $t) -> Self {
                    Number(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_primitive!(i8, u8, i32, u32, i64, u64, i128, u128, usize);

impl From<BigInt> for Number {
    fn from(value: BigInt) -> Self {
        Number(value)
    }
}

impl From<BigUint> for Number {
    fn from(value: BigUint) -> Self {
        Number(BigInt::from(value))
    }
}

impl std::ops::Add for &Number {
    type Output = Number;
    fn add(self, rhs: &Number) -> Number {
        Number(&self.0 + &rhs.0)
    }
}

impl std::ops::Sub for &Number {
    type Output = Number;
    fn sub(self, rhs: &Number) -> Number {
        Number(&self.0 - &rhs.0)
    }
}

impl std::ops::Mul for &Number {
    type Output = Number;
    fn mul(self, rhs: &Number) -> Number {
        Number(&self.0 * &rhs.0)
    }
}

impl std::ops::Neg for &Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number(-&self.0)
    }
}

impl FromStr for Number {
    type Err = ClvmError;

    /// Decimal with optional sign
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s)
            .map(Number)
            .map_err(|_| ClvmError::RangeError(format!("invalid decimal integer: {}", s)))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
