// Copyright (c) 2026 Amunchain
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Arbitrary-precision token amounts (`Int`) and 18-digit fixed-point decimals (`Dec`).
//!
//! Both are non-negative. Arithmetic that would underflow or overflow panics: on the
//! state machine path such a condition is an internal inconsistency, not a user error.
//! Binary encodings carry trimmed big-endian bytes; human-readable encodings carry
//! decimal strings.

use alloy_primitives::{Uint, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

type U512 = Uint<512, 8>;
type U768 = Uint<768, 12>;

/// Number of fractional digits carried by `Dec`.
pub const DEC_PRECISION: u32 = 18;

const PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
const PRECISION_512: U512 = U512::from_limbs([1_000_000_000_000_000_000, 0, 0, 0, 0, 0, 0, 0]);
const PRECISION_768: U768 =
    U768::from_limbs([1_000_000_000_000_000_000, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
const TEN: U256 = U256::from_limbs([10, 0, 0, 0]);

/// Parse errors for numeric strings and byte encodings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("invalid integer: {0}")]
    InvalidInt(String),
    #[error("invalid decimal: {0}")]
    InvalidDec(String),
    #[error("too many fractional digits (max {DEC_PRECISION})")]
    TooPrecise,
    #[error("value out of range")]
    OutOfRange,
}

fn widen(v: U256) -> U512 {
    let l = v.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

fn widen_768(v: U256) -> U768 {
    let l = v.as_limbs();
    U768::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0, 0, 0, 0, 0])
}

fn narrow<const BITS: usize, const LIMBS: usize>(v: Uint<BITS, LIMBS>) -> Option<U256> {
    let l = v.as_limbs();
    if l[4..].iter().any(|x| *x != 0) {
        return None;
    }
    Some(U256::from_limbs([l[0], l[1], l[2], l[3]]))
}

fn narrow_or_panic(v: U512, what: &str) -> U256 {
    match narrow(v) {
        Some(x) => x,
        None => panic!("{what} overflow"),
    }
}

fn div_half_even<const BITS: usize, const LIMBS: usize>(
    num: Uint<BITS, LIMBS>,
    den: Uint<BITS, LIMBS>,
) -> Uint<BITS, LIMBS> {
    let q = num / den;
    let r = num % den;
    let odd = q.as_limbs()[0] & 1 == 1;
    match (r + r).cmp(&den) {
        Ordering::Less => q,
        Ordering::Greater => q + Uint::from(1u64),
        Ordering::Equal if odd => q + Uint::from(1u64),
        Ordering::Equal => q,
    }
}

fn div_ceil<const BITS: usize, const LIMBS: usize>(
    num: Uint<BITS, LIMBS>,
    den: Uint<BITS, LIMBS>,
) -> Uint<BITS, LIMBS> {
    let q = num / den;
    if (num % den).is_zero() {
        q
    } else {
        q + Uint::from(1u64)
    }
}

fn to_be_trimmed(v: &U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    for limb in v.as_limbs().iter().rev() {
        out.extend_from_slice(&limb.to_be_bytes());
    }
    let first = out.iter().position(|b| *b != 0).unwrap_or(out.len());
    out.split_off(first)
}

fn from_be(bytes: &[u8]) -> Result<U256, MathError> {
    if bytes.len() > 32 {
        return Err(MathError::OutOfRange);
    }
    let mut buf = [0u8; 32];
    buf[32 - bytes.len()..].copy_from_slice(bytes);
    let mut limbs = [0u64; 4];
    for (i, chunk) in buf.chunks_exact(8).enumerate() {
        let mut w = [0u8; 8];
        w.copy_from_slice(chunk);
        limbs[3 - i] = u64::from_be_bytes(w);
    }
    Ok(U256::from_limbs(limbs))
}

fn parse_digits(s: &str) -> Option<U256> {
    if s.is_empty() {
        return None;
    }
    let mut v = U256::ZERO;
    for c in s.chars() {
        let d = c.to_digit(10)?;
        v = v
            .checked_mul(TEN)?
            .checked_add(U256::from_limbs([u64::from(d), 0, 0, 0]))?;
    }
    Some(v)
}

/// Non-negative arbitrary-precision integer (256-bit).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Int(U256);

impl Int {
    /// Zero.
    pub const ZERO: Int = Int(U256::ZERO);

    /// Zero.
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// From a u64.
    pub const fn from_u64(v: u64) -> Self {
        Int(U256::from_limbs([v, 0, 0, 0]))
    }

    /// From a u128.
    pub const fn from_u128(v: u128) -> Self {
        Int(U256::from_limbs([v as u64, (v >> 64) as u64, 0, 0]))
    }

    /// True if zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Underlying 256-bit value.
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Checked addition.
    pub fn checked_add(self, o: Int) -> Option<Int> {
        self.0.checked_add(o.0).map(Int)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, o: Int) -> Option<Int> {
        self.0.checked_sub(o.0).map(Int)
    }

    /// Checked multiplication.
    pub fn checked_mul(self, o: Int) -> Option<Int> {
        self.0.checked_mul(o.0).map(Int)
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, o: Int) -> Int {
        self.checked_sub(o).unwrap_or(Int::ZERO)
    }

    /// Value as u64 if it fits.
    pub fn to_u64(&self) -> Option<u64> {
        let l = self.0.as_limbs();
        if l[1] != 0 || l[2] != 0 || l[3] != 0 {
            return None;
        }
        Some(l[0])
    }

    /// Value as i64, saturating at `i64::MAX`.
    pub fn to_i64_saturating(&self) -> i64 {
        match self.to_u64() {
            Some(v) if v <= i64::MAX as u64 => v as i64,
            _ => i64::MAX,
        }
    }

    /// Trimmed big-endian bytes.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        to_be_trimmed(&self.0)
    }

    /// Parse big-endian bytes (at most 32).
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, MathError> {
        from_be(bytes).map(Int)
    }
}

impl From<u64> for Int {
    fn from(v: u64) -> Self {
        Int::from_u64(v)
    }
}

impl From<u128> for Int {
    fn from(v: u128) -> Self {
        Int::from_u128(v)
    }
}

impl Add for Int {
    type Output = Int;
    fn add(self, o: Int) -> Int {
        match self.checked_add(o) {
            Some(v) => v,
            None => panic!("Int overflow"),
        }
    }
}

impl Sub for Int {
    type Output = Int;
    fn sub(self, o: Int) -> Int {
        match self.checked_sub(o) {
            Some(v) => v,
            None => panic!("Int underflow: {self} - {o}"),
        }
    }
}

impl Mul for Int {
    type Output = Int;
    fn mul(self, o: Int) -> Int {
        match self.checked_mul(o) {
            Some(v) => v,
            None => panic!("Int overflow"),
        }
    }
}

impl Div for Int {
    type Output = Int;
    fn div(self, o: Int) -> Int {
        if o.is_zero() {
            panic!("Int division by zero");
        }
        Int(self.0 / o.0)
    }
}

impl AddAssign for Int {
    fn add_assign(&mut self, o: Int) {
        *self = *self + o;
    }
}

impl SubAssign for Int {
    fn sub_assign(&mut self, o: Int) {
        *self = *self - o;
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Int {
    type Err = MathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_digits(s)
            .map(Int)
            .ok_or_else(|| MathError::InvalidInt(s.to_string()))
    }
}

/// Non-negative fixed-point decimal with 18 fractional digits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

impl Dec {
    /// Zero.
    pub const ZERO: Dec = Dec(U256::ZERO);
    /// One.
    pub const ONE: Dec = Dec(PRECISION);

    /// Zero.
    pub fn zero() -> Self {
        Self::ZERO
    }

    /// One.
    pub fn one() -> Self {
        Self::ONE
    }

    /// Whole-number decimal.
    pub fn from_u64(v: u64) -> Self {
        Dec::from_int(Int::from_u64(v))
    }

    /// Whole-number decimal from an `Int`.
    pub fn from_int(v: Int) -> Self {
        match v.0.checked_mul(PRECISION) {
            Some(m) => Dec(m),
            None => panic!("Dec overflow"),
        }
    }

    /// `v * 10^-prec`, e.g. `with_prec(75, 2)` is 0.75.
    pub fn with_prec(v: u64, prec: u32) -> Self {
        assert!(prec <= DEC_PRECISION, "precision too large");
        let scale = U256::from_limbs([10u64.pow(DEC_PRECISION - prec), 0, 0, 0]);
        Dec(U256::from_limbs([v, 0, 0, 0]) * scale)
    }

    /// Percentage, e.g. `percent(5)` is 0.05.
    pub fn percent(v: u64) -> Self {
        Dec::with_prec(v, 2)
    }

    /// True if zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked subtraction.
    pub fn checked_sub(self, o: Dec) -> Option<Dec> {
        self.0.checked_sub(o.0).map(Dec)
    }

    /// |self - o|.
    pub fn abs_diff(self, o: Dec) -> Dec {
        if self >= o {
            self - o
        } else {
            o - self
        }
    }

    /// Product rounded half-to-even at the 18th digit.
    pub fn mul(self, o: Dec) -> Dec {
        let p = widen(self.0) * widen(o.0);
        Dec(narrow_or_panic(div_half_even(p, PRECISION_512), "Dec"))
    }

    /// Product truncated at the 18th digit.
    pub fn mul_truncate(self, o: Dec) -> Dec {
        let p = widen(self.0) * widen(o.0);
        Dec(narrow_or_panic(p / PRECISION_512, "Dec"))
    }

    /// Product with an integer; exact.
    pub fn mul_int(self, i: Int) -> Dec {
        let p = widen(self.0) * widen(i.0);
        Dec(narrow_or_panic(p, "Dec"))
    }

    /// Quotient rounded half-to-even at the 18th digit.
    pub fn quo(self, o: Dec) -> Dec {
        assert!(!o.is_zero(), "Dec division by zero");
        let n = widen(self.0) * PRECISION_512;
        Dec(narrow_or_panic(div_half_even(n, widen(o.0)), "Dec"))
    }

    /// Quotient truncated at the 18th digit.
    pub fn quo_truncate(self, o: Dec) -> Dec {
        assert!(!o.is_zero(), "Dec division by zero");
        let n = widen(self.0) * PRECISION_512;
        Dec(narrow_or_panic(n / widen(o.0), "Dec"))
    }

    /// Quotient rounded up at the 18th digit.
    pub fn quo_round_up(self, o: Dec) -> Dec {
        assert!(!o.is_zero(), "Dec division by zero");
        let n = widen(self.0) * PRECISION_512;
        Dec(narrow_or_panic(div_ceil(n, widen(o.0)), "Dec"))
    }

    /// `self * i / d` rounded half-to-even, with no intermediate rounding.
    /// `None` if the result does not fit.
    pub fn checked_mul_int_quo(self, i: Int, d: Dec) -> Option<Dec> {
        assert!(!d.is_zero(), "Dec division by zero");
        let n = widen_768(self.0) * widen_768(i.0) * PRECISION_768;
        narrow(div_half_even(n, widen_768(d.0))).map(Dec)
    }

    /// `self * i / d` truncated at the 18th digit. `None` if the result does not fit.
    pub fn checked_mul_int_quo_truncate(self, i: Int, d: Dec) -> Option<Dec> {
        assert!(!d.is_zero(), "Dec division by zero");
        let n = widen_768(self.0) * widen_768(i.0) * PRECISION_768;
        narrow(n / widen_768(d.0)).map(Dec)
    }

    /// `self * i / j` truncated at the 18th digit. `None` if the result does not fit.
    pub fn checked_mul_int_quo_int(self, i: Int, j: Int) -> Option<Dec> {
        assert!(!j.is_zero(), "Dec division by zero");
        narrow((widen(self.0) * widen(i.0)) / widen(j.0)).map(Dec)
    }

    /// Quotient by an integer, truncated.
    pub fn quo_int(self, i: Int) -> Dec {
        assert!(!i.is_zero(), "Dec division by zero");
        Dec(self.0 / i.0)
    }

    /// Integer part.
    pub fn truncate_int(&self) -> Int {
        Int(self.0 / PRECISION)
    }

    /// Nearest integer, ties to even.
    pub fn round_int(&self) -> Int {
        Int(narrow_or_panic(
            div_half_even(widen(self.0), PRECISION_512),
            "Dec",
        ))
    }

    /// Scaled mantissa bytes, trimmed big-endian.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        to_be_trimmed(&self.0)
    }

    /// Parse scaled mantissa bytes.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, MathError> {
        from_be(bytes).map(Dec)
    }
}

impl Add for Dec {
    type Output = Dec;
    fn add(self, o: Dec) -> Dec {
        match self.0.checked_add(o.0) {
            Some(v) => Dec(v),
            None => panic!("Dec overflow"),
        }
    }
}

impl Sub for Dec {
    type Output = Dec;
    fn sub(self, o: Dec) -> Dec {
        match self.checked_sub(o) {
            Some(v) => v,
            None => panic!("Dec underflow: {self} - {o}"),
        }
    }
}

impl AddAssign for Dec {
    fn add_assign(&mut self, o: Dec) {
        *self = *self + o;
    }
}

impl SubAssign for Dec {
    fn sub_assign(&mut self, o: Dec) {
        *self = *self - o;
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / PRECISION;
        let frac = self.0 % PRECISION;
        write!(f, "{int}.{:0>18}", frac.to_string())
    }
}

impl FromStr for Dec {
    type Err = MathError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || MathError::InvalidDec(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => {
                if f.is_empty() {
                    return Err(bad());
                }
                (i, f)
            }
            None => (s, ""),
        };
        if frac_part.len() > DEC_PRECISION as usize {
            return Err(MathError::TooPrecise);
        }
        let int = parse_digits(int_part).ok_or_else(bad)?;
        let frac = if frac_part.is_empty() {
            U256::ZERO
        } else {
            let digits = format!("{frac_part:0<18}");
            parse_digits(&digits).ok_or_else(bad)?
        };
        let mantissa = int
            .checked_mul(PRECISION)
            .and_then(|m| m.checked_add(frac))
            .ok_or(MathError::OutOfRange)?;
        Ok(Dec(mantissa))
    }
}

macro_rules! impl_big_serde {
    ($ty:ident, $visitor:ident, $expecting:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                if s.is_human_readable() {
                    s.serialize_str(&self.to_string())
                } else {
                    s.serialize_bytes(&self.to_be_bytes())
                }
            }
        }

        struct $visitor;

        impl<'de> de::Visitor<'de> for $visitor {
            type Value = $ty;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($expecting)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<$ty, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<$ty, E> {
                $ty::from_be_bytes(v).map_err(E::custom)
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<$ty, E> {
                self.visit_bytes(&v)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<$ty, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<$ty, E> {
                if v < 0 {
                    return Err(E::custom("negative value"));
                }
                v.to_string().parse().map_err(E::custom)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                if d.is_human_readable() {
                    d.deserialize_any($visitor)
                } else {
                    d.deserialize_bytes($visitor)
                }
            }
        }
    };
}

impl_big_serde!(Int, IntVisitor, "a non-negative integer");
impl_big_serde!(Dec, DecVisitor, "a non-negative decimal");

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn dec_display_and_parse() {
        assert_eq!(d("0.75").to_string(), "0.750000000000000000");
        assert_eq!(d("12").to_string(), "12.000000000000000000");
        assert_eq!(Dec::with_prec(75, 2), d("0.75"));
        assert!("1.".parse::<Dec>().is_err());
        assert!("-1".parse::<Dec>().is_err());
        assert_eq!(
            "0.0000000000000000001".parse::<Dec>(),
            Err(MathError::TooPrecise)
        );
    }

    #[test]
    fn dec_rounding_modes() {
        // 2/3
        let two = Dec::from_u64(2);
        let three = Dec::from_u64(3);
        assert_eq!(two.quo(three), d("0.666666666666666667"));
        assert_eq!(two.quo_truncate(three), d("0.666666666666666666"));
        assert_eq!(two.quo_round_up(three), d("0.666666666666666667"));
        assert_eq!(Dec::one().quo_round_up(three), d("0.333333333333333334"));

        // half-to-even on the last digit
        let tiny = d("0.000000000000000005");
        assert_eq!(tiny.mul(d("0.1")), Dec::zero());
        assert_eq!(d("0.000000000000000015").mul(d("0.1")), d("0.000000000000000002"));
    }

    #[test]
    fn share_math_matches_expected_integers() {
        let shares = Dec::from_u64(500);
        let tokens = Int::from_u64(1200);
        let total = Dec::from_u64(1500);
        assert_eq!(shares.mul_int(tokens).quo(total).truncate_int(), Int::from_u64(400));
        let per_share = Dec::from_u64(1000).mul_int(Int::from_u64(500));
        assert_eq!(per_share.quo_int(Int::from_u64(1000)), shares);
    }

    #[test]
    fn fused_share_math_keeps_large_balances_in_range() {
        let e30 = Int::from_u128(10u128.pow(30));
        let shares = Dec::from_int(Int::from_u128(5 * 10u128.pow(29)));
        let total = Dec::from_int(e30);
        assert_eq!(
            shares.checked_mul_int_quo(e30, total).unwrap().truncate_int(),
            Int::from_u128(5 * 10u128.pow(29))
        );
        assert_eq!(
            shares.checked_mul_int_quo_truncate(e30, total),
            shares.checked_mul_int_quo(e30, total)
        );
        assert_eq!(shares.checked_mul_int_quo_int(e30, e30), Some(shares));
    }

    #[test]
    fn fused_share_math_reports_overflow() {
        let huge = Int::from_be_bytes(&[0xff; 25]).unwrap();
        let shares = Dec::from_u64(1000);
        assert_eq!(shares.checked_mul_int_quo_int(huge, Int::from_u64(1)), None);
        assert_eq!(shares.checked_mul_int_quo(huge, Dec::from_u64(1)), None);
        assert!(shares.checked_mul_int_quo_int(huge, huge).is_some());
    }

    #[test]
    fn int_bytes_are_trimmed() {
        assert!(Int::zero().to_be_bytes().is_empty());
        assert_eq!(Int::from_u64(256).to_be_bytes(), vec![1, 0]);
        assert_eq!(Int::from_be_bytes(&[1, 0]).unwrap(), Int::from_u64(256));
        assert!(Int::from_be_bytes(&[1u8; 33]).is_err());
    }

    #[test]
    #[should_panic(expected = "underflow")]
    fn int_underflow_panics() {
        let _ = Int::from_u64(1) - Int::from_u64(2);
    }
}
