//! Arbitrary-precision integers and decimals.
//!
//! [`BigInt`] wraps [`num_bigint::BigInt`]. On the wire it travels as minimal
//! big-endian two's complement bytes (see [`BigInt::to_twos_complement`]).
//! [`Decimal`] is `mantissa * 10^exponent`, always normalized so that equal
//! decimals have equal representations.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::Sign;
use thiserror::Error;

/// Error type for number text parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NumberParseError {
    pub message: String,
}

impl NumberParseError {
    fn new(kind: &str, text: &str) -> Self {
        Self {
            message: format!("Invalid {}: {:?}", kind, text),
        }
    }
}

// =============================================================================
// BIGINT
// =============================================================================

/// Arbitrary-precision signed integer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BigInt(num_bigint::BigInt);

impl BigInt {
    /// Zero.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_i64(value: i64) -> Self {
        Self(value.into())
    }

    /// Returns the value as i64 if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        i64::try_from(&self.0).ok()
    }

    pub fn is_zero(&self) -> bool {
        self.0.sign() == Sign::NoSign
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    /// Returns the absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.magnitude().clone().into())
    }

    /// Returns `self * 10^power`.
    pub(crate) fn mul_pow10(&self, power: u32) -> Self {
        Self(&self.0 * num_bigint::BigInt::from(10u32).pow(power))
    }

    /// Returns `(self / 10, self % 10 == 0)` truncating toward zero.
    fn div10(&self) -> (Self, bool) {
        (Self(&self.0 / 10u32), (&self.0 % 10u32).sign() == Sign::NoSign)
    }

    /// Number of decimal digits in the magnitude (zero has one digit).
    pub(crate) fn digit_count(&self) -> usize {
        self.magnitude_string().len()
    }

    fn magnitude_string(&self) -> String {
        self.0.magnitude().to_string()
    }

    /// Minimal big-endian two's complement bytes.
    pub fn to_twos_complement(&self) -> Vec<u8> {
        self.0.to_signed_bytes_be()
    }

    /// Parses big-endian two's complement bytes. Empty input is zero.
    pub fn from_twos_complement(bytes: &[u8]) -> Self {
        Self(num_bigint::BigInt::from_signed_bytes_be(bytes))
    }

    /// Returns true if `bytes` is the minimal two's complement form.
    pub fn is_minimal_twos_complement(bytes: &[u8]) -> bool {
        match bytes {
            [] => false,
            [_] => true,
            [first, second, ..] => {
                !((*first == 0x00 && second & 0x80 == 0) || (*first == 0xFF && second & 0x80 != 0))
            }
        }
    }
}

impl From<i64> for BigInt {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<num_bigint::BigInt> for BigInt {
    fn from(value: num_bigint::BigInt) -> Self {
        Self(value)
    }
}

impl From<BigInt> for num_bigint::BigInt {
    fn from(value: BigInt) -> Self {
        value.0
    }
}

impl FromStr for BigInt {
    type Err = NumberParseError;

    /// Accepts an optional sign followed by ASCII decimal digits only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NumberParseError::new("integer", s));
        }
        let magnitude =
            num_bigint::BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| NumberParseError::new("integer", s))?;
        Ok(Self(if s.starts_with('-') { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// =============================================================================
// DECIMAL
// =============================================================================

/// Largest exponent distance rendered in plain notation before switching to
/// `<digits>E<exponent>` form.
const PLAIN_EXPONENT_LIMIT: i64 = 32;

/// Arbitrary-precision decimal: `mantissa * 10^exponent`.
///
/// Always normalized: a non-zero mantissa has no trailing zero digits and zero
/// has exponent 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: BigInt,
    exponent: i32,
}

impl Decimal {
    /// Creates a decimal, normalizing the representation.
    pub fn new(mantissa: BigInt, exponent: i32) -> Self {
        if mantissa.is_zero() {
            return Self::default();
        }
        let mut mantissa = mantissa;
        let mut exponent = exponent;
        while exponent < i32::MAX {
            let (quotient, exact) = mantissa.div10();
            if !exact {
                break;
            }
            mantissa = quotient;
            exponent += 1;
        }
        Self { mantissa, exponent }
    }

    pub fn from_i64(value: i64) -> Self {
        Self::new(BigInt::from_i64(value), 0)
    }

    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Returns true if (mantissa, exponent) is already in normalized form.
    pub fn is_normalized(mantissa: &BigInt, exponent: i32) -> bool {
        if mantissa.is_zero() {
            return exponent == 0;
        }
        !mantissa.div10().1
    }

    /// Position of the most significant digit relative to the decimal point.
    fn adjusted_exponent(&self) -> i64 {
        self.mantissa.digit_count() as i64 + self.exponent as i64
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl FromStr for Decimal {
    type Err = NumberParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, exp_part) = match s.find(['e', 'E']) {
            Some(i) => (&s[..i], Some(&s[i + 1..])),
            None => (s, None),
        };
        let (negative, body) = match body.as_bytes().first() {
            Some(b'-') => (true, &body[1..]),
            Some(b'+') => (false, &body[1..]),
            _ => (false, body),
        };
        let (int_part, frac_part) = match body.find('.') {
            Some(i) => (&body[..i], &body[i + 1..]),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(NumberParseError::new("decimal", s));
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(NumberParseError::new("decimal", s));
        }
        let exp: i64 = match exp_part {
            Some(e) => e.parse().map_err(|_| NumberParseError::new("decimal", s))?,
            None => 0,
        };
        let exponent = exp - frac_part.len() as i64;
        let exponent = i32::try_from(exponent).map_err(|_| NumberParseError::new("decimal", s))?;

        let digits = format!("{}{}{}", if negative { "-" } else { "" }, int_part, frac_part);
        let mantissa: BigInt = digits.parse()?;
        Ok(Self::new(mantissa, exponent))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        let digits = self.mantissa.magnitude_string();
        let exponent = self.exponent as i64;

        if exponent >= 0 {
            if exponent <= PLAIN_EXPONENT_LIMIT {
                return write!(f, "{}{}{}", sign, digits, "0".repeat(exponent as usize));
            }
            return write!(f, "{}{}E{}", sign, digits, exponent);
        }

        let frac_len = (-exponent) as usize;
        if frac_len < digits.len() {
            let (int_part, frac_part) = digits.split_at(digits.len() - frac_len);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        } else if (frac_len - digits.len()) as i64 <= PLAIN_EXPONENT_LIMIT {
            write!(f, "{}0.{}{}", sign, "0".repeat(frac_len - digits.len()), digits)
        } else {
            write!(f, "{}{}E{}", sign, digits, exponent)
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign = |d: &Decimal| match (d.is_zero(), d.mantissa.is_negative()) {
            (true, _) => 0,
            (false, true) => -1,
            (false, false) => 1,
        };
        let (sa, sb) = (sign(self), sign(other));
        if sa != sb || sa == 0 {
            return sa.cmp(&sb);
        }

        let magnitude_order = match self.adjusted_exponent().cmp(&other.adjusted_exponent()) {
            Ordering::Equal => {
                // Same leading position: the exponent gap is bounded by the digit count
                let min_exp = self.exponent.min(other.exponent);
                let a = self.mantissa.abs().mul_pow10((self.exponent - min_exp) as u32);
                let b = other.mantissa.abs().mul_pow10((other.exponent - min_exp) as u32);
                a.cmp(&b)
            }
            unequal => unequal,
        };
        if sa < 0 {
            magnitude_order.reverse()
        } else {
            magnitude_order
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
