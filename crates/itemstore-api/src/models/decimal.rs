//! Fixed-scale decimal numbers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest number of fractional digits the store accepts.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// A decimal number that keeps the number of fractional digits it was written with.
///
/// `"12.30"` parses to a value that displays as `12.30` again, while still
/// comparing equal to `12.3`.
///
/// # Example
///
/// ```
/// use itemstore_api_rs::models::Decimal;
///
/// let price: Decimal = "12.30".parse().unwrap();
/// assert_eq!(price.to_string(), "12.30");
/// assert_eq!(price, "12.3".parse::<Decimal>().unwrap());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

/// Error returned when a string is not a valid decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal '{0}'")]
pub struct ParseDecimalError(pub String);

impl Decimal {
    /// Creates a decimal from an unscaled integer and a scale (`1234, 2` is `12.34`).
    pub fn new(mantissa: i128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    /// Returns the number of fractional digits.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Returns the unscaled integer value.
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Brings both operands to the same scale. Returns `None` on overflow.
    fn aligned(&self, other: &Decimal) -> Option<(i128, i128)> {
        let scale = self.scale.max(other.scale);
        let lhs = self
            .mantissa
            .checked_mul(10i128.checked_pow(scale - self.scale)?)?;
        let rhs = other
            .mantissa
            .checked_mul(10i128.checked_pow(scale - other.scale)?)?;
        Some((lhs, rhs))
    }

    fn as_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(value as i128, 0)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let trimmed = s.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(err());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let scale = frac_part.len() as u32;
        if scale > MAX_DECIMAL_SCALE {
            return Err(err());
        }
        let digits = format!("{}{}", int_part, frac_part);
        let magnitude: i128 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| err())?
        };
        let mantissa = if negative { -magnitude } else { magnitude };
        Ok(Self { mantissa, scale })
    }
}

impl TryFrom<String> for Decimal {
    type Error = ParseDecimalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Decimal> for String {
    fn from(value: Decimal) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let magnitude = self.mantissa.unsigned_abs().to_string();
        if self.scale == 0 {
            return write!(f, "{}{}", sign, magnitude);
        }
        let scale = self.scale as usize;
        let padded = format!("{:0>width$}", magnitude, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.aligned(other) {
            Some((lhs, rhs)) => lhs.cmp(&rhs),
            // Only reachable near i128::MAX; float comparison is close enough there.
            None => self
                .as_f64()
                .partial_cmp(&other.as_f64())
                .unwrap_or(Ordering::Equal),
        }
    }
}
