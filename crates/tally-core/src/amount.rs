// DECIMAL AMOUNTS
//
// Amounts travel as decimal values and are kept exact. Precision limits are
// checked explicitly rather than by rounding on parse, so an over-precise
// amount stays visible to validation instead of being silently truncated.

use crate::error::ValidationError;
use bigdecimal::BigDecimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// Fractional digits used whenever an amount enters a signed message.
pub const SIGNED_AMOUNT_DECIMALS: u32 = 8;

/// Largest number of integer digits a parsed amount may carry.
pub const MAX_INTEGER_DIGITS: i64 = 20;

/// Largest number of significant fractional digits a parsed amount may carry.
/// Anything past `SIGNED_AMOUNT_DECIMALS` still parses so validation can
/// report it as a precision error.
pub const MAX_FRACTION_DIGITS: i64 = 38;

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigDecimal);

impl Amount {
    pub fn zero() -> Self {
        Amount(BigDecimal::default())
    }

    /// Amount from integer base units (10^-8).
    pub fn from_base_units(units: i64) -> Self {
        Amount(BigDecimal::new(units.into(), SIGNED_AMOUNT_DECIMALS as i64))
    }

    pub fn is_positive(&self) -> bool {
        self.0 > BigDecimal::default()
    }

    /// Number of significant fractional digits (trailing zeros ignored).
    pub fn fractional_digits(&self) -> i64 {
        let (_, scale) = self.0.normalized().as_bigint_and_exponent();
        scale.max(0)
    }

    pub fn exceeds_precision(&self, decimals: u32) -> bool {
        self.fractional_digits() > decimals as i64
    }

    /// Render with exactly `decimals` fractional digits, truncating any excess.
    pub fn to_fixed(&self, decimals: u32) -> String {
        let (digits, _) = self.0.with_scale(decimals as i64).as_bigint_and_exponent();
        let rendered = digits.to_string();
        let (sign, magnitude) = match rendered.strip_prefix('-') {
            Some(rest) => ("-", rest.to_string()),
            None => ("", rendered),
        };
        if decimals == 0 {
            return format!("{}{}", sign, magnitude);
        }

        let width = decimals as usize + 1;
        let padded = format!("{:0>width$}", magnitude, width = width);
        let split = padded.len() - decimals as usize;
        format!("{}{}.{}", sign, &padded[..split], &padded[split..])
    }

    /// Canonical form used inside signed messages.
    pub fn to_signed_string(&self) -> String {
        self.to_fixed(SIGNED_AMOUNT_DECIMALS)
    }

    /// Check the amount is positive and within `decimals` fractional digits.
    pub fn check_well_formed(&self, decimals: u32, what: &str) -> Result<(), ValidationError> {
        if self.exceeds_precision(decimals) {
            return Err(ValidationError::InvalidAmounts(format!(
                "{} amounts limited to {} decimal places: {}",
                what, decimals, self.0
            )));
        }
        if !self.is_positive() {
            return Err(ValidationError::InvalidAmounts(format!(
                "{} can't be zero or negative",
                what
            )));
        }
        Ok(())
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = BigDecimal::from_str(s.trim())
            .map_err(|e| ValidationError::InvalidAmounts(format!("unparseable amount {:?}: {}", s, e)))?;
        Amount::bounded(value, s)
    }
}

impl Amount {
    // Exponent notation makes tiny strings name enormous values; those never
    // reach rendering.
    fn bounded(value: BigDecimal, raw: &str) -> Result<Amount, ValidationError> {
        let normalized = value.normalized();
        let (_, scale) = normalized.as_bigint_and_exponent();
        let integer_digits = normalized.digits() as i64 - scale;
        if scale > MAX_FRACTION_DIGITS || integer_digits > MAX_INTEGER_DIGITS {
            return Err(ValidationError::InvalidAmounts(format!(
                "amount {:?} outside {} integer / {} fractional digits",
                raw, MAX_INTEGER_DIGITS, MAX_FRACTION_DIGITS
            )));
        }
        Ok(Amount(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_signed_string())
    }
}

impl Add for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sub for &Amount {
    type Output = Amount;

    fn sub(self, rhs: &Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.fold(Amount::zero(), |acc, a| &acc + a)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // plain decimal with every significant digit, never exponent notation
        let digits = u32::try_from(self.fractional_digits()).unwrap_or(u32::MAX);
        serializer.serialize_str(&self.to_fixed(digits))
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be finite"));
        }
        // shortest round-trip representation, so 3.2 stays 3.2
        Amount::from_str(&v.to_string()).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount(BigDecimal::from(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount(BigDecimal::from(v)))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
