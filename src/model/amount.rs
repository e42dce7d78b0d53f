//! Amount type for monetary values read from statements.
//!
//! Statement exports disagree on how they write money: `-50.00`, `$50.00`, `-$1,234.50`,
//! `(12.00)` and `+7.5` all show up. `Amount` wraps a `Decimal` and accepts all of those.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Neg};
use std::str::FromStr;

/// Represents a signed amount of money.
///
/// # Examples
///
/// ```
/// # use spendwise::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("-$1,000.50").unwrap();
/// assert_eq!(a.to_string(), "-1000.50");
/// assert_eq!(a.to_money(), "-$1,000.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Multiplies the amount by `share`, rounding to cents.
    pub fn portion(&self, share: Decimal) -> Amount {
        Amount((self.0 * share).round_dp(2))
    }

    /// Formats with a dollar sign and thousands separators, e.g. `-$60,000.00`.
    pub fn to_money(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let num = self.0.abs().to_f64().unwrap_or_default();
        format!("{sign}${}", format_num::format_num!(",.2", num))
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(String, rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.1, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid amount '{}': {}", self.0, self.1)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.1)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        // Accounting style negatives: (12.00)
        let (negative, body) = match trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (true, inner.trim()),
            None => (false, trimmed),
        };

        let (negative, body) = if let Some(rest) = body.strip_prefix('-') {
            (!negative, rest)
        } else if let Some(rest) = body.strip_prefix('+') {
            (negative, rest)
        } else {
            (negative, body)
        };

        let cleaned: String = body
            .trim()
            .trim_start_matches('$')
            .chars()
            .filter(|&c| c != ',' && !c.is_whitespace())
            .collect();

        let value = Decimal::from_str(&cleaned).map_err(|e| AmountError(s.to_string(), e))?;
        Ok(Amount(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0.round_dp(2))
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Self::Output {
        Amount(-self.0)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
