use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const BRL_CURRENCY_CODE: &str = "BRL";

//--------------------------------------     Centavos       ---------------------------------------------------------
/// An amount of Brazilian reais, held as an integer number of centavos.
///
/// All storefront arithmetic (cart totals, item subtotals, freight) happens on this type. The only place an amount
/// ever becomes a floating point number is [`Centavos::to_decimal`], which is used when talking to the payment gateway.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Centavos(i64);

op!(binary Centavos, Add, add);
op!(binary Centavos, Sub, sub);
op!(inplace Centavos, AddAssign, add_assign);
op!(inplace Centavos, SubAssign, sub_assign);
op!(unary Centavos, Neg, neg);

impl Mul<i64> for Centavos {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Centavos {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in centavos: {0}")]
pub struct CentavosConversionError(String);

impl From<i64> for Centavos {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Centavos {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Centavos {}

impl TryFrom<u64> for Centavos {
    type Error = CentavosConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentavosConversionError(format!("Value {value} is too large to convert to Centavos")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

/// Parses a decimal amount such as `35`, `35.5`, `35.00` or `35,00`. More than two decimal places is an error.
impl FromStr for Centavos {
    type Err = CentavosConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = digits.splitn(2, ['.', ',']);
        let whole = parts
            .next()
            .filter(|w| !w.is_empty())
            .ok_or_else(|| CentavosConversionError(format!("Invalid amount: {s}")))?
            .parse::<i64>()
            .map_err(|e| CentavosConversionError(format!("Invalid amount: {s}. {e}")))?;
        let cents = match parts.next() {
            None => 0,
            Some(c) if c.is_empty() || c.len() > 2 || !c.chars().all(|ch| ch.is_ascii_digit()) => {
                return Err(CentavosConversionError(format!("Invalid fractional part in amount: {s}")));
            },
            Some(c) if c.len() == 1 => c.parse::<i64>().map(|v| v * 10).unwrap_or_default(),
            Some(c) => c.parse::<i64>().unwrap_or_default(),
        };
        let value = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(|| CentavosConversionError(format!("Amount is too large: {s}")))?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Display for Centavos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}R$ {},{:02}", abs / 100, abs % 100)
    }
}

impl Centavos {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_reais(reais: i64) -> Self {
        Self(reais * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_mul(self, rhs: i64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }

    /// The amount in reais as a decimal number, e.g. 3550 centavos is `35.5`.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}
