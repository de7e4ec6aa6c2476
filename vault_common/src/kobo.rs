use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const NAIRA_CURRENCY_CODE: &str = "NGN";

const KOBO_PER_NAIRA: i64 = 100;

//--------------------------------------        Kobo         ---------------------------------------------------------
/// An amount of money in kobo, the minor unit of the naira. All storage and arithmetic happen in this unit.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Kobo(i64);

op!(binary Kobo, Add, add);
op!(binary Kobo, Sub, sub);
op!(inplace Kobo, SubAssign, sub_assign);
op!(unary Kobo, Neg, neg);

impl Sum for Kobo {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented in kobo: {0}")]
pub struct KoboConversionError(String);

impl From<i64> for Kobo {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Kobo {
    type Error = KoboConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| KoboConversionError(format!("Value {value} is too large to convert to Kobo")))
    }
}

/// Strict parsing: only a non-empty run of ASCII digits is accepted. Signs, whitespace, decimal points and exponents
/// are all rejected, since currency must never travel as a float.
impl FromStr for Kobo {
    type Err = KoboConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KoboConversionError(format!("'{s}' is not an unsigned integer amount")));
        }
        s.parse::<i64>().map(Self).map_err(|e| KoboConversionError(format!("'{s}' is out of range. {e}")))
    }
}

impl Display for Kobo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let naira = abs / KOBO_PER_NAIRA as u64;
        let kobo = abs % KOBO_PER_NAIRA as u64;
        write!(f, "{sign}₦{naira}.{kobo:02}")
    }
}

impl Kobo {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_naira(naira: i64) -> Self {
        Self(naira * KOBO_PER_NAIRA)
    }

    /// The amount in whole naira. Fractions of a naira are truncated, never rounded.
    pub fn naira(&self) -> i64 {
        self.0 / KOBO_PER_NAIRA
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}
