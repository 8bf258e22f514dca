use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------      Credits       ----------------------------------------------------------
/// The ledger currency unit. Balances, gig prices and settlement amounts are all expressed in
/// whole credits. The unit is currency-agnostic; it only has to be conserved.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Credits(i64);

op!(binary Credits, Add, add);
op!(binary Credits, Sub, sub);
op!(inplace Credits, SubAssign, sub_assign);
op!(unary Credits, Neg, neg);

impl Mul<i64> for Credits {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Credits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in credits: {0}")]
pub struct CreditsConversionError(String);

impl From<i64> for Credits {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Credits {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Credits {}

impl TryFrom<u64> for Credits {
    type Error = CreditsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CreditsConversionError(format!("Value {value} is too large to convert to Credits")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl FromStr for Credits {
    type Err = CreditsConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Credits::from).map_err(|e| CreditsConversionError(e.to_string()))
    }
}

impl Display for Credits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} cr", self.0)
    }
}

impl Credits {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn zero() -> Self {
        Self(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic_forwards_to_inner_value() {
        let a = Credits::from(100);
        let b = Credits::from(35);
        assert_eq!(a + b, Credits::from(135));
        assert_eq!(a - b, Credits::from(65));
        assert_eq!(-a, Credits::from(-100));
        let mut c = a;
        c -= b;
        assert_eq!(c, Credits::from(65));
        assert_eq!(b * 2, Credits::from(70));
    }

    #[test]
    fn sums_and_conversions() {
        let total: Credits = [10i64, 20, 30].into_iter().map(Credits::from).sum();
        assert_eq!(total, Credits::from(60));
        assert!(Credits::try_from(u64::MAX).is_err());
        assert_eq!("42".parse::<Credits>().unwrap(), Credits::from(42));
        assert!("4.2".parse::<Credits>().is_err());
        assert_eq!(Credits::from(99).to_string(), "99 cr");
    }
}
