use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money        ----------------------------------------------------------
/// An amount of money in the smallest currency unit. All order totals, item prices and incoming transfer amounts are
/// integers of this type; there is no fractional arithmetic anywhere in the system.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            let value = value as i64;
            Ok(Self(value))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let negative = self.0 < 0;
        let mut digits = self.0.unsigned_abs().to_string();
        let mut groups = Vec::new();
        while digits.len() > 3 {
            let tail = digits.split_off(digits.len() - 3);
            groups.push(tail);
        }
        groups.push(digits);
        groups.reverse();
        write!(f, "{}{}₫", if negative { "-" } else { "" }, groups.join(","))
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn abs_diff(self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0) as i64)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Money::from(530_000);
        let b = Money::from(29_500);
        assert_eq!(a - b, Money::from(500_500));
        assert_eq!(b * 2, Money::from(59_000));
        assert_eq!(-b, Money::from(-29_500));
        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(589_000));
    }

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::from(0).to_string(), "0₫");
        assert_eq!(Money::from(999).to_string(), "999₫");
        assert_eq!(Money::from(530_000).to_string(), "530,000₫");
        assert_eq!(Money::from(-1_234_567).to_string(), "-1,234,567₫");
    }

    #[test]
    fn tolerance_arithmetic() {
        let total = Money::from(530_000);
        let received = Money::from(529_500);
        assert_eq!(total.abs_diff(received), Money::from(500));
        assert_eq!(received.abs_diff(total), Money::from(500));
    }
}
