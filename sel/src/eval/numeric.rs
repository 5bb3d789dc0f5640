//! Numeric tower: Integer (narrow) -> BigInteger -> Decimal
//!
//! Binary operations promote both operands to the wider kind of the pair.
//! Narrow arithmetic that overflows `i64` continues in BigInteger.

use super::error::{FunctionError, FunctionOutcome};
use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Integer(i64),
    BigInteger(BigInt),
    Decimal(BigDecimal),
}

/// Both operands of a binary operation at their common kind
enum Pair {
    Integer(i64, i64),
    Big(BigInt, BigInt),
    Decimal(BigDecimal, BigDecimal),
}

impl Number {
    /// Read text as a number: decimal when it has a fraction or exponent,
    /// big integer otherwise
    pub fn parse(text: &str) -> Option<Number> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if text.contains(['.', 'e', 'E']) {
            BigDecimal::from_str(text).ok().map(Number::Decimal)
        } else {
            BigInt::from_str(text).ok().map(Number::BigInteger)
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Number::Integer(_) => "Integer",
            Number::BigInteger(_) => "BigInteger",
            Number::Decimal(_) => "Decimal",
        }
    }

    pub fn to_decimal(&self) -> BigDecimal {
        match self {
            Number::Integer(n) => BigDecimal::from(*n),
            Number::BigInteger(n) => BigDecimal::from(n.clone()),
            Number::Decimal(d) => d.clone(),
        }
    }

    fn to_big(&self) -> BigInt {
        match self {
            Number::Integer(n) => BigInt::from(*n),
            Number::BigInteger(n) => n.clone(),
            // Only reached for pairs without decimals
            Number::Decimal(d) => d.with_scale(0).as_bigint_and_exponent().0,
        }
    }

    /// Integral value as usize, when it is one
    pub fn to_index(&self) -> Option<usize> {
        match self {
            Number::Integer(n) => usize::try_from(*n).ok(),
            Number::BigInteger(n) => n.to_usize(),
            Number::Decimal(d) => {
                if d.is_integer() {
                    d.to_usize()
                } else {
                    None
                }
            }
        }
    }

    pub fn is_whole(&self) -> bool {
        match self {
            Number::Integer(_) | Number::BigInteger(_) => true,
            Number::Decimal(d) => d.is_integer(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Integer(n) => *n == 0,
            Number::BigInteger(n) => n.is_zero(),
            Number::Decimal(d) => d.is_zero(),
        }
    }

    fn pair(self, other: Number) -> Pair {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => Pair::Integer(a, b),
            (a @ Number::Decimal(_), b) | (a, b @ Number::Decimal(_)) => {
                Pair::Decimal(a.to_decimal(), b.to_decimal())
            }
            (a, b) => Pair::Big(a.to_big(), b.to_big()),
        }
    }

    pub fn add(self, other: Number) -> Number {
        match self.pair(other) {
            Pair::Integer(a, b) => a
                .checked_add(b)
                .map(Number::Integer)
                .unwrap_or_else(|| Number::BigInteger(BigInt::from(a) + BigInt::from(b))),
            Pair::Big(a, b) => Number::BigInteger(a + b),
            Pair::Decimal(a, b) => Number::Decimal(a + b),
        }
    }

    pub fn sub(self, other: Number) -> Number {
        match self.pair(other) {
            Pair::Integer(a, b) => a
                .checked_sub(b)
                .map(Number::Integer)
                .unwrap_or_else(|| Number::BigInteger(BigInt::from(a) - BigInt::from(b))),
            Pair::Big(a, b) => Number::BigInteger(a - b),
            Pair::Decimal(a, b) => Number::Decimal(a - b),
        }
    }

    pub fn mul(self, other: Number) -> Number {
        match self.pair(other) {
            Pair::Integer(a, b) => a
                .checked_mul(b)
                .map(Number::Integer)
                .unwrap_or_else(|| Number::BigInteger(BigInt::from(a) * BigInt::from(b))),
            Pair::Big(a, b) => Number::BigInteger(a * b),
            Pair::Decimal(a, b) => Number::Decimal(a * b),
        }
    }

    /// Remainder with the sign of the dividend
    pub fn rem(self, other: Number) -> FunctionOutcome<Number> {
        if other.is_zero() {
            return Err(FunctionError::division_by_zero());
        }
        Ok(match self.pair(other) {
            Pair::Integer(a, b) => a
                .checked_rem(b)
                .map(Number::Integer)
                .unwrap_or_else(|| Number::BigInteger(BigInt::from(a) % BigInt::from(b))),
            Pair::Big(a, b) => Number::BigInteger(a % b),
            Pair::Decimal(a, b) => Number::Decimal(a % b),
        })
    }

    /// Division always yields a decimal rounded half-up to `scale` digits
    pub fn div(self, other: Number, scale: i64) -> FunctionOutcome<Number> {
        if other.is_zero() {
            return Err(FunctionError::division_by_zero());
        }
        let quotient = self.to_decimal() / other.to_decimal();
        Ok(Number::Decimal(tidy(
            quotient.with_scale_round(scale, RoundingMode::HalfUp),
        )))
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Integer(n) => n
                .checked_neg()
                .map(Number::Integer)
                .unwrap_or_else(|| Number::BigInteger(-BigInt::from(n))),
            Number::BigInteger(n) => Number::BigInteger(-n),
            Number::Decimal(d) => Number::Decimal(-d),
        }
    }

    pub fn abs(self) -> Number {
        match self {
            Number::Integer(n) => n
                .checked_abs()
                .map(Number::Integer)
                .unwrap_or_else(|| Number::BigInteger(BigInt::from(n).abs())),
            Number::BigInteger(n) => Number::BigInteger(n.abs()),
            Number::Decimal(d) => Number::Decimal(d.abs()),
        }
    }

    pub fn compare(&self, other: &Number) -> Ordering {
        match self.clone().pair(other.clone()) {
            Pair::Integer(a, b) => a.cmp(&b),
            Pair::Big(a, b) => a.cmp(&b),
            Pair::Decimal(a, b) => a.cmp(&b),
        }
    }
}

/// Strip trailing zeros without switching to a negative scale
fn tidy(d: BigDecimal) -> BigDecimal {
    let normalized = d.normalized();
    if normalized.as_bigint_and_exponent().1 < 0 {
        normalized.with_scale(0)
    } else {
        normalized
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{n}"),
            Number::BigInteger(n) => write!(f, "{n}"),
            Number::Decimal(d) => write!(f, "{d}"),
        }
    }
}
