//! Core types - Strong typing for safety

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::core::{Error, Result};

/// Tradeable instrument symbol (e.g. "INK", "BEANEDCOIN")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Chat-platform user id, kept as the platform's string form
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A trade size: an explicit number, or everything available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    Exact(Decimal),
    All,
}

impl Amount {
    /// Parse an investment amount ("250", "12.5", "all").
    pub fn parse_funds(input: &str) -> Result<Self> {
        Self::parse(input).ok_or_else(|| Error::InvalidAmount(input.trim().to_string()))
    }

    /// Parse a share quantity ("0.68", "all").
    pub fn parse_shares(input: &str) -> Result<Self> {
        Self::parse(input).ok_or_else(|| Error::InvalidQuantity(input.trim().to_string()))
    }

    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.eq_ignore_ascii_case("all") {
            return Some(Amount::All);
        }
        Decimal::from_str(input).ok().map(Amount::Exact)
    }

    /// Resolve `All` against what the caller currently has.
    pub fn resolve(self, available: Decimal) -> Decimal {
        match self {
            Amount::Exact(value) => value,
            Amount::All => available,
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::Exact(value)
    }
}

/// Round a currency value to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `a + b` for money, rejecting a total too large to represent.
pub fn checked_total(a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| Error::InvalidAmount(format!("{a} + {b} overflows")))
}

/// Convert a probability-space float into a decimal factor.
pub fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalized() {
        assert_eq!(Symbol::new(" ink ").as_str(), "INK");
        assert_eq!(Symbol::from("BeanedCoin"), Symbol::new("BEANEDCOIN"));
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(Amount::parse_funds("ALL").unwrap(), Amount::All);
        assert_eq!(
            Amount::parse_funds(" 12.5 ").unwrap(),
            Amount::Exact(Decimal::new(125, 1))
        );
        assert!(matches!(
            Amount::parse_funds("lots"),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::parse_shares("half"),
            Err(Error::InvalidQuantity(_))
        ));
    }

    #[test]
    fn test_checked_total() {
        assert_eq!(
            checked_total(Decimal::from(2), Decimal::new(5, 1)).unwrap(),
            Decimal::new(25, 1)
        );
        assert!(matches!(
            checked_total(Decimal::MAX, Decimal::ONE),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_cents(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
        assert_eq!(round_cents(Decimal::new(306, 0)), Decimal::new(30600, 2));
    }
}
