//! User ledgers - balance, holdings and investment totals per user.
//!
//! The ledger store is shared with the rest of the bot (daily rewards,
//! mining rigs, ...). Fields this crate does not own are carried through
//! untouched in [`UserLedger::extra`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::{Result, Symbol, UserId, checked_total};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLedger {
    #[serde(default)]
    pub balance: Decimal,
    /// `symbol -> shares`; never holds a zero entry
    #[serde(default)]
    pub portfolio: BTreeMap<Symbol, Decimal>,
    #[serde(default)]
    pub total_spent: Decimal,
    #[serde(default)]
    pub total_earned: Decimal,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserLedger {
    pub fn with_balance(balance: Decimal) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    pub fn holding(&self, symbol: &Symbol) -> Decimal {
        self.portfolio.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn net_profit(&self) -> Decimal {
        self.total_earned - self.total_spent
    }
}

/// `user_id -> ledger`, the ledger store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledgers(BTreeMap<UserId, UserLedger>);

impl Ledgers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &UserId) -> Option<&UserLedger> {
        self.0.get(user)
    }

    /// Copy of the user's ledger, or a fresh one on first access.
    pub fn snapshot(&self, user: &UserId) -> UserLedger {
        self.0.get(user).cloned().unwrap_or_default()
    }

    pub fn put(&mut self, user: UserId, ledger: UserLedger) {
        self.0.insert(user, ledger);
    }

    /// Add `amount` to the user's balance, creating the ledger if needed.
    /// A balance that would overflow is rejected and left as it was.
    pub fn credit(&mut self, user: &UserId, amount: Decimal) -> Result<Decimal> {
        let current = self.0.get(user).map_or(Decimal::ZERO, |ledger| ledger.balance);
        let balance = checked_total(current, amount)?;
        self.0.entry(user.clone()).or_default().balance = balance;
        Ok(balance)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &UserLedger)> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_unknown_fields() {
        let json = r#"{
            "398607026176917535": {"balance": 1250.5, "graphics_cards": 2, "mining": "BEANEDCOIN"},
            "12": {"portfolio": {"INK": 0.5}, "total_spent": 150}
        }"#;
        let ledgers: Ledgers = serde_json::from_str(json).unwrap();

        let rich = ledgers.get(&UserId::new("398607026176917535")).unwrap();
        assert_eq!(rich.balance, Decimal::new(12505, 1));
        assert!(rich.portfolio.is_empty());
        assert_eq!(rich.total_earned, Decimal::ZERO);
        assert_eq!(rich.extra["graphics_cards"], Value::from(2));

        let investor = ledgers.get(&UserId::new("12")).unwrap();
        assert_eq!(investor.balance, Decimal::ZERO);
        assert_eq!(investor.holding(&Symbol::new("INK")), Decimal::new(5, 1));
        assert_eq!(investor.net_profit(), Decimal::from(-150));

        let round_trip = serde_json::to_value(&ledgers).unwrap();
        assert_eq!(round_trip["398607026176917535"]["mining"], "BEANEDCOIN");
    }

    #[test]
    fn test_credit_creates_ledger() {
        let mut ledgers = Ledgers::new();
        let user = UserId::new("u1");
        assert_eq!(ledgers.snapshot(&user), UserLedger::default());
        assert_eq!(ledgers.credit(&user, Decimal::from(100)).unwrap(), Decimal::from(100));
        assert_eq!(ledgers.credit(&user, Decimal::from(25)).unwrap(), Decimal::from(125));
        assert_eq!(ledgers.len(), 1);
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let mut ledgers = Ledgers::new();
        let user = UserId::new("whale");
        ledgers.credit(&user, Decimal::MAX).unwrap();
        assert!(matches!(
            ledgers.credit(&user, Decimal::ONE),
            Err(crate::core::Error::InvalidAmount(_))
        ));
        assert_eq!(ledgers.snapshot(&user).balance, Decimal::MAX);
    }
}
