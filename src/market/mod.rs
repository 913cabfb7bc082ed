//! Simulated stock market: instruments, the price walk, event regimes,
//! price history, and trading against a user ledger.

pub mod event;
pub mod history;
pub mod pricing;
pub mod trade;

pub use event::{EventKind, EventWeights, MarketEvent};
pub use history::{PriceHistory, PricePoint};
pub use pricing::{Band, CycleOutcome, MarketEngine, MarketParams, PriceChange};
pub use trade::{HoldingValue, PortfolioSummary, TradeReceipt, buy, portfolio_summary, sell};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::Symbol;

/// `symbol -> price`, the instruments store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instruments(BTreeMap<Symbol, Decimal>);

impl Instruments {
    /// Build from `(symbol, price)` pairs.
    pub fn from_prices<S: Into<Symbol>>(prices: impl IntoIterator<Item = (S, Decimal)>) -> Self {
        Self(
            prices
                .into_iter()
                .map(|(symbol, price)| (symbol.into(), price))
                .collect(),
        )
    }

    /// Seed set written on first start.
    pub fn default_seed() -> Self {
        Self::from_prices([
            ("INK", Decimal::from(300)),
            ("BEANEDCOIN", Decimal::from(10)),
        ])
    }

    pub fn get(&self, symbol: &Symbol) -> Option<Decimal> {
        self.0.get(symbol).copied()
    }

    pub fn insert(&mut self, symbol: Symbol, price: Decimal) {
        self.0.insert(symbol, price);
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.0.contains_key(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, Decimal)> {
        self.0.iter().map(|(symbol, price)| (symbol, *price))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the notifier hears after a market cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketReport {
    pub at: DateTime<Utc>,
    pub changes: BTreeMap<Symbol, PriceChange>,
    pub driving_event: Option<MarketEvent>,
    pub event_started: bool,
    pub next_event: Option<MarketEvent>,
}

impl MarketReport {
    pub fn from_cycle(outcome: &CycleOutcome, at: DateTime<Utc>) -> Self {
        Self {
            at,
            changes: outcome.changes.clone(),
            driving_event: outcome.driving_event,
            event_started: outcome.event_started,
            next_event: outcome.next_event,
        }
    }
}

impl std::fmt::Display for MarketReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Stock Market Update ({})", self.at.format("%Y-%m-%d %H:%M UTC"))?;
        if let Some(event) = self.driving_event {
            if self.event_started {
                writeln!(f, "Market event: {} begins!", event.kind)?;
            } else {
                writeln!(f, "Market event: {} continues", event.kind)?;
            }
        }
        for (symbol, change) in &self.changes {
            let sign = if change.abs_delta >= Decimal::ZERO { "+" } else { "" };
            writeln!(
                f,
                "{}: {:.2} -> {:.2} ({}{:.2}, {}{:.2}%)",
                symbol, change.old, change.new, sign, change.abs_delta, sign, change.pct_delta
            )?;
        }
        Ok(())
    }
}
