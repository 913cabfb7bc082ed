//! Core traits - Seams between the economy core and its host

use async_trait::async_trait;

use crate::core::Result;
use crate::ledger::Ledgers;
use crate::lottery::{DrawOutcome, LotteryPool};
use crate::market::{Instruments, MarketEvent, MarketReport, PriceHistory};

/// Persistence collaborator - one document per store.
///
/// Loads never fail: a missing or corrupt store is replaced by its seed
/// value. Saves report IO failures to the caller.
pub trait EconomyStore: Send + Sync {
    fn load_instruments(&self) -> Instruments;

    fn save_instruments(&self, instruments: &Instruments) -> Result<()>;

    fn load_history(&self) -> PriceHistory;

    fn save_history(&self, history: &PriceHistory) -> Result<()>;

    fn load_ledgers(&self) -> Ledgers;

    fn save_ledgers(&self, ledgers: &Ledgers) -> Result<()>;

    fn load_lottery(&self) -> LotteryPool;

    fn save_lottery(&self, pool: &LotteryPool) -> Result<()>;

    /// Active market event carried between update cycles
    fn load_event(&self) -> Option<MarketEvent>;

    fn save_event(&self, event: Option<&MarketEvent>) -> Result<()>;
}

/// Notification collaborator (chat channel poster)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Called after every market update cycle
    async fn market_updated(&self, report: &MarketReport) -> Result<()>;

    /// Called after every lottery draw
    async fn lottery_drawn(&self, outcome: &DrawOutcome) -> Result<()>;
}
