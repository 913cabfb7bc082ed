//! Economy service - the single entry point the bot layer talks to.
//!
//! Every operation runs load -> mutate -> persist while holding one lock,
//! so two commands can never interleave their read-modify-write cycles.
//! Rejected operations return before anything is saved. When one of several
//! saves fails, the stores already written are put back as they were.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::core::{Amount, EconomyStore, Error, Result, Symbol, UserId};
use crate::dice::Dice;
use crate::lottery::{self, DrawOutcome, LotteryParams, LotteryTicket};
use crate::market::{
    self, Instruments, MarketEngine, MarketParams, MarketReport, PortfolioSummary, PricePoint,
    TradeReceipt,
};

/// Tunables the service needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct EconomySettings {
    pub market: MarketParams,
    pub lottery: LotteryParams,
    /// Max history points kept per symbol; 0 keeps everything
    pub history_retention: usize,
    /// Points returned by `price_history` when no count is given
    pub history_view: usize,
}

impl Default for EconomySettings {
    fn default() -> Self {
        Self {
            market: MarketParams::default(),
            lottery: LotteryParams::default(),
            history_retention: 2000,
            history_view: 10,
        }
    }
}

pub struct Economy<S, D> {
    store: S,
    market: MarketEngine,
    lottery: LotteryParams,
    history_retention: usize,
    history_view: usize,
    /// Guards the dice and serializes every operation
    dice: Mutex<D>,
}

impl<S: EconomyStore, D: Dice + Send> Economy<S, D> {
    pub fn new(store: S, dice: D, settings: EconomySettings) -> Self {
        Self {
            store,
            market: MarketEngine::new(settings.market),
            lottery: settings.lottery,
            history_retention: settings.history_retention,
            history_view: settings.history_view,
            dice: Mutex::new(dice),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn lottery_params(&self) -> &LotteryParams {
        &self.lottery
    }

    /// Run one market cycle stamped with the current time.
    pub fn update_prices(&self) -> Result<MarketReport> {
        self.update_prices_at(Utc::now())
    }

    pub fn update_prices_at(&self, at: DateTime<Utc>) -> Result<MarketReport> {
        let mut dice = self.dice.lock();
        let instruments = self.store.load_instruments();
        let active = self.store.load_event();

        let outcome = self.market.update(&instruments, active, &mut *dice);

        let previous_history = self.store.load_history();
        let mut history = previous_history.clone();
        for (symbol, price) in outcome.instruments.iter() {
            history.record(
                symbol,
                PricePoint {
                    timestamp: at,
                    price,
                },
                self.history_retention,
            );
        }

        self.store.save_instruments(&outcome.instruments)?;
        if let Err(e) = self.store.save_history(&history) {
            restore("instruments", self.store.save_instruments(&instruments));
            return Err(e);
        }
        if let Err(e) = self.store.save_event(outcome.next_event.as_ref()) {
            restore("history", self.store.save_history(&previous_history));
            restore("instruments", self.store.save_instruments(&instruments));
            return Err(e);
        }

        tracing::info!(
            "📈 Market cycle complete: {} instruments, event {:?}",
            outcome.instruments.len(),
            outcome.next_event
        );
        Ok(MarketReport::from_cycle(&outcome, at))
    }

    /// Invest `amount` ("250" or "all") in `symbol`.
    pub fn buy(&self, user: &UserId, symbol: &str, amount: &str) -> Result<TradeReceipt> {
        let _guard = self.dice.lock();
        let symbol = Symbol::new(symbol);
        let instruments = self.store.load_instruments();
        known_symbol(&instruments, &symbol)?;
        let amount = Amount::parse_funds(amount)?;
        let mut ledgers = self.store.load_ledgers();

        let (ledger, receipt) = market::buy(&ledgers.snapshot(user), &instruments, &symbol, amount)
            .inspect_err(|e| tracing::debug!("Buy rejected for {}: {}", user, e))?;
        ledgers.put(user.clone(), ledger);
        self.store.save_ledgers(&ledgers)?;

        tracing::info!(
            "User {} bought {} {} for {}",
            user,
            receipt.shares,
            receipt.symbol,
            receipt.cash
        );
        Ok(receipt)
    }

    /// Sell `quantity` shares ("0.5" or "all") of `symbol`.
    pub fn sell(&self, user: &UserId, symbol: &str, quantity: &str) -> Result<TradeReceipt> {
        let _guard = self.dice.lock();
        let symbol = Symbol::new(symbol);
        let instruments = self.store.load_instruments();
        known_symbol(&instruments, &symbol)?;
        let quantity = Amount::parse_shares(quantity)?;
        let mut ledgers = self.store.load_ledgers();

        let (ledger, receipt) =
            market::sell(&ledgers.snapshot(user), &instruments, &symbol, quantity)
                .inspect_err(|e| tracing::debug!("Sell rejected for {}: {}", user, e))?;
        ledgers.put(user.clone(), ledger);
        self.store.save_ledgers(&ledgers)?;

        tracing::info!(
            "User {} sold {} {} for {}",
            user,
            receipt.shares,
            receipt.symbol,
            receipt.cash
        );
        Ok(receipt)
    }

    /// Buy a lottery ticket from "4 8 15 16 23".
    pub fn buy_ticket(&self, user: &UserId, numbers: &str) -> Result<LotteryTicket> {
        let _guard = self.dice.lock();
        let numbers = lottery::parse_numbers(numbers)?;
        let previous_ledgers = self.store.load_ledgers();
        let pool = self.store.load_lottery();

        let (ledger, pool, ticket) = lottery::buy_ticket(
            &previous_ledgers.snapshot(user),
            &pool,
            user,
            numbers,
            &self.lottery,
        )
        .inspect_err(|e| tracing::debug!("Ticket rejected for {}: {}", user, e))?;
        let mut ledgers = previous_ledgers.clone();
        ledgers.put(user.clone(), ledger);

        self.store.save_ledgers(&ledgers)?;
        if let Err(e) = self.store.save_lottery(&pool) {
            restore("ledgers", self.store.save_ledgers(&previous_ledgers));
            return Err(e);
        }

        tracing::info!("🎟️ User {} bought ticket {:?}", user, ticket.numbers);
        Ok(ticket)
    }

    /// Draw, credit every winner, and roll the pool over.
    pub fn draw_lottery(&self) -> Result<DrawOutcome> {
        let mut dice = self.dice.lock();
        let pool = self.store.load_lottery();
        let outcome = lottery::draw(&pool, &self.lottery, &mut *dice);

        if outcome.payouts.is_empty() {
            self.store.save_lottery(&outcome.pool)?;
        } else {
            let previous_ledgers = self.store.load_ledgers();
            let mut ledgers = previous_ledgers.clone();
            for (user, amount) in &outcome.payouts {
                ledgers.credit(user, *amount)?;
            }
            self.store.save_ledgers(&ledgers)?;
            // an unsaved reset would pay the same tickets again next draw
            if let Err(e) = self.store.save_lottery(&outcome.pool) {
                restore("ledgers", self.store.save_ledgers(&previous_ledgers));
                return Err(e);
            }
        }

        tracing::info!(
            "🎰 Lottery drawn {:?}: {} tickets, paid {} to {} users, next jackpot {}",
            outcome.drawn,
            outcome.tickets_played,
            outcome.total_payout,
            outcome.payouts.len(),
            outcome.pool.jackpot
        );
        Ok(outcome)
    }

    pub fn jackpot(&self) -> Decimal {
        let _guard = self.dice.lock();
        self.store.load_lottery().jackpot
    }

    pub fn prices(&self) -> Instruments {
        let _guard = self.dice.lock();
        self.store.load_instruments()
    }

    /// Newest `count` points (default: the configured view size), oldest first.
    pub fn price_history(&self, symbol: &str, count: Option<usize>) -> Result<Vec<PricePoint>> {
        let _guard = self.dice.lock();
        let symbol = Symbol::new(symbol);
        let history = self.store.load_history();
        if history.len(&symbol) == 0 && !self.store.load_instruments().contains(&symbol) {
            return Err(Error::InvalidSymbol(symbol.to_string()));
        }
        Ok(history.recent(&symbol, count.unwrap_or(self.history_view)))
    }

    pub fn portfolio(&self, user: &UserId) -> PortfolioSummary {
        let _guard = self.dice.lock();
        let ledgers = self.store.load_ledgers();
        let instruments = self.store.load_instruments();
        market::portfolio_summary(&ledgers.snapshot(user), &instruments)
    }

    pub fn balance(&self, user: &UserId) -> Decimal {
        let _guard = self.dice.lock();
        self.store.load_ledgers().snapshot(user).balance
    }

    /// Pay Beaned Bucks into a user's balance (rewards, refunds).
    pub fn credit(&self, user: &UserId, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!("{amount} must be greater than 0")));
        }
        let _guard = self.dice.lock();
        let mut ledgers = self.store.load_ledgers();
        let balance = ledgers.credit(user, amount)?;
        self.store.save_ledgers(&ledgers)?;
        tracing::debug!("Credited {} to {}, balance {}", amount, user, balance);
        Ok(balance)
    }
}

fn known_symbol(instruments: &Instruments, symbol: &Symbol) -> Result<()> {
    if instruments.contains(symbol) {
        Ok(())
    } else {
        Err(Error::InvalidSymbol(symbol.to_string()))
    }
}

/// Put an earlier store state back after a later save in the same
/// operation failed.
fn restore(store: &str, result: Result<()>) {
    match result {
        Ok(()) => tracing::warn!("Rolled back {} after a failed save", store),
        Err(e) => tracing::error!("Failed to roll back {}: {}", store, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use crate::lottery::LotteryPool;
    use crate::market::{EventKind, MarketEvent};
    use crate::ledger::Ledgers;
    use crate::market::PriceHistory;
    use crate::storage::{MemoryStore, StoreSeeds};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn economy(dice: ScriptedDice) -> Economy<MemoryStore, ScriptedDice> {
        Economy::new(MemoryStore::default(), dice, EconomySettings::default())
    }

    fn user() -> UserId {
        UserId::new("u1")
    }

    /// Memory store whose lottery and event writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_lottery: AtomicBool,
        fail_event: AtomicBool,
    }

    fn disk_full() -> Error {
        Error::Io(std::io::Error::other("disk full"))
    }

    impl EconomyStore for FlakyStore {
        fn load_instruments(&self) -> Instruments {
            self.inner.load_instruments()
        }

        fn save_instruments(&self, instruments: &Instruments) -> Result<()> {
            self.inner.save_instruments(instruments)
        }

        fn load_history(&self) -> PriceHistory {
            self.inner.load_history()
        }

        fn save_history(&self, history: &PriceHistory) -> Result<()> {
            self.inner.save_history(history)
        }

        fn load_ledgers(&self) -> Ledgers {
            self.inner.load_ledgers()
        }

        fn save_ledgers(&self, ledgers: &Ledgers) -> Result<()> {
            self.inner.save_ledgers(ledgers)
        }

        fn load_lottery(&self) -> LotteryPool {
            self.inner.load_lottery()
        }

        fn save_lottery(&self, pool: &LotteryPool) -> Result<()> {
            if self.fail_lottery.load(Ordering::SeqCst) {
                return Err(disk_full());
            }
            self.inner.save_lottery(pool)
        }

        fn load_event(&self) -> Option<MarketEvent> {
            self.inner.load_event()
        }

        fn save_event(&self, event: Option<&MarketEvent>) -> Result<()> {
            if self.fail_event.load(Ordering::SeqCst) {
                return Err(disk_full());
            }
            self.inner.save_event(event)
        }
    }

    #[test]
    fn test_update_prices_persists_everything() {
        let store = MemoryStore::new(StoreSeeds {
            instruments: Instruments::from_prices([("INK", Decimal::from(300))]),
            ..StoreSeeds::default()
        });
        // no event, no jump, +2%
        let dice = ScriptedDice::new().units([0.5, 0.5, 0.1]).uniforms([0.02]);
        let economy = Economy::new(store, dice, EconomySettings::default());

        let report = economy.update_prices().unwrap();
        let ink = Symbol::new("INK");
        assert_eq!(report.changes[&ink].new, Decimal::from(306));
        assert_eq!(economy.prices().get(&ink), Some(Decimal::from(306)));
        let history = economy.price_history("ink", None).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].price, Decimal::from(306));
        assert_eq!(economy.store().load_event(), None);
    }

    #[test]
    fn test_event_threaded_through_store() {
        // crash rolled for 2 cycles
        let dice = ScriptedDice::new().units([0.97]).rolls([2]);
        let economy = economy(dice);
        let report = economy.update_prices().unwrap();
        assert!(report.event_started);
        assert_eq!(
            economy.store().load_event(),
            Some(MarketEvent::new(EventKind::Crash, 1))
        );

        let report = economy.update_prices().unwrap();
        assert!(!report.event_started);
        assert_eq!(report.driving_event.map(|e| e.kind), Some(EventKind::Crash));
        assert_eq!(economy.store().load_event(), None);
    }

    #[test]
    fn test_history_retention() {
        let settings = EconomySettings {
            history_retention: 3,
            ..EconomySettings::default()
        };
        let economy = Economy::new(MemoryStore::default(), ScriptedDice::new(), settings);
        for _ in 0..5 {
            economy.update_prices().unwrap();
        }
        assert_eq!(economy.price_history("INK", Some(100)).unwrap().len(), 3);
        assert_eq!(economy.price_history("INK", Some(2)).unwrap().len(), 2);
        assert!(matches!(
            economy.price_history("ACME", None),
            Err(Error::InvalidSymbol(_))
        ));
    }

    #[test]
    fn test_trading_round_trip() {
        let economy = economy(ScriptedDice::new());
        economy.credit(&user(), Decimal::from(1000)).unwrap();

        let receipt = economy.buy(&user(), "ink", "150").unwrap();
        assert_eq!(receipt.shares, Decimal::new(5, 1));
        assert_eq!(economy.balance(&user()), Decimal::from(850));

        let receipt = economy.sell(&user(), "INK", "all").unwrap();
        assert_eq!(receipt.cash, Decimal::from(150));
        let summary = economy.portfolio(&user());
        assert!(summary.holdings.is_empty());
        assert_eq!(summary.balance, Decimal::from(1000));
    }

    #[test]
    fn test_rejections_do_not_persist() {
        let economy = economy(ScriptedDice::new());
        economy.credit(&user(), Decimal::from(100)).unwrap();
        let before = economy.store().load_ledgers();

        assert!(matches!(
            economy.buy(&user(), "INK", "500"),
            Err(Error::InsufficientFunds { .. })
        ));
        assert!(matches!(
            economy.buy(&user(), "INK", "lots"),
            Err(Error::InvalidAmount(_))
        ));
        assert!(matches!(
            economy.sell(&user(), "INK", "1"),
            Err(Error::NotOwned(_))
        ));
        assert!(matches!(
            economy.buy_ticket(&user(), "1 2 3 4 5"),
            Err(Error::InsufficientFunds { .. })
        ));
        assert!(matches!(
            economy.credit(&user(), Decimal::ZERO),
            Err(Error::InvalidAmount(_))
        ));
        assert_eq!(economy.store().load_ledgers(), before);
        assert_eq!(economy.store().load_lottery(), LotteryPool::default());
    }

    #[test]
    fn test_ticket_and_draw() {
        let dice = ScriptedDice::new().sample([1, 2, 3, 4, 5]);
        let economy = economy(dice);
        economy.credit(&user(), Decimal::from(6000)).unwrap();

        let ticket = economy.buy_ticket(&user(), "5,4,3,2,1").unwrap();
        assert_eq!(ticket.numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(economy.balance(&user()), Decimal::from(1000));
        assert_eq!(economy.jackpot(), Decimal::from(105_000));

        let outcome = economy.draw_lottery().unwrap();
        assert_eq!(outcome.payouts[&user()], Decimal::from(105_000));
        assert_eq!(economy.balance(&user()), Decimal::from(106_000));
        assert_eq!(economy.jackpot(), Decimal::from(25_000));
        assert!(economy.store().load_lottery().tickets.is_empty());
    }

    #[test]
    fn test_failed_pool_save_refunds_ticket() {
        let economy = Economy::new(
            FlakyStore::default(),
            ScriptedDice::new(),
            EconomySettings::default(),
        );
        economy.credit(&user(), Decimal::from(6000)).unwrap();
        economy.store().fail_lottery.store(true, Ordering::SeqCst);

        assert!(matches!(
            economy.buy_ticket(&user(), "1 2 3 4 5"),
            Err(Error::Io(_))
        ));
        assert_eq!(economy.balance(&user()), Decimal::from(6000));
        assert!(economy.store().load_lottery().tickets.is_empty());
    }

    #[test]
    fn test_failed_pool_reset_does_not_pay_twice() {
        let dice = ScriptedDice::new()
            .sample([1, 2, 3, 4, 5])
            .sample([1, 2, 3, 4, 5]);
        let economy = Economy::new(FlakyStore::default(), dice, EconomySettings::default());
        economy.credit(&user(), Decimal::from(6000)).unwrap();
        economy.buy_ticket(&user(), "1 2 3 4 5").unwrap();

        economy.store().fail_lottery.store(true, Ordering::SeqCst);
        assert!(economy.draw_lottery().is_err());
        assert_eq!(economy.balance(&user()), Decimal::from(1000));
        assert_eq!(economy.jackpot(), Decimal::from(105_000));

        economy.store().fail_lottery.store(false, Ordering::SeqCst);
        let outcome = economy.draw_lottery().unwrap();
        assert_eq!(outcome.payouts[&user()], Decimal::from(105_000));
        assert_eq!(economy.balance(&user()), Decimal::from(106_000));
        assert_eq!(economy.jackpot(), Decimal::from(25_000));
    }

    #[test]
    fn test_failed_event_save_rolls_back_prices() {
        let economy = Economy::new(
            FlakyStore::default(),
            ScriptedDice::new(),
            EconomySettings::default(),
        );
        economy.store().fail_event.store(true, Ordering::SeqCst);

        assert!(economy.update_prices().is_err());
        assert_eq!(economy.prices(), Instruments::default_seed());
        assert!(economy.store().load_history().is_empty());
    }

    #[test]
    fn test_unknown_symbol_reported_before_amount() {
        let economy = economy(ScriptedDice::new());
        economy.credit(&user(), Decimal::from(100)).unwrap();
        assert!(matches!(
            economy.buy(&user(), "ACME", "lots"),
            Err(Error::InvalidSymbol(_))
        ));
        assert!(matches!(
            economy.sell(&user(), "ACME", "lots"),
            Err(Error::InvalidSymbol(_))
        ));
        assert!(matches!(
            economy.buy(&user(), "INK", "lots"),
            Err(Error::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_credit_overflow_rejected() {
        let economy = economy(ScriptedDice::new());
        economy.credit(&user(), Decimal::MAX).unwrap();
        assert!(matches!(
            economy.credit(&user(), Decimal::ONE),
            Err(Error::InvalidAmount(_))
        ));
        assert_eq!(economy.balance(&user()), Decimal::MAX);
    }
}
