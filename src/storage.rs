//! Flat-file JSON persistence.
//!
//! Each store is one pretty-printed JSON document. Loading is self-healing:
//! a missing, unreadable or ill-shaped document is replaced by its seed
//! value and rewritten on the spot. Writes go to a sibling temp file that
//! is renamed over the target.

use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::core::{EconomyStore, Error, Result};
use crate::ledger::Ledgers;
use crate::lottery::LotteryPool;
use crate::market::{Instruments, MarketEvent, PriceHistory};

pub const INSTRUMENTS_FILE: &str = "stocks.json";
pub const HISTORY_FILE: &str = "stock_history.json";
pub const LEDGERS_FILE: &str = "data.json";
pub const LOTTERY_FILE: &str = "lottery.json";
pub const EVENT_FILE: &str = "market_event.json";

/// Shape checks beyond what deserialization enforces.
pub trait StoreDocument: Serialize + DeserializeOwned {
    fn check(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

impl StoreDocument for Instruments {
    fn check(&self) -> std::result::Result<(), String> {
        match self.iter().find(|(_, price)| *price <= Decimal::ZERO) {
            Some((symbol, price)) => Err(format!("{symbol} has non-positive price {price}")),
            None => Ok(()),
        }
    }
}

impl StoreDocument for PriceHistory {}

impl StoreDocument for Ledgers {}

impl StoreDocument for LotteryPool {
    fn check(&self) -> std::result::Result<(), String> {
        if self.jackpot < Decimal::ZERO {
            return Err(format!("negative jackpot {}", self.jackpot));
        }
        Ok(())
    }
}

impl StoreDocument for Option<MarketEvent> {
    fn check(&self) -> std::result::Result<(), String> {
        match self {
            Some(event) if event.remaining_cycles == 0 => Err("event with no cycles left".into()),
            _ => Ok(()),
        }
    }
}

/// One JSON document on disk.
pub struct JsonStore<T> {
    name: &'static str,
    path: PathBuf,
    _doc: PhantomData<fn() -> T>,
}

impl<T: StoreDocument> JsonStore<T> {
    pub fn new(name: &'static str, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
            _doc: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read. A missing file is an `Io` error, anything unparsable
    /// or failing [`StoreDocument::check`] is `PersistenceCorrupt`.
    pub fn read(&self) -> Result<T> {
        let raw = std::fs::read_to_string(&self.path)?;
        let doc: T = serde_json::from_str(&raw).map_err(|e| self.corrupt(e.to_string()))?;
        doc.check().map_err(|reason| self.corrupt(reason))?;
        Ok(doc)
    }

    pub fn load_or_seed(&self, seed: impl FnOnce() -> T) -> T {
        match self.read() {
            Ok(doc) => doc,
            Err(err) => {
                match &err {
                    Error::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                        tracing::info!("📁 Seeding {} store at {}", self.name, self.path.display());
                    }
                    _ => tracing::warn!("⚠️ {}; rewriting {} with seed value", err, self.name),
                }
                let doc = seed();
                if let Err(write_err) = self.write(&doc) {
                    tracing::error!("Failed to rewrite {} store: {}", self.name, write_err);
                }
                doc
            }
        }
    }

    pub fn write(&self, doc: &T) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let body = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn corrupt(&self, reason: String) -> Error {
        Error::PersistenceCorrupt {
            store: self.name.to_string(),
            reason,
        }
    }
}

/// Values written when a store has to be created or healed.
#[derive(Debug, Clone)]
pub struct StoreSeeds {
    pub instruments: Instruments,
    pub initial_jackpot: Decimal,
}

impl Default for StoreSeeds {
    fn default() -> Self {
        Self {
            instruments: Instruments::default_seed(),
            initial_jackpot: Decimal::from(100_000),
        }
    }
}

/// The bot's data directory.
pub struct FileStore {
    instruments: JsonStore<Instruments>,
    history: JsonStore<PriceHistory>,
    ledgers: JsonStore<Ledgers>,
    lottery: JsonStore<LotteryPool>,
    event: JsonStore<Option<MarketEvent>>,
    seeds: StoreSeeds,
}

impl FileStore {
    pub fn open(data_dir: impl AsRef<Path>, seeds: StoreSeeds) -> Self {
        let dir = data_dir.as_ref();
        Self {
            instruments: JsonStore::new("instruments", dir.join(INSTRUMENTS_FILE)),
            history: JsonStore::new("history", dir.join(HISTORY_FILE)),
            ledgers: JsonStore::new("ledgers", dir.join(LEDGERS_FILE)),
            lottery: JsonStore::new("lottery", dir.join(LOTTERY_FILE)),
            event: JsonStore::new("market event", dir.join(EVENT_FILE)),
            seeds,
        }
    }
}

impl EconomyStore for FileStore {
    fn load_instruments(&self) -> Instruments {
        self.instruments
            .load_or_seed(|| self.seeds.instruments.clone())
    }

    fn save_instruments(&self, instruments: &Instruments) -> Result<()> {
        self.instruments.write(instruments)
    }

    fn load_history(&self) -> PriceHistory {
        self.history.load_or_seed(PriceHistory::new)
    }

    fn save_history(&self, history: &PriceHistory) -> Result<()> {
        self.history.write(history)
    }

    fn load_ledgers(&self) -> Ledgers {
        self.ledgers.load_or_seed(Ledgers::new)
    }

    fn save_ledgers(&self, ledgers: &Ledgers) -> Result<()> {
        self.ledgers.write(ledgers)
    }

    fn load_lottery(&self) -> LotteryPool {
        self.lottery
            .load_or_seed(|| LotteryPool::with_jackpot(self.seeds.initial_jackpot))
    }

    fn save_lottery(&self, pool: &LotteryPool) -> Result<()> {
        self.lottery.write(pool)
    }

    fn load_event(&self) -> Option<MarketEvent> {
        self.event.load_or_seed(|| None)
    }

    fn save_event(&self, event: Option<&MarketEvent>) -> Result<()> {
        self.event.write(&event.copied())
    }
}

/// In-process store for tests and embedding.
pub struct MemoryStore {
    instruments: Mutex<Instruments>,
    history: Mutex<PriceHistory>,
    ledgers: Mutex<Ledgers>,
    lottery: Mutex<LotteryPool>,
    event: Mutex<Option<MarketEvent>>,
}

impl MemoryStore {
    pub fn new(seeds: StoreSeeds) -> Self {
        Self {
            instruments: Mutex::new(seeds.instruments),
            history: Mutex::new(PriceHistory::new()),
            ledgers: Mutex::new(Ledgers::new()),
            lottery: Mutex::new(LotteryPool::with_jackpot(seeds.initial_jackpot)),
            event: Mutex::new(None),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreSeeds::default())
    }
}

impl EconomyStore for MemoryStore {
    fn load_instruments(&self) -> Instruments {
        self.instruments.lock().clone()
    }

    fn save_instruments(&self, instruments: &Instruments) -> Result<()> {
        *self.instruments.lock() = instruments.clone();
        Ok(())
    }

    fn load_history(&self) -> PriceHistory {
        self.history.lock().clone()
    }

    fn save_history(&self, history: &PriceHistory) -> Result<()> {
        *self.history.lock() = history.clone();
        Ok(())
    }

    fn load_ledgers(&self) -> Ledgers {
        self.ledgers.lock().clone()
    }

    fn save_ledgers(&self, ledgers: &Ledgers) -> Result<()> {
        *self.ledgers.lock() = ledgers.clone();
        Ok(())
    }

    fn load_lottery(&self) -> LotteryPool {
        self.lottery.lock().clone()
    }

    fn save_lottery(&self, pool: &LotteryPool) -> Result<()> {
        *self.lottery.lock() = pool.clone();
        Ok(())
    }

    fn load_event(&self) -> Option<MarketEvent> {
        *self.event.lock()
    }

    fn save_event(&self, event: Option<&MarketEvent>) -> Result<()> {
        *self.event.lock() = event.copied();
        Ok(())
    }
}
