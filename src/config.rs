//! Central configuration for the Beaned Bucks economy.
//!
//! Loads from `config.toml` (or the file named by `BEANED_CONFIG`). Every
//! section and key is optional; missing values fall back to the live bot's
//! settings, so an empty file is a valid config.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{Error, Result};
use crate::engine::EconomySettings;
use crate::lottery::LotteryParams;
use crate::market::{Instruments, MarketParams};
use crate::storage::StoreSeeds;

/// Environment variable naming an explicit config path.
pub const CONFIG_ENV: &str = "BEANED_CONFIG";

/// Log filter installed before any config is read.
pub const DEFAULT_LOG_FILTER: &str = "info,beaned_bucks=debug";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub market: MarketConfig,
    pub lottery: LotteryConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_level: String,
    /// Directory holding the JSON stores
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_FILTER.to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub update_interval_minutes: u64,
    /// Instruments written when the store is first created
    pub seed: Instruments,
    /// Max history points per symbol, 0 = unbounded
    pub history_retention: usize,
    pub history_view: usize,
    pub params: MarketParams,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            update_interval_minutes: 20,
            seed: Instruments::default_seed(),
            history_retention: 2000,
            history_view: 10,
            params: MarketParams::default(),
        }
    }
}

impl MarketConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes * 60)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    /// Local wall-clock time of the daily draw, `HH:MM`
    pub draw_time: String,
    /// IANA zone name the draw time is read in
    pub timezone: String,
    pub params: LotteryParams,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            draw_time: "16:00".to_string(),
            timezone: "America/New_York".to_string(),
            params: LotteryParams::default(),
        }
    }
}

impl LotteryConfig {
    pub fn draw_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.draw_time.trim(), "%H:%M")
            .map_err(|e| Error::Config(format!("lottery.draw_time '{}': {}", self.draw_time, e)))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("lottery.timezone '{}': {}", self.timezone, e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Chat channel announcements are posted to
    pub channel: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel: "bot-output".to_string(),
        }
    }
}

impl Config {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `$BEANED_CONFIG`, then the default locations.
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            match Self::load(Path::new(&path)) {
                Ok(cfg) => {
                    tracing::info!("📋 Loaded config from {}", path);
                    return cfg;
                }
                Err(e) => tracing::warn!("⚠️ {}={} unusable: {}", CONFIG_ENV, path, e),
            }
        }

        let candidates = [
            "config.toml",
            concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml"),
        ];

        for path in &candidates {
            if let Ok(cfg) = Self::load(Path::new(path)) {
                tracing::info!("📋 Loaded config from {}", path);
                return cfg;
            }
        }

        tracing::warn!("⚠️ No config.toml found, using defaults");
        Self::default()
    }

    /// Reject settings the economy cannot run with.
    pub fn validate(&self) -> Result<()> {
        let mut problems = self.market.params.problems();
        problems.extend(self.lottery.params.problems());

        if self.market.update_interval_minutes == 0 {
            problems.push("market.update_interval_minutes must be at least 1".to_string());
        }
        if self.market.seed.is_empty() {
            problems.push("market.seed must list at least one instrument".to_string());
        }
        if let Some((symbol, _)) = self
            .market
            .seed
            .iter()
            .find(|(_, price)| *price < self.market.params.price_floor)
        {
            problems.push(format!("market.seed price of {symbol} is below the price floor"));
        }
        if let Err(e) = self.lottery.draw_time() {
            problems.push(e.to_string());
        }
        if let Err(e) = self.lottery.timezone() {
            problems.push(e.to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }

    /// Filter to swap in once the config is loaded. `RUST_LOG` always wins,
    /// and the startup default needs no swap.
    pub fn log_filter_override(&self, rust_log_set: bool) -> Option<&str> {
        let level = self.app.log_level.trim();
        if rust_log_set || level.is_empty() || level == DEFAULT_LOG_FILTER {
            None
        } else {
            Some(level)
        }
    }

    pub fn economy_settings(&self) -> EconomySettings {
        EconomySettings {
            market: self.market.params.clone(),
            lottery: self.lottery.params.clone(),
            history_retention: self.market.history_retention,
            history_view: self.market.history_view,
        }
    }

    pub fn store_seeds(&self) -> StoreSeeds {
        StoreSeeds {
            instruments: self.market.seed.clone(),
            initial_jackpot: self.lottery.params.initial_jackpot,
        }
    }
}
