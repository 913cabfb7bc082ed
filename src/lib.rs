//! Beaned Bucks - Economy Core
//! Simulated stock market and lottery pool for a chat-bot economy

// Public modules
pub mod config;
pub mod core;
pub mod dice;
pub mod engine;
pub mod ledger;
pub mod lottery;
pub mod market;
pub mod notify;
pub mod scheduler;
pub mod storage;

// Re-exports
pub use config::Config;
pub use core::{Error, Result};
pub use engine::{Economy, EconomySettings};
