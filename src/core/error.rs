//! Error handling - Hierarchical errors for the economy core

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Economy error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown instrument symbol
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Investment amount is non-numeric or not positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Balance does not cover the spend
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: Decimal, required: Decimal },

    /// Selling a symbol that is not in the portfolio
    #[error("Not owned: no shares of {0}")]
    NotOwned(String),

    /// Selling more shares than are held
    #[error("Insufficient shares: held {held}, requested {requested}")]
    InsufficientShares { held: Decimal, requested: Decimal },

    /// Share quantity is non-numeric or not positive
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Wrong count, duplicate or out-of-range lottery numbers
    #[error("Malformed ticket: {0}")]
    MalformedTicket(String),

    /// A store file could not be read or had the wrong shape
    #[error("Persistence corrupt ({store}): {reason}")]
    PersistenceCorrupt { store: String, reason: String },

    /// Store file read or write failed
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    /// A store document could not be encoded
    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Settings the economy cannot run with
    #[error("Config: {0}")]
    Config(String),

    /// The notification sink went away
    #[error("Notifier: {0}")]
    Notify(String),
}

impl Error {
    /// Domain validation failures, surfaced to the user as a rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidSymbol(_)
                | Error::InvalidAmount(_)
                | Error::InsufficientFunds { .. }
                | Error::NotOwned(_)
                | Error::InsufficientShares { .. }
                | Error::InvalidQuantity(_)
                | Error::MalformedTicket(_)
        )
    }
}
