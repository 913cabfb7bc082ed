//! Lottery pool: ticket sales into a shared jackpot and the daily draw.

pub mod draw;
pub mod ticket;

pub use draw::{DrawOutcome, LotteryParams, WinningTicket, buy_ticket, draw, settle};
pub use ticket::{LotteryTicket, TicketRules, parse_numbers};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn default_jackpot() -> Decimal {
    Decimal::from(100_000)
}

/// The lottery store: `{"Jackpot": ..., "Tickets": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryPool {
    #[serde(rename = "Jackpot", default = "default_jackpot")]
    pub jackpot: Decimal,
    #[serde(rename = "Tickets", default)]
    pub tickets: Vec<LotteryTicket>,
}

impl LotteryPool {
    pub fn with_jackpot(jackpot: Decimal) -> Self {
        Self {
            jackpot,
            tickets: vec![],
        }
    }

    pub fn tickets_for<'a>(
        &'a self,
        user: &'a crate::core::UserId,
    ) -> impl Iterator<Item = &'a LotteryTicket> + 'a {
        self.tickets.iter().filter(move |t| &t.user_id == user)
    }
}

impl Default for LotteryPool {
    fn default() -> Self {
        Self::with_jackpot(default_jackpot())
    }
}
