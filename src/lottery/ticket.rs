//! Lottery tickets and their validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::{Error, Result, UserId};

/// Shape of a valid ticket: `picks` unique numbers from `1..=max_number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRules {
    pub picks: usize,
    pub max_number: u32,
}

impl Default for TicketRules {
    fn default() -> Self {
        Self {
            picks: 5,
            max_number: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryTicket {
    pub user_id: UserId,
    /// Sorted ascending when issued. Tickets read back from the store are
    /// not re-validated; a malformed one simply never wins.
    pub numbers: Vec<u32>,
}

impl LotteryTicket {
    pub fn new(user_id: UserId, mut numbers: Vec<u32>, rules: &TicketRules) -> Result<Self> {
        if numbers.len() != rules.picks {
            return Err(Error::MalformedTicket(format!(
                "expected {} numbers, got {}",
                rules.picks,
                numbers.len()
            )));
        }
        if let Some(out) = numbers.iter().find(|n| !(1..=rules.max_number).contains(*n)) {
            return Err(Error::MalformedTicket(format!(
                "{} is outside 1..={}",
                out, rules.max_number
            )));
        }
        numbers.sort_unstable();
        if numbers.windows(2).any(|pair| pair[0] == pair[1]) {
            return Err(Error::MalformedTicket("numbers must be unique".to_string()));
        }
        Ok(Self { user_id, numbers })
    }

    pub fn is_well_formed(&self, rules: &TicketRules) -> bool {
        let unique: BTreeSet<u32> = self.numbers.iter().copied().collect();
        unique.len() == rules.picks
            && self.numbers.len() == rules.picks
            && unique.iter().all(|n| (1..=rules.max_number).contains(n))
    }

    /// Numbers shared with the draw; 0 for malformed tickets.
    pub fn matches(&self, drawn: &BTreeSet<u32>, rules: &TicketRules) -> usize {
        if !self.is_well_formed(rules) {
            return 0;
        }
        self.numbers.iter().filter(|n| drawn.contains(*n)).count()
    }
}

/// Parse "4 8 15 16 23" or "4,8,15,16,23".
pub fn parse_numbers(input: &str) -> Result<Vec<u32>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u32>()
                .map_err(|_| Error::MalformedTicket(format!("'{part}' is not a number")))
        })
        .collect()
}
