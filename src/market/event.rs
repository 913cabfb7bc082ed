//! Market event regime - Rally / Crash lasting a few update cycles.

use serde::{Deserialize, Serialize};

use crate::dice::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Rally,
    Crash,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Rally => write!(f, "RALLY"),
            EventKind::Crash => write!(f, "CRASH"),
        }
    }
}

/// The active regime. `remaining_cycles` is always at least 1 while the
/// event exists; [`MarketEvent::tick`] consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub kind: EventKind,
    pub remaining_cycles: u32,
}

impl MarketEvent {
    pub fn new(kind: EventKind, remaining_cycles: u32) -> Self {
        Self {
            kind,
            remaining_cycles: remaining_cycles.max(1),
        }
    }

    /// Consume one cycle. Returns `None` once the event has run out.
    pub fn tick(self) -> Option<Self> {
        match self.remaining_cycles.saturating_sub(1) {
            0 => None,
            remaining_cycles => Some(Self {
                kind: self.kind,
                remaining_cycles,
            }),
        }
    }
}

impl std::fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} cycles left)", self.kind, self.remaining_cycles)
    }
}

/// Relative weights of the outcomes rolled when no event is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventWeights {
    pub none: f64,
    pub rally: f64,
    pub crash: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            none: 0.90,
            rally: 0.05,
            crash: 0.05,
        }
    }
}

impl EventWeights {
    pub fn total(&self) -> f64 {
        self.none + self.rally + self.crash
    }

    /// Cumulative weighted draw; a drawn event lasts a uniform number of
    /// cycles in `[min_cycles, max_cycles]`.
    pub fn roll<D: Dice + ?Sized>(
        &self,
        dice: &mut D,
        min_cycles: u32,
        max_cycles: u32,
    ) -> Option<MarketEvent> {
        let r = dice.unit() * self.total();
        let kind = if r < self.none {
            return None;
        } else if r < self.none + self.rally {
            EventKind::Rally
        } else {
            EventKind::Crash
        };
        let cycles = dice.roll(min_cycles, max_cycles);
        Some(MarketEvent::new(kind, cycles))
    }
}
