//! Periodic price-update algorithm.
//!
//! One call to [`MarketEngine::update`] is one market cycle: roll a new
//! event if none is active, walk every instrument, then consume one cycle
//! of the event. The active event is threaded in and out explicitly; the
//! engine itself keeps no state between calls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{Symbol, decimal_from_f64, round_cents};
use crate::dice::Dice;
use crate::market::event::{EventKind, EventWeights, MarketEvent};
use crate::market::Instruments;

/// Closed interval `[low, high]`, written `[low, high]` in config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band(pub f64, pub f64);

impl Band {
    pub fn low(&self) -> f64 {
        self.0
    }

    pub fn high(&self) -> f64 {
        self.1
    }

    fn draw<D: Dice + ?Sized>(&self, dice: &mut D) -> f64 {
        dice.uniform(self.0, self.1)
    }
}

/// Tunables of the price walk. Defaults reproduce the live bot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    pub event_weights: EventWeights,
    pub min_event_cycles: u32,
    pub max_event_cycles: u32,
    /// Chance of a big jump per instrument when no event is active
    pub jump_chance: f64,
    pub jump_band: Band,
    /// Ordinary per-cycle move, sign by coin flip
    pub step_band: Band,
    /// Chance an event pushes an instrument in its own direction
    pub event_bias_chance: f64,
    pub event_step_band: Band,
    pub price_floor: Decimal,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            event_weights: EventWeights::default(),
            min_event_cycles: 1,
            max_event_cycles: 3,
            jump_chance: 0.01,
            jump_band: Band(0.5, 0.95),
            step_band: Band(0.005, 0.05),
            event_bias_chance: 0.70,
            event_step_band: Band(0.10, 0.20),
            price_floor: Decimal::new(1, 2),
        }
    }
}

impl MarketParams {
    /// Reasons these parameters cannot drive a market, if any.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = vec![];
        let w = &self.event_weights;
        if w.none < 0.0 || w.rally < 0.0 || w.crash < 0.0 || w.total() <= 0.0 {
            problems.push("event weights must be non-negative with a positive total".to_string());
        }
        if self.min_event_cycles == 0 || self.min_event_cycles > self.max_event_cycles {
            problems.push(format!(
                "event cycles must satisfy 1 <= min ({}) <= max ({})",
                self.min_event_cycles, self.max_event_cycles
            ));
        }
        for (name, p) in [
            ("jump_chance", self.jump_chance),
            ("event_bias_chance", self.event_bias_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                problems.push(format!("{name} must be within [0, 1], got {p}"));
            }
        }
        for (name, band) in [
            ("jump_band", self.jump_band),
            ("step_band", self.step_band),
            ("event_step_band", self.event_step_band),
        ] {
            if band.low() < 0.0 || band.low() > band.high() {
                problems.push(format!("{name} must satisfy 0 <= low <= high, got {band:?}"));
            }
        }
        if self.price_floor <= Decimal::ZERO {
            problems.push("price_floor must be positive".to_string());
        }
        problems
    }
}

/// One instrument's move in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub old: Decimal,
    pub new: Decimal,
    pub abs_delta: Decimal,
    pub pct_delta: Decimal,
}

impl PriceChange {
    pub fn between(old: Decimal, new: Decimal) -> Self {
        let abs_delta = round_cents(new - old);
        let pct_delta = if old.is_zero() {
            Decimal::ZERO
        } else {
            round_cents((new - old) / old * Decimal::ONE_HUNDRED)
        };
        Self {
            old,
            new,
            abs_delta,
            pct_delta,
        }
    }
}

/// Result of one cycle, for the caller to persist and announce.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub instruments: Instruments,
    pub changes: BTreeMap<Symbol, PriceChange>,
    /// Event that shaped this cycle, as it was before being consumed
    pub driving_event: Option<MarketEvent>,
    /// True when `driving_event` was rolled this cycle
    pub event_started: bool,
    /// What the caller carries into the next cycle
    pub next_event: Option<MarketEvent>,
}

#[derive(Debug, Clone, Default)]
pub struct MarketEngine {
    params: MarketParams,
}

impl MarketEngine {
    pub fn new(params: MarketParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    pub fn update<D: Dice + ?Sized>(
        &self,
        instruments: &Instruments,
        active_event: Option<MarketEvent>,
        dice: &mut D,
    ) -> CycleOutcome {
        let (driving_event, event_started) = match active_event {
            Some(event) => (Some(event), false),
            None => {
                let rolled = self.params.event_weights.roll(
                    dice,
                    self.params.min_event_cycles,
                    self.params.max_event_cycles,
                );
                (rolled, rolled.is_some())
            }
        };

        match (&driving_event, event_started) {
            (Some(event), true) => tracing::info!("📣 Market event started: {}", event),
            (Some(event), false) => tracing::debug!("Market event continues: {}", event),
            (None, _) => tracing::debug!("No market event this cycle"),
        }

        let kind = driving_event.map(|event| event.kind);
        let mut next = Instruments::default();
        let mut changes = BTreeMap::new();

        for (symbol, old) in instruments.iter() {
            let new = self.next_price(old, kind, dice);
            next.insert(symbol.clone(), new);
            changes.insert(symbol.clone(), PriceChange::between(old, new));
        }

        let next_event = driving_event.and_then(MarketEvent::tick);
        if driving_event.is_some() && next_event.is_none() {
            tracing::info!("Market event ended");
        }

        CycleOutcome {
            instruments: next,
            changes,
            driving_event,
            event_started,
            next_event,
        }
    }

    /// Walk one price: multiply by the drawn factor, round to cents and
    /// hold it at or above the floor.
    fn next_price<D: Dice + ?Sized>(
        &self,
        price: Decimal,
        kind: Option<EventKind>,
        dice: &mut D,
    ) -> Decimal {
        let factor = Decimal::ONE + decimal_from_f64(self.draw_move(kind, dice));
        let moved = match price.checked_mul(factor) {
            Some(moved) => moved,
            None => {
                tracing::warn!("Price {} overflowed on factor {}, holding", price, factor);
                price
            }
        };
        round_cents(moved).max(self.params.price_floor)
    }

    /// Signed fractional move for one instrument.
    fn draw_move<D: Dice + ?Sized>(&self, kind: Option<EventKind>, dice: &mut D) -> f64 {
        let p = &self.params;
        match kind {
            Some(EventKind::Rally) if dice.chance(p.event_bias_chance) => {
                p.event_step_band.draw(dice)
            }
            Some(EventKind::Crash) if dice.chance(p.event_bias_chance) => {
                -p.event_step_band.draw(dice)
            }
            Some(_) => self.normal_step(dice),
            None if dice.chance(p.jump_chance) => {
                let magnitude = p.jump_band.draw(dice);
                if dice.coin() { magnitude } else { -magnitude }
            }
            None => self.normal_step(dice),
        }
    }

    fn normal_step<D: Dice + ?Sized>(&self, dice: &mut D) -> f64 {
        let pct = self.params.step_band.draw(dice);
        if dice.coin() { pct } else { -pct }
    }
}
