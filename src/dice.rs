//! Randomness source for the market walk and the lottery draw.
//!
//! Every probability draw in the crate goes through [`Dice`], so a host can
//! run on entropy in production and on a seeded or scripted source when it
//! needs reproducible cycles.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait Dice {
    /// Uniform draw from `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform draw from `[low, high]`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.unit()
    }

    /// `true` with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.unit() < probability
    }

    /// Fair coin: `true` means heads.
    fn coin(&mut self) -> bool {
        self.chance(0.5)
    }

    /// Uniform integer from `[low, high]`.
    fn roll(&mut self, low: u32, high: u32) -> u32;

    /// `amount` distinct integers from `[low, high]`, in draw order.
    fn sample_distinct(&mut self, low: u32, high: u32, amount: usize) -> Vec<u32>;
}

/// [`Dice`] backed by any `rand` generator.
pub struct RandomDice<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomDice<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDice<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Dice for RandomDice<R> {
    fn unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn roll(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng.gen_range(low..=high)
    }

    fn sample_distinct(&mut self, low: u32, high: u32, amount: usize) -> Vec<u32> {
        let span = high.saturating_sub(low) as usize + 1;
        rand::seq::index::sample(&mut self.rng, span, amount.min(span))
            .into_iter()
            .map(|offset| low + offset as u32)
            .collect()
    }
}

/// Replays pre-recorded draws in order.
///
/// `uniform` consumes its own queue of already-scaled values, so a replay
/// can state "the step was exactly 2%" without reverse-engineering the
/// unit draw. Exhausted queues fall back to the midpoint / low bound.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDice {
    units: VecDeque<f64>,
    uniforms: VecDeque<f64>,
    rolls: VecDeque<u32>,
    samples: VecDeque<Vec<u32>>,
}

impl ScriptedDice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(values);
        self
    }

    pub fn uniforms(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.uniforms.extend(values);
        self
    }

    pub fn rolls(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.rolls.extend(values);
        self
    }

    pub fn sample(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.samples.push_back(values.into_iter().collect());
        self
    }

    /// True once every queued draw has been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.units.is_empty()
            && self.uniforms.is_empty()
            && self.rolls.is_empty()
            && self.samples.is_empty()
    }
}

impl Dice for ScriptedDice {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.5)
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.uniforms
            .pop_front()
            .unwrap_or((low + high) / 2.0)
            .clamp(low, high)
    }

    fn roll(&mut self, low: u32, high: u32) -> u32 {
        self.rolls.pop_front().unwrap_or(low).clamp(low, high)
    }

    fn sample_distinct(&mut self, low: u32, high: u32, amount: usize) -> Vec<u32> {
        match self.samples.pop_front() {
            Some(values) => values,
            None => (low..=high).take(amount).collect(),
        }
    }
}
