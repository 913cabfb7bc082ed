//! Lottery draw and the per-tier payout.
//!
//! Each match tier claims its own fixed fraction of the jackpot and splits
//! it equally among the tickets in that tier. Tiers do not compete, so when
//! several tiers have winners the total can exceed the jackpot; with
//! `clamp_payouts` every payout is scaled down pro-rata instead.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::{Error, Result, UserId, checked_total};
use crate::dice::Dice;
use crate::ledger::UserLedger;
use crate::lottery::{LotteryPool, LotteryTicket, TicketRules};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryParams {
    pub rules: TicketRules,
    pub ticket_price: Decimal,
    /// Jackpot written when the store is first created
    pub initial_jackpot: Decimal,
    /// Added back to the pool after every draw
    pub carry_over: Decimal,
    /// Jackpot fraction per match count; index 0 is one match
    pub tier_fractions: Vec<Decimal>,
    pub clamp_payouts: bool,
}

impl Default for LotteryParams {
    fn default() -> Self {
        Self {
            rules: TicketRules::default(),
            ticket_price: Decimal::from(5_000),
            initial_jackpot: Decimal::from(100_000),
            carry_over: Decimal::from(25_000),
            tier_fractions: vec![
                Decimal::new(20, 2),
                Decimal::new(40, 2),
                Decimal::new(60, 2),
                Decimal::new(80, 2),
                Decimal::ONE,
            ],
            clamp_payouts: false,
        }
    }
}

impl LotteryParams {
    pub fn tier_fraction(&self, matches: usize) -> Decimal {
        match matches {
            0 => Decimal::ZERO,
            m => self.tier_fractions.get(m - 1).copied().unwrap_or(Decimal::ZERO),
        }
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = vec![];
        if self.rules.picks == 0 || self.rules.picks as u32 > self.rules.max_number {
            problems.push(format!(
                "cannot pick {} numbers from 1..={}",
                self.rules.picks, self.rules.max_number
            ));
        }
        if self.tier_fractions.len() != self.rules.picks {
            problems.push(format!(
                "need one tier fraction per match count ({}), got {}",
                self.rules.picks,
                self.tier_fractions.len()
            ));
        }
        if self
            .tier_fractions
            .iter()
            .any(|f| *f < Decimal::ZERO || *f > Decimal::ONE)
        {
            problems.push("tier fractions must be within [0, 1]".to_string());
        }
        if self.ticket_price <= Decimal::ZERO {
            problems.push("ticket_price must be positive".to_string());
        }
        if self.initial_jackpot < Decimal::ZERO || self.carry_over < Decimal::ZERO {
            problems.push("initial_jackpot and carry_over must not be negative".to_string());
        }
        problems
    }
}

/// One winning ticket and what it earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinningTicket {
    pub ticket: LotteryTicket,
    pub matches: usize,
    pub payout: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawOutcome {
    /// In draw order
    pub drawn: Vec<u32>,
    pub winners: Vec<WinningTicket>,
    /// Summed per user
    pub payouts: BTreeMap<UserId, Decimal>,
    pub total_payout: Decimal,
    pub old_jackpot: Decimal,
    pub tickets_played: usize,
    /// Pool after the reset: no tickets, jackpot rolled over
    pub pool: LotteryPool,
}

fn to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Sample the winning numbers and settle the pool against them.
pub fn draw<D: Dice + ?Sized>(pool: &LotteryPool, params: &LotteryParams, dice: &mut D) -> DrawOutcome {
    let drawn = dice.sample_distinct(1, params.rules.max_number, params.rules.picks);
    settle(pool, &drawn, params)
}

/// Settle every outstanding ticket against `drawn` and reset the pool.
pub fn settle(pool: &LotteryPool, drawn: &[u32], params: &LotteryParams) -> DrawOutcome {
    let drawn_set: BTreeSet<u32> = drawn.iter().copied().collect();
    let jackpot = pool.jackpot;

    let mut tiers: BTreeMap<usize, Vec<&LotteryTicket>> = BTreeMap::new();
    for ticket in &pool.tickets {
        let matches = ticket.matches(&drawn_set, &params.rules);
        if params.tier_fraction(matches) > Decimal::ZERO {
            tiers.entry(matches).or_default().push(ticket);
        }
    }

    let mut winners = vec![];
    for (matches, tickets) in &tiers {
        let allocation = params.tier_fraction(*matches) * jackpot;
        let share = to_cents(allocation / Decimal::from(tickets.len()));
        tracing::debug!(
            "Tier {} matches: {} tickets, {} each",
            matches,
            tickets.len(),
            share
        );
        winners.extend(tickets.iter().map(|ticket| WinningTicket {
            ticket: (*ticket).clone(),
            matches: *matches,
            payout: share,
        }));
    }

    let uncapped = winners
        .iter()
        .fold(Decimal::ZERO, |sum, w| sum.saturating_add(w.payout));
    if params.clamp_payouts && uncapped > jackpot && !uncapped.is_zero() {
        let scale = jackpot / uncapped;
        tracing::info!("Payouts {} exceed jackpot {}, scaling by {}", uncapped, jackpot, scale);
        for winner in &mut winners {
            winner.payout = to_cents(winner.payout * scale);
        }
    }

    let mut payouts: BTreeMap<UserId, Decimal> = BTreeMap::new();
    for winner in &winners {
        let owed = payouts.entry(winner.ticket.user_id.clone()).or_insert(Decimal::ZERO);
        *owed = owed.saturating_add(winner.payout);
    }
    let total_payout = payouts
        .values()
        .fold(Decimal::ZERO, |sum, owed| sum.saturating_add(*owed));

    let rolled = jackpot
        .saturating_sub(total_payout)
        .saturating_add(params.carry_over);
    if rolled < Decimal::ZERO {
        tracing::warn!(
            "Payouts {} overdrew jackpot {}; next jackpot floored at 0",
            total_payout,
            jackpot
        );
    }

    DrawOutcome {
        drawn: drawn.to_vec(),
        winners,
        payouts,
        total_payout,
        old_jackpot: jackpot,
        tickets_played: pool.tickets.len(),
        pool: LotteryPool {
            jackpot: rolled.max(Decimal::ZERO),
            tickets: vec![],
        },
    }
}

/// Charge `ledger` for a ticket and add it to the pool.
pub fn buy_ticket(
    ledger: &UserLedger,
    pool: &LotteryPool,
    user: &UserId,
    numbers: Vec<u32>,
    params: &LotteryParams,
) -> Result<(UserLedger, LotteryPool, LotteryTicket)> {
    let ticket = LotteryTicket::new(user.clone(), numbers, &params.rules)?;
    if ledger.balance < params.ticket_price {
        return Err(Error::InsufficientFunds {
            available: ledger.balance,
            required: params.ticket_price,
        });
    }

    let mut next_ledger = ledger.clone();
    next_ledger.balance -= params.ticket_price;

    let mut next_pool = pool.clone();
    next_pool.jackpot = checked_total(pool.jackpot, params.ticket_price)?;
    next_pool.tickets.push(ticket.clone());

    Ok((next_ledger, next_pool, ticket))
}

impl std::fmt::Display for DrawOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let numbers: Vec<String> = self.drawn.iter().map(u32::to_string).collect();
        writeln!(f, "Drawn Numbers: [{}]", numbers.join(", "))?;
        if self.payouts.is_empty() {
            writeln!(f, "No winning tickets this draw.")?;
        }
        for (user, amount) in &self.payouts {
            writeln!(f, "User {} wins {:.2} Beaned Bucks.", user, amount)?;
        }
        write!(f, "Next jackpot: {:.2} Beaned Bucks", self.pool.jackpot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{RandomDice, ScriptedDice};

    fn ticket(user: &str, numbers: [u32; 5]) -> LotteryTicket {
        LotteryTicket::new(UserId::new(user), numbers.to_vec(), &TicketRules::default()).unwrap()
    }

    fn pool(jackpot: i64, tickets: Vec<LotteryTicket>) -> LotteryPool {
        LotteryPool {
            jackpot: Decimal::from(jackpot),
            tickets,
        }
    }

    #[test]
    fn test_single_jackpot_winner() {
        let params = LotteryParams::default();
        let out = settle(&pool(100_000, vec![ticket("u1", [1, 2, 3, 4, 5])]), &[1, 2, 3, 4, 5], &params);
        assert_eq!(out.payouts[&UserId::new("u1")], Decimal::from(100_000));
        assert_eq!(out.total_payout, Decimal::from(100_000));
        assert_eq!(out.pool.jackpot, Decimal::from(25_000));
        assert!(out.pool.tickets.is_empty());
    }

    #[test]
    fn test_tier_split_equally() {
        let params = LotteryParams::default();
        let out = settle(
            &pool(
                100_000,
                vec![
                    ticket("u1", [1, 2, 3, 10, 11]),
                    ticket("u2", [1, 2, 3, 20, 21]),
                ],
            ),
            &[1, 2, 3, 4, 5],
            &params,
        );
        assert_eq!(out.payouts[&UserId::new("u1")], Decimal::from(30_000));
        assert_eq!(out.payouts[&UserId::new("u2")], Decimal::from(30_000));
        assert_eq!(out.pool.jackpot, Decimal::from(65_000));
    }

    #[test]
    fn test_tiers_independent_and_summed_per_user() {
        let params = LotteryParams::default();
        let out = settle(
            &pool(
                100_000,
                vec![
                    ticket("u1", [1, 2, 3, 4, 5]),
                    ticket("u1", [1, 30, 31, 32, 33]),
                    ticket("u2", [40, 41, 42, 43, 44]),
                ],
            ),
            &[1, 2, 3, 4, 5],
            &params,
        );
        // 5-match: 100% of jackpot, 1-match: 20% of jackpot, both to u1
        assert_eq!(out.payouts[&UserId::new("u1")], Decimal::from(120_000));
        assert!(!out.payouts.contains_key(&UserId::new("u2")));
        assert_eq!(out.winners.len(), 2);
        assert_eq!(out.tickets_played, 3);
        // 100k - 120k + 25k
        assert_eq!(out.pool.jackpot, Decimal::from(5_000));
    }

    #[test]
    fn test_jackpot_floored_at_zero() {
        let params = LotteryParams::default();
        let out = settle(
            &pool(
                100_000,
                vec![ticket("u1", [1, 2, 3, 4, 5]), ticket("u2", [1, 2, 3, 4, 6])],
            ),
            &[1, 2, 3, 4, 5],
            &params,
        );
        assert_eq!(out.total_payout, Decimal::from(180_000));
        assert_eq!(out.pool.jackpot, Decimal::ZERO);
    }

    #[test]
    fn test_clamped_payouts() {
        let params = LotteryParams {
            clamp_payouts: true,
            ..LotteryParams::default()
        };
        let out = settle(
            &pool(
                100_000,
                vec![ticket("u1", [1, 2, 3, 4, 5]), ticket("u2", [1, 2, 3, 4, 6])],
            ),
            &[1, 2, 3, 4, 5],
            &params,
        );
        assert!(out.total_payout <= Decimal::from(100_000));
        assert_eq!(out.payouts[&UserId::new("u1")], Decimal::new(5_555_555, 2));
        assert_eq!(out.payouts[&UserId::new("u2")], Decimal::new(4_444_444, 2));
        assert_eq!(out.pool.jackpot, Decimal::from(100_000) - out.total_payout + Decimal::from(25_000));
    }

    #[test]
    fn test_three_way_split_truncates_to_cents() {
        let params = LotteryParams::default();
        let tickets = vec![
            ticket("a", [1, 10, 11, 12, 13]),
            ticket("b", [1, 20, 21, 22, 23]),
            ticket("c", [1, 30, 31, 32, 33]),
        ];
        let out = settle(&pool(100, tickets), &[1, 2, 3, 4, 5], &params);
        // 20% of 100 = 20, split three ways
        assert_eq!(out.payouts[&UserId::new("a")], Decimal::new(666, 2));
        assert!(out.total_payout <= Decimal::from(20));
    }

    #[test]
    fn test_no_winners() {
        let params = LotteryParams::default();
        let out = settle(&pool(100_000, vec![ticket("u1", [50, 51, 52, 53, 54])]), &[1, 2, 3, 4, 5], &params);
        assert!(out.payouts.is_empty());
        assert_eq!(out.pool.jackpot, Decimal::from(125_000));
        assert!(out.to_string().contains("No winning tickets"));
    }

    #[test]
    fn test_draw_samples_valid_numbers() {
        let params = LotteryParams::default();
        let mut dice = RandomDice::seeded(99);
        let out = draw(&pool(100_000, vec![]), &params, &mut dice);
        assert_eq!(out.drawn.len(), 5);
        let unique: BTreeSet<u32> = out.drawn.iter().copied().collect();
        assert_eq!(unique.len(), 5);
        assert!(unique.iter().all(|n| (1..=60).contains(n)));

        let mut scripted = ScriptedDice::new().sample([9, 8, 7, 6, 5]);
        let out = draw(&pool(10, vec![ticket("u1", [5, 6, 7, 8, 9])]), &params, &mut scripted);
        assert_eq!(out.drawn, vec![9, 8, 7, 6, 5]);
        assert_eq!(out.payouts[&UserId::new("u1")], Decimal::from(10));
    }

    #[test]
    fn test_buy_ticket() {
        let params = LotteryParams::default();
        let user = UserId::new("u1");
        let ledger = UserLedger::with_balance(Decimal::from(6_000));
        let (ledger, pool, ticket) =
            buy_ticket(&ledger, &LotteryPool::default(), &user, vec![5, 4, 3, 2, 1], &params).unwrap();
        assert_eq!(ledger.balance, Decimal::from(1_000));
        assert_eq!(pool.jackpot, Decimal::from(105_000));
        assert_eq!(ticket.numbers, vec![1, 2, 3, 4, 5]);
        assert_eq!(pool.tickets, vec![ticket]);

        let err = buy_ticket(&ledger, &pool, &user, vec![1, 2, 3, 4, 5], &params).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));

        let err = buy_ticket(&ledger, &pool, &user, vec![1, 2, 3], &params).unwrap_err();
        assert!(matches!(err, Error::MalformedTicket(_)));
    }

    #[test]
    fn test_buy_ticket_jackpot_overflow_rejected() {
        let params = LotteryParams::default();
        let user = UserId::new("u1");
        let ledger = UserLedger::with_balance(Decimal::from(6_000));
        let full = LotteryPool::with_jackpot(Decimal::MAX);
        let err = buy_ticket(&ledger, &full, &user, vec![1, 2, 3, 4, 5], &params).unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }

    #[test]
    fn test_param_problems() {
        assert!(LotteryParams::default().problems().is_empty());
        let bad = LotteryParams {
            tier_fractions: vec![Decimal::new(15, 1)],
            ticket_price: Decimal::ZERO,
            ..LotteryParams::default()
        };
        assert_eq!(bad.problems().len(), 3);
    }
}
