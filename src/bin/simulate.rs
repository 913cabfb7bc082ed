//! Offline market run: `simulate [cycles] [seed]`.
//!
//! Drives the configured market through an in-memory store with a fixed
//! seed and prints per-symbol statistics.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use beaned_bucks::Config;
use beaned_bucks::core::Symbol;
use beaned_bucks::dice::RandomDice;
use beaned_bucks::engine::Economy;
use beaned_bucks::market::EventKind;
use beaned_bucks::storage::MemoryStore;

struct SymbolStats {
    start: Decimal,
    last: Decimal,
    low: Decimal,
    high: Decimal,
    sum: Decimal,
    floor_hits: usize,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let cycles: usize = args.next().map(|a| a.parse()).transpose()?.unwrap_or(500);
    let seed: u64 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(42);

    let config = Config::load_default();
    config.validate()?;
    let floor = config.market.params.price_floor;
    let step = chrono::Duration::minutes(config.market.update_interval_minutes as i64);

    let economy = Economy::new(
        MemoryStore::new(config.store_seeds()),
        RandomDice::seeded(seed),
        config.economy_settings(),
    );

    let mut stats: BTreeMap<Symbol, SymbolStats> = economy
        .prices()
        .iter()
        .map(|(symbol, price)| {
            (
                symbol.clone(),
                SymbolStats {
                    start: price,
                    last: price,
                    low: price,
                    high: price,
                    sum: Decimal::ZERO,
                    floor_hits: 0,
                },
            )
        })
        .collect();
    let mut events: BTreeMap<String, usize> = BTreeMap::new();
    let mut event_cycles = 0usize;

    let start = Utc::now();
    for cycle in 0..cycles {
        let report = economy.update_prices_at(start + step * cycle as i32)?;
        if let Some(event) = report.driving_event {
            event_cycles += 1;
            if report.event_started {
                *events.entry(event.kind.to_string()).or_default() += 1;
            }
        }
        for (symbol, change) in &report.changes {
            if let Some(s) = stats.get_mut(symbol) {
                s.last = change.new;
                s.low = s.low.min(change.new);
                s.high = s.high.max(change.new);
                s.sum += change.new;
                if change.new <= floor {
                    s.floor_hits += 1;
                }
            }
        }
    }

    println!("==================================================");
    println!("📈 Beaned Bucks market simulation: {} cycles, seed {}", cycles, seed);
    println!("==================================================");
    for (symbol, s) in &stats {
        let mean = if cycles > 0 {
            s.sum / Decimal::from(cycles)
        } else {
            s.start
        };
        println!(
            "{:<12} start {:>10.2}  end {:>10.2}  low {:>10.2}  high {:>10.2}  mean {:>10.2}  at floor {}",
            symbol.as_str(), s.start, s.last, s.low, s.high, mean, s.floor_hits
        );
    }
    println!("--------------------------------------------------");
    for kind in [EventKind::Rally, EventKind::Crash] {
        let key = kind.to_string();
        println!("{:<6} events: {}", key, events.get(&key).copied().unwrap_or(0));
    }
    println!("Cycles under an event: {}", event_cycles);
    Ok(())
}
