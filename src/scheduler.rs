//! Wall-clock loops driving the market cycle and the daily draw.
//!
//! Both loops exit when the shutdown flag flips to `true`.

use chrono::{DateTime, Duration as TimeDelta, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::core::{EconomyStore, Notifier};
use crate::dice::Dice;
use crate::engine::Economy;

/// Update prices every `every`, starting immediately.
pub async fn run_market_loop<S, D>(
    economy: Arc<Economy<S, D>>,
    notifier: Arc<dyn Notifier>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) where
    S: EconomyStore,
    D: Dice + Send,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!("⏳ Market loop running every {:?}", every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        match economy.update_prices() {
            Ok(report) => {
                if let Err(e) = notifier.market_updated(&report).await {
                    tracing::error!("Failed to announce market update: {}", e);
                }
            }
            Err(e) => tracing::error!("Market update failed: {}", e),
        }
    }
    tracing::info!("Market loop stopped");
}

/// Draw the lottery once a day at `draw_time` local time in `tz`.
pub async fn run_lottery_loop<S, D>(
    economy: Arc<Economy<S, D>>,
    notifier: Arc<dyn Notifier>,
    draw_time: NaiveTime,
    tz: Tz,
    mut shutdown: watch::Receiver<bool>,
) where
    S: EconomyStore,
    D: Dice + Send,
{
    loop {
        let now = Utc::now();
        let Some(next) = next_draw_at(now, draw_time, tz) else {
            tracing::error!("No representable draw time after {}; lottery loop stopping", now);
            break;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!(
            "🎰 Next lottery draw at {} ({})",
            next.with_timezone(&tz).format("%Y-%m-%d %H:%M %Z"),
            next
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        match economy.draw_lottery() {
            Ok(outcome) => {
                if let Err(e) = notifier.lottery_drawn(&outcome).await {
                    tracing::error!("Failed to announce lottery draw: {}", e);
                }
            }
            Err(e) => tracing::error!("Lottery draw failed: {}", e),
        }
    }
    tracing::info!("Lottery loop stopped");
}

/// First instant strictly after `now` whose local time in `tz` is `at`.
///
/// A time skipped by a DST jump fires an hour later; a repeated time
/// fires on its first occurrence.
pub fn next_draw_at(now: DateTime<Utc>, at: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    let mut date = now.with_timezone(&tz).date_naive();
    // two iterations suffice; the third covers a skipped local day
    for _ in 0..3 {
        if let Some(instant) = local_instant(tz, date, at) {
            if instant > now {
                return Some(instant);
            }
        }
        date = date.succ_opt()?;
    }
    None
}

fn local_instant(tz: Tz, date: NaiveDate, at: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(at);
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + TimeDelta::hours(1))).earliest())
        .map(|instant| instant.with_timezone(&Utc))
}
