use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use beaned_bucks::Config;
use beaned_bucks::config::DEFAULT_LOG_FILTER;
use beaned_bucks::core::Notifier;
use beaned_bucks::dice::RandomDice;
use beaned_bucks::engine::Economy;
use beaned_bucks::notify::LogNotifier;
use beaned_bucks::scheduler::{run_lottery_loop, run_market_loop};
use beaned_bucks::storage::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // 1. Logger first so config loading is visible
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_set = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .with_filter_reloading();
    let filter_handle = builder.reload_handle();
    builder.init();

    let config = Config::load_default();

    if let Some(level) = config.log_filter_override(env_set) {
        match EnvFilter::try_new(level) {
            Ok(filter) => {
                filter_handle.reload(filter)?;
                tracing::debug!("Log filter set to {}", level);
            }
            Err(e) => tracing::warn!("⚠️ Ignoring app.log_level '{}': {}", level, e),
        }
    }

    tracing::info!("🫘 Beaned Bucks economy starting...");
    config.validate()?;

    let draw_time = config.lottery.draw_time()?;
    let tz = config.lottery.timezone()?;

    // 2. Stores and the serialized service
    let store = FileStore::open(&config.app.data_dir, config.store_seeds());
    let economy = Arc::new(Economy::new(
        store,
        RandomDice::from_entropy(),
        config.economy_settings(),
    ));
    tracing::info!(
        "📁 Data in {} | {} instruments | jackpot {}",
        config.app.data_dir.display(),
        economy.prices().len(),
        economy.jackpot()
    );

    // 3. Schedulers
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier::new(&config.notifications.channel));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let market = tokio::spawn(run_market_loop(
        economy.clone(),
        notifier.clone(),
        config.market.update_interval(),
        shutdown_rx.clone(),
    ));
    let lottery = tokio::spawn(run_lottery_loop(
        economy.clone(),
        notifier,
        draw_time,
        tz,
        shutdown_rx,
    ));

    tracing::info!("✅ Beaned Bucks economy is running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutting down...");
    shutdown_tx.send(true)?;
    market.await?;
    lottery.await?;

    Ok(())
}
