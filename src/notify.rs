//! Notification sinks for market and lottery announcements.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{Error, Notifier, Result};
use crate::lottery::DrawOutcome;
use crate::market::MarketReport;

/// Writes every announcement to the log.
pub struct LogNotifier {
    channel: String,
}

impl LogNotifier {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn market_updated(&self, report: &MarketReport) -> Result<()> {
        tracing::info!("[#{}]\n{}", self.channel, report);
        Ok(())
    }

    async fn lottery_drawn(&self, outcome: &DrawOutcome) -> Result<()> {
        tracing::info!("[#{}] 🎉 Lottery Draw Results 🎉\n{}", self.channel, outcome);
        Ok(())
    }
}

/// An announcement handed to the chat layer.
#[derive(Debug, Clone)]
pub enum Notification {
    Market(MarketReport),
    Lottery(DrawOutcome),
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::Market(report) => write!(f, "{report}"),
            Notification::Lottery(outcome) => write!(f, "{outcome}"),
        }
    }
}

/// Forwards announcements over a bounded channel.
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn send(&self, notification: Notification) -> Result<()> {
        self.tx
            .send(notification)
            .await
            .map_err(|_| Error::Notify("receiver dropped".to_string()))
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn market_updated(&self, report: &MarketReport) -> Result<()> {
        self.send(Notification::Market(report.clone())).await
    }

    async fn lottery_drawn(&self, outcome: &DrawOutcome) -> Result<()> {
        self.send(Notification::Lottery(outcome.clone())).await
    }
}
