//! Per-symbol price history log with a bounded retention window.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::core::Symbol;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

/// Accepts RFC 3339 and the zone-less ISO form older stores were written
/// with (read as UTC).
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// `symbol -> [{timestamp, price}]`, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory(BTreeMap<Symbol, VecDeque<PricePoint>>);

impl PriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one point. With `retention > 0` the series is trimmed to the
    /// newest `retention` points.
    pub fn record(&mut self, symbol: &Symbol, point: PricePoint, retention: usize) {
        let series = self.0.entry(symbol.clone()).or_default();
        series.push_back(point);
        if retention > 0 {
            while series.len() > retention {
                series.pop_front();
            }
        }
    }

    /// Newest `count` points for `symbol`, oldest first.
    pub fn recent(&self, symbol: &Symbol, count: usize) -> Vec<PricePoint> {
        self.0
            .get(symbol)
            .map(|series| {
                let skip = series.len().saturating_sub(count);
                series.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self, symbol: &Symbol) -> usize {
        self.0.get(symbol).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(VecDeque::is_empty)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.0.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(price: i64) -> PricePoint {
        PricePoint {
            timestamp: Utc::now(),
            price: Decimal::from(price),
        }
    }

    #[test]
    fn test_retention_window() {
        let ink = Symbol::new("INK");
        let mut history = PriceHistory::new();
        for price in 1..=5 {
            history.record(&ink, point(price), 3);
        }
        assert_eq!(history.len(&ink), 3);
        let prices: Vec<_> = history.recent(&ink, 10).iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![Decimal::from(3), Decimal::from(4), Decimal::from(5)]);
    }

    #[test]
    fn test_unbounded_when_zero() {
        let ink = Symbol::new("INK");
        let mut history = PriceHistory::new();
        for price in 1..=50 {
            history.record(&ink, point(price), 0);
        }
        assert_eq!(history.len(&ink), 50);
        assert_eq!(history.recent(&ink, 2)[1].price, Decimal::from(50));
        assert!(history.recent(&Symbol::new("NOPE"), 10).is_empty());
    }

    #[test]
    fn test_reads_legacy_timestamps() {
        let json = r#"{"INK": [
            {"timestamp": "2025-03-01T16:20:00.123456", "price": 301.5},
            {"timestamp": "2025-03-01T16:40:00+00:00", "price": 299.0}
        ]}"#;
        let history: PriceHistory = serde_json::from_str(json).unwrap();
        let points = history.recent(&Symbol::new("INK"), 10);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].price, Decimal::new(3015, 1));
        assert!(points[0].timestamp < points[1].timestamp);
    }
}
