//! Significance tracking and alert debounce
//!
//! A symbol alerts when its RSI or price change is extreme and its volume
//! clears the threshold, unless it is already in the significant set. The set
//! is cleared at the start of every cycle, so the debounce window is one poll
//! interval: a symbol that stays extreme alerts once per cycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use tracing::debug;

use crate::config::SurveillanceConfig;
use crate::types::{AlertEvent, Exchange};

#[derive(Debug, Clone, PartialEq)]
pub struct SignificanceThresholds {
    pub mooning: f64,
    pub free_fall: f64,
    pub over_bought: u8,
    pub over_sold: u8,
    pub volume_threshold: Decimal,
}

impl SignificanceThresholds {
    pub fn from_config(config: &SurveillanceConfig) -> Self {
        Self {
            mooning: config.mooning,
            free_fall: config.free_fall,
            over_bought: config.over_bought,
            over_sold: config.over_sold,
            volume_threshold: config.vol_threshold,
        }
    }

    /// A missing reading (short history) is never significant
    pub fn rsi_significant(&self, rsi: Option<u8>) -> bool {
        rsi.map_or(false, |rsi| rsi >= self.over_bought || rsi <= self.over_sold)
    }

    pub fn change_significant(&self, percent_change: f64) -> bool {
        percent_change >= self.mooning || percent_change <= self.free_fall
    }

    pub fn volume_ok(&self, volume: Option<Decimal>) -> bool {
        volume.map_or(false, |volume| volume > self.volume_threshold)
    }
}

/// Everything known about one symbol in the current cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolReading {
    pub symbol: String,
    pub percent_change: f64,
    pub rsi: Option<u8>,
    pub volume: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SignificanceTracker {
    exchange: Exchange,
    thresholds: SignificanceThresholds,
    significant: HashSet<String>,
}

impl SignificanceTracker {
    pub fn new(exchange: Exchange, thresholds: SignificanceThresholds) -> Self {
        Self {
            exchange,
            thresholds,
            significant: HashSet::new(),
        }
    }

    pub fn thresholds(&self) -> &SignificanceThresholds {
        &self.thresholds
    }

    /// Forget every flagged symbol; called once at the start of each cycle
    pub fn begin_cycle(&mut self) {
        self.significant.clear();
    }

    pub fn is_significant(&self, symbol: &str) -> bool {
        self.significant.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.significant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.significant.is_empty()
    }

    /// Decide whether `reading` raises an alert, updating the set
    pub fn evaluate(&mut self, reading: &SymbolReading) -> Option<AlertEvent> {
        let rsi_significant = self.thresholds.rsi_significant(reading.rsi);
        let change_significant = self.thresholds.change_significant(reading.percent_change);
        let volume_ok = self.thresholds.volume_ok(reading.volume);

        if !((rsi_significant || change_significant) && volume_ok) {
            if self.significant.remove(&reading.symbol) {
                debug!(symbol = %reading.symbol, "No longer significant, removing");
            }
            return None;
        }

        if !self.significant.insert(reading.symbol.clone()) {
            debug!(symbol = %reading.symbol, "Already significant, suppressing alert");
            return None;
        }

        Some(AlertEvent {
            symbol: reading.symbol.clone(),
            exchange: self.exchange,
            percent_change: reading.percent_change,
            rsi: reading.rsi,
            volume: reading.volume.unwrap_or_default(),
            change_significant,
            rsi_significant,
            observed_at: reading.observed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tracker() -> SignificanceTracker {
        SignificanceTracker::new(
            Exchange::Binance,
            SignificanceThresholds {
                mooning: 4.0,
                free_fall: -10.0,
                over_bought: 70,
                over_sold: 30,
                volume_threshold: dec!(100),
            },
        )
    }

    fn reading(percent_change: f64, rsi: Option<u8>, volume: Decimal) -> SymbolReading {
        SymbolReading {
            symbol: "ETHBTC".to_string(),
            percent_change,
            rsi,
            volume: Some(volume),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn price_jump_raises_change_alert() {
        let mut tracker = tracker();

        let alert = tracker.evaluate(&reading(5.0, Some(50), dec!(500))).unwrap();

        assert!(alert.change_significant);
        assert!(!alert.rsi_significant);
        assert_eq!(alert.percent_change, 5.0);
        assert!(tracker.is_significant("ETHBTC"));
    }

    #[test]
    fn thresholds_are_inclusive() {
        let mut tracker = tracker();
        assert!(tracker.evaluate(&reading(4.0, Some(50), dec!(500))).is_some());

        tracker.begin_cycle();
        assert!(tracker.evaluate(&reading(-10.0, Some(50), dec!(500))).is_some());

        tracker.begin_cycle();
        let alert = tracker.evaluate(&reading(0.0, Some(30), dec!(500))).unwrap();
        assert!(alert.rsi_significant);

        tracker.begin_cycle();
        let alert = tracker.evaluate(&reading(0.0, Some(70), dec!(500))).unwrap();
        assert!(alert.rsi_significant);
    }

    #[test]
    fn neutral_reading_raises_nothing() {
        let mut tracker = tracker();

        assert!(tracker.evaluate(&reading(0.0, Some(40), dec!(500))).is_none());
        assert!(!tracker.is_significant("ETHBTC"));
    }

    #[test]
    fn missing_rsi_is_not_oversold() {
        let mut tracker = tracker();

        assert!(tracker.evaluate(&reading(0.0, None, dec!(500))).is_none());
    }

    #[test]
    fn low_volume_suppresses_alert() {
        let mut tracker = tracker();

        assert!(tracker.evaluate(&reading(25.0, Some(90), dec!(100))).is_none());
        assert!(tracker.is_empty());
    }

    #[test]
    fn repeated_reading_within_cycle_is_debounced() {
        let mut tracker = tracker();
        let extreme = reading(12.0, Some(85), dec!(500));

        assert!(tracker.evaluate(&extreme).is_some());
        assert!(tracker.evaluate(&extreme).is_none());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn exit_removes_silently_and_reentry_alerts_again() {
        let mut tracker = tracker();

        assert!(tracker.evaluate(&reading(12.0, Some(85), dec!(500))).is_some());
        assert!(tracker.evaluate(&reading(0.5, Some(55), dec!(500))).is_none());
        assert!(!tracker.is_significant("ETHBTC"));
        assert!(tracker.evaluate(&reading(12.0, Some(85), dec!(500))).is_some());
    }

    #[test]
    fn per_cycle_reset_alerts_every_cycle() {
        let mut tracker = tracker();
        let extreme = reading(0.0, Some(95), dec!(500));

        let alerts = (0..5)
            .filter(|_| {
                tracker.begin_cycle();
                tracker.evaluate(&extreme).is_some()
            })
            .count();

        assert_eq!(alerts, 5);
    }
}
