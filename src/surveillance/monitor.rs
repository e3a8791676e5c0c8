//! Surveillance loop
//!
//! One cycle: fetch snapshot -> diff against baseline -> RSI per symbol ->
//! significance decision -> notify -> replace baseline. Cycles never overlap
//! and a stop request is only observed between two cycles.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::significance::{SignificanceThresholds, SignificanceTracker, SymbolReading};
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::exchange::{ExchangeClient, Venue};
use crate::indicators::{RsiEngine, RsiMode};
use crate::market::{self, MarketSnapshotProvider, SnapshotFilter};
use crate::notifier::{self, Notifier};
use crate::types::{AlertEvent, MarketSnapshot, TickInterval};

/// Read-only knobs of the loop, derived from `AppConfig`
#[derive(Debug, Clone)]
pub struct SurveillanceSettings {
    pub poll_interval: Duration,
    pub rsi_period: usize,
    pub rsi_tick_interval: TickInterval,
    pub rsi_history_limit: usize,
    pub rsi_mode: RsiMode,
    pub quote_asset: String,
    pub update_channel: String,
    pub cycle_header: bool,
    pub thresholds: SignificanceThresholds,
}

impl SurveillanceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let s = &config.surveillance;
        Self {
            poll_interval: Duration::from_secs(s.update_interval_secs),
            rsi_period: s.rsi_time_frame,
            rsi_tick_interval: s.rsi_tick_interval,
            rsi_history_limit: s.rsi_history_limit,
            rsi_mode: s.rsi_mode,
            quote_asset: s.quote_asset.clone(),
            update_channel: s.update_channel.clone(),
            cycle_header: config.notifier.cycle_header,
            thresholds: SignificanceThresholds::from_config(s),
        }
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    /// Symbols compared against the baseline
    pub symbols: usize,
    pub alerts: Vec<AlertEvent>,
    /// The listing was unavailable; baseline kept as is
    pub skipped: bool,
}

pub struct SurveillanceLoop {
    settings: Arc<SurveillanceSettings>,
    client: Arc<ExchangeClient>,
    venue: Arc<dyn Venue>,
    provider: MarketSnapshotProvider,
    rsi: RsiEngine,
    tracker: SignificanceTracker,
    baseline: MarketSnapshot,
    notifier: Arc<dyn Notifier>,
    alerts: broadcast::Sender<AlertEvent>,
}

impl SurveillanceLoop {
    pub fn new(
        settings: Arc<SurveillanceSettings>,
        client: Arc<ExchangeClient>,
        venue: Arc<dyn Venue>,
        notifier: Arc<dyn Notifier>,
        alerts: broadcast::Sender<AlertEvent>,
    ) -> Self {
        let filter = SnapshotFilter {
            quote_asset: settings.quote_asset.clone(),
            volume_threshold: settings.thresholds.volume_threshold,
        };
        let provider = MarketSnapshotProvider::new(client.clone(), venue.clone(), filter);
        let rsi = RsiEngine::new(settings.rsi_period, settings.rsi_mode);
        let tracker = SignificanceTracker::new(venue.exchange(), settings.thresholds.clone());
        let baseline = MarketSnapshot::empty(venue.exchange());

        Self {
            settings,
            client,
            venue,
            provider,
            rsi,
            tracker,
            baseline,
            notifier,
            alerts,
        }
    }

    pub fn baseline(&self) -> &MarketSnapshot {
        &self.baseline
    }

    pub fn tracker(&self) -> &SignificanceTracker {
        &self.tracker
    }

    /// Populate the baseline snapshot; returns the number of watched symbols
    pub async fn load_baseline(&mut self) -> Result<usize, FetchError> {
        match self.provider.snapshot().await? {
            Some(snapshot) => {
                self.baseline = snapshot;
                info!(
                    exchange = %self.venue.exchange(),
                    symbols = self.baseline.len(),
                    "📊 Baseline snapshot loaded"
                );
            }
            None => {
                warn!(
                    exchange = %self.venue.exchange(),
                    "Baseline unavailable, starting from an empty snapshot"
                );
            }
        }
        Ok(self.baseline.len())
    }

    /// Run one full cycle. Only a fatal upstream rejection is an error.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, FetchError> {
        let started_at = Utc::now();
        self.tracker.begin_cycle();

        info!(exchange = %self.venue.exchange(), "🔍 Checking markets");

        let Some(snapshot) = self.provider.snapshot().await? else {
            warn!("Listing unavailable this cycle, keeping previous baseline");
            return Ok(CycleReport {
                started_at,
                symbols: 0,
                alerts: Vec::new(),
                skipped: true,
            });
        };

        let changes = market::diff(&self.baseline, &snapshot);
        let mut alerts = Vec::new();

        for change in &changes {
            let rsi = self.symbol_rsi(&change.symbol).await?;
            let volume = snapshot.get(&change.symbol).and_then(|quote| quote.volume);

            debug!(
                symbol = %change.symbol,
                change = change.percent_change,
                old_price = %change.old_price,
                new_price = %change.new_price,
                rsi = ?rsi,
                "Symbol evaluated"
            );

            let reading = SymbolReading {
                symbol: change.symbol.clone(),
                percent_change: change.percent_change,
                rsi,
                volume,
                observed_at: snapshot.taken_at,
            };
            if let Some(alert) = self.tracker.evaluate(&reading) {
                alerts.push(alert);
            }
        }

        self.publish(started_at, &alerts).await;
        self.baseline = snapshot;

        Ok(CycleReport {
            started_at,
            symbols: changes.len(),
            alerts,
            skipped: false,
        })
    }

    /// Repeat cycles until `stop` flips to true. At least one cycle always runs.
    pub async fn run(
        mut self,
        mut stop: watch::Receiver<bool>,
        cycles: Arc<AtomicU64>,
    ) -> Result<u64, FetchError> {
        let mut completed = 0u64;

        loop {
            let report = self.run_cycle().await?;
            completed += 1;
            cycles.fetch_add(1, Ordering::SeqCst);

            info!(
                cycle = completed,
                symbols = report.symbols,
                alerts = report.alerts.len(),
                skipped = report.skipped,
                "Cycle complete"
            );

            if *stop.borrow_and_update() {
                break;
            }

            debug!(secs = self.settings.poll_interval.as_secs(), "Sleeping until next cycle");
            tokio::select! {
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            if *stop.borrow_and_update() {
                break;
            }
        }

        info!(cycles = completed, "🛑 Surveillance stopped");
        Ok(completed)
    }

    async fn symbol_rsi(&mut self, symbol: &str) -> Result<Option<u8>, FetchError> {
        let url = self.venue.klines_url(
            symbol,
            self.settings.rsi_tick_interval,
            self.settings.rsi_history_limit,
        );

        let Some(body) = self.client.fetch(&url).await? else {
            debug!(symbol = %symbol, "No candle history this cycle");
            return Ok(None);
        };

        let history = self.venue.parse_klines(&body);
        Ok(self.rsi.compute(symbol, &history))
    }

    async fn publish(&self, started_at: DateTime<Utc>, alerts: &[AlertEvent]) {
        let channel = self.settings.update_channel.as_str();

        if self.settings.cycle_header {
            self.notifier
                .notify(channel, &notifier::cycle_header(started_at))
                .await;
        }

        for alert in alerts {
            info!(alert = %alert, "🚨 Significant move");
            self.notifier
                .notify(channel, &notifier::alert_text(alert))
                .await;
            // No subscribers is fine
            let _ = self.alerts.send(alert.clone());
        }
    }
}
