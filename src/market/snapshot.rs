//! Market snapshot provider
//!
//! Joins the price listing with the 24h volume listing and keeps the symbols
//! quoted in the configured asset whose volume clears the threshold.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::exchange::{ExchangeClient, Venue};
use crate::types::{MarketQuote, MarketSnapshot};

/// Which symbols make it into a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotFilter {
    /// Matched as prefix or suffix of the symbol; empty matches everything
    pub quote_asset: String,
    /// Volume must be strictly above this
    pub volume_threshold: Decimal,
}

impl SnapshotFilter {
    pub fn matches_quote(&self, symbol: &str) -> bool {
        self.quote_asset.is_empty()
            || symbol.starts_with(&self.quote_asset)
            || symbol.ends_with(&self.quote_asset)
    }
}

pub struct MarketSnapshotProvider {
    client: Arc<ExchangeClient>,
    venue: Arc<dyn Venue>,
    filter: SnapshotFilter,
}

impl MarketSnapshotProvider {
    pub fn new(client: Arc<ExchangeClient>, venue: Arc<dyn Venue>, filter: SnapshotFilter) -> Self {
        Self {
            client,
            venue,
            filter,
        }
    }

    pub fn filter(&self) -> &SnapshotFilter {
        &self.filter
    }

    /// Fetch a fresh snapshot.
    ///
    /// `Ok(None)` means one of the listings was unavailable this cycle.
    pub async fn snapshot(&self) -> Result<Option<MarketSnapshot>, FetchError> {
        let price_url = self.venue.price_listing_url();
        let volume_url = self.venue.volume_listing_url();

        let Some(prices) = self.client.fetch(&price_url).await? else {
            warn!(exchange = %self.venue.exchange(), "Price listing unavailable");
            return Ok(None);
        };

        let volumes = if volume_url == price_url {
            Some(prices.clone())
        } else {
            self.client.fetch(&volume_url).await?
        };
        let Some(volumes) = volumes else {
            warn!(exchange = %self.venue.exchange(), "Volume listing unavailable");
            return Ok(None);
        };

        Ok(Some(self.build_snapshot(&prices, &volumes, Utc::now())))
    }

    /// Join both listings into a filtered snapshot
    pub fn build_snapshot(
        &self,
        prices: &Value,
        volumes: &Value,
        observed_at: DateTime<Utc>,
    ) -> MarketSnapshot {
        let volumes = self.venue.parse_volumes(volumes);
        let mut snapshot = MarketSnapshot::new(self.venue.exchange(), observed_at);

        for (symbol, price) in self.venue.parse_prices(prices) {
            if !self.filter.matches_quote(&symbol) {
                continue;
            }

            let Some(volume) = volumes.get(&symbol) else {
                debug!(symbol = %symbol, "No 24h volume, excluding symbol");
                continue;
            };
            let volume = volume.round_dp(2);
            if volume <= self.filter.volume_threshold {
                continue;
            }

            snapshot.insert(
                symbol,
                MarketQuote {
                    price,
                    volume: Some(volume),
                    observed_at,
                },
            );
        }

        debug!(
            exchange = %snapshot.exchange,
            symbols = snapshot.len(),
            "Snapshot built"
        );
        snapshot
    }
}
