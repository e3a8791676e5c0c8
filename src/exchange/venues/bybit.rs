//! Bybit v5 spot REST endpoints
//!
//! Tickers carry both the last price and the 24h turnover, so the price and
//! volume listings share one URL. Klines arrive newest first.

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

use super::{decimal_field, f64_field, i64_field, Venue};
use crate::types::{Candle, CandleHistory, Exchange, TickInterval};

const BYBIT_REST_URL: &str = "https://api.bybit.com";
const BYBIT_MAX_KLINES: usize = 1000;

#[derive(Debug, Clone)]
pub struct BybitVenue {
    base_url: String,
}

impl BybitVenue {
    pub fn new() -> Self {
        Self::with_base_url(BYBIT_REST_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn result_list(body: &Value) -> Option<&Vec<Value>> {
        body["result"]["list"].as_array()
    }
}

impl Default for BybitVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl Venue for BybitVenue {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn price_listing_url(&self) -> String {
        format!("{}/v5/market/tickers?category=spot", self.base_url)
    }

    fn volume_listing_url(&self) -> String {
        self.price_listing_url()
    }

    fn klines_url(&self, symbol: &str, interval: TickInterval, limit: usize) -> String {
        format!(
            "{}/v5/market/kline?category=spot&symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            interval.bybit_code(),
            limit.clamp(1, BYBIT_MAX_KLINES)
        )
    }

    fn parse_prices(&self, body: &Value) -> Vec<(String, Decimal)> {
        let Some(entries) = Self::result_list(body) else {
            tracing::warn!(exchange = %"Bybit", "Ticker payload has no result list");
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let symbol = entry["symbol"].as_str()?;
                let price = decimal_field(&entry["lastPrice"])?;
                Some((symbol.to_string(), price))
            })
            .collect()
    }

    fn parse_volumes(&self, body: &Value) -> HashMap<String, Decimal> {
        let Some(entries) = Self::result_list(body) else {
            return HashMap::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let symbol = entry["symbol"].as_str()?;
                let turnover = decimal_field(&entry["turnover24h"])?;
                Some((symbol.to_string(), turnover))
            })
            .collect()
    }

    fn parse_klines(&self, body: &Value) -> CandleHistory {
        let Some(rows) = Self::result_list(body) else {
            return Vec::new();
        };

        let mut candles: CandleHistory = rows
            .iter()
            .filter_map(|row| {
                let row = row.as_array()?;
                if row.len() < 6 {
                    return None;
                }

                Some(Candle {
                    open_time: i64_field(&row[0])?,
                    open: f64_field(&row[1])?,
                    high: f64_field(&row[2])?,
                    low: f64_field(&row[3])?,
                    close: f64_field(&row[4])?,
                    volume: f64_field(&row[5])?,
                })
            })
            .collect();

        candles.sort_by_key(|c| c.open_time);
        candles
    }
}
