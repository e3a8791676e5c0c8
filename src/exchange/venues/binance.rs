//! Binance spot REST endpoints
//!
//! Price listing: `[{"symbol":"ETHBTC","price":"0.0345"}, ...]`
//! 24h listing: `[{"symbol":"ETHBTC","quoteVolume":"1234.5", ...}, ...]`
//! Klines: `[[openTime, open, high, low, close, volume, closeTime, ...], ...]` oldest first

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;

use super::{decimal_field, f64_field, i64_field, Venue};
use crate::types::{Candle, CandleHistory, Exchange, TickInterval};

const BINANCE_REST_URL: &str = "https://api.binance.com";
const BINANCE_MAX_KLINES: usize = 1000;

#[derive(Debug, Clone)]
pub struct BinanceVenue {
    base_url: String,
}

impl BinanceVenue {
    pub fn new() -> Self {
        Self::with_base_url(BINANCE_REST_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for BinanceVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl Venue for BinanceVenue {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn price_listing_url(&self) -> String {
        format!("{}/api/v3/ticker/price", self.base_url)
    }

    fn volume_listing_url(&self) -> String {
        format!("{}/api/v3/ticker/24hr", self.base_url)
    }

    fn klines_url(&self, symbol: &str, interval: TickInterval, limit: usize) -> String {
        format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            interval.binance_code(),
            limit.clamp(1, BINANCE_MAX_KLINES)
        )
    }

    fn parse_prices(&self, body: &Value) -> Vec<(String, Decimal)> {
        let Some(entries) = body.as_array() else {
            tracing::warn!(exchange = %"Binance", "Price listing is not an array");
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let symbol = entry["symbol"].as_str()?;
                match decimal_field(&entry["price"]) {
                    Some(price) => Some((symbol.to_string(), price)),
                    None => {
                        tracing::debug!(symbol = %symbol, "Skipping listing entry without a price");
                        None
                    }
                }
            })
            .collect()
    }

    fn parse_volumes(&self, body: &Value) -> HashMap<String, Decimal> {
        let Some(entries) = body.as_array() else {
            tracing::warn!(exchange = %"Binance", "24h listing is not an array");
            return HashMap::new();
        };

        entries
            .iter()
            .filter_map(|entry| {
                let symbol = entry["symbol"].as_str()?;
                let volume = decimal_field(&entry["quoteVolume"])?;
                Some((symbol.to_string(), volume))
            })
            .collect()
    }

    fn parse_klines(&self, body: &Value) -> CandleHistory {
        let Some(klines) = body.as_array() else {
            return Vec::new();
        };

        klines
            .iter()
            .filter_map(|kline| {
                let kline = kline.as_array()?;
                if kline.len() < 6 {
                    return None;
                }

                Some(Candle {
                    open_time: i64_field(&kline[0])?,
                    open: f64_field(&kline[1])?,
                    high: f64_field(&kline[2])?,
                    low: f64_field(&kline[3])?,
                    close: f64_field(&kline[4])?,
                    volume: f64_field(&kline[5])?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn builds_kline_url_with_interval_code() {
        let venue = BinanceVenue::new();
        assert_eq!(
            venue.klines_url("ETHBTC", TickInterval::FifteenMin, 500),
            "https://api.binance.com/api/v3/klines?symbol=ETHBTC&interval=15m&limit=500"
        );
        assert!(venue
            .klines_url("ETHBTC", TickInterval::Day, 5000)
            .ends_with("limit=1000"));
    }

    #[test]
    fn parse_prices_skips_malformed_entries() {
        let body = json!([
            {"symbol": "ETHBTC", "price": "0.05123000"},
            {"symbol": "LTCBTC", "price": "garbage"},
            {"price": "1.0"},
            {"symbol": "BNBBTC", "price": "0.00812"}
        ]);

        let prices = BinanceVenue::new().parse_prices(&body);

        assert_eq!(
            prices,
            vec![
                ("ETHBTC".to_string(), dec!(0.05123000)),
                ("BNBBTC".to_string(), dec!(0.00812)),
            ]
        );
    }

    #[test]
    fn parse_volumes_reads_quote_volume() {
        let body = json!([
            {"symbol": "ETHBTC", "volume": "999", "quoteVolume": "1520.75"},
            {"symbol": "LTCBTC"}
        ]);

        let volumes = BinanceVenue::new().parse_volumes(&body);

        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes["ETHBTC"], dec!(1520.75));
    }

    #[test]
    fn parse_klines_keeps_order_and_drops_short_rows() {
        let body = json!([
            [1499040000000i64, "0.0163", "0.8", "0.0157", "0.0158", "148976.1", 1499644799999i64],
            [1499040900000i64, "0.0158"],
            [1499041800000i64, "0.0158", "0.9", "0.0150", "0.0170", "100.0", 1499644799999i64]
        ]);

        let candles = BinanceVenue::new().parse_klines(&body);

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 0.0158);
        assert_eq!(candles[1].open_time, 1_499_041_800_000);
        assert_eq!(candles[1].close, 0.0170);
    }
}
