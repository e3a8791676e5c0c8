//! Exchange REST venues (Binance, Bybit)

mod binance;
mod bybit;

pub use binance::BinanceVenue;
pub use bybit::BybitVenue;

use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::types::{CandleHistory, Exchange, TickInterval};

/// URL builders and tolerant payload parsers for one exchange.
///
/// Parsers never fail as a whole: an entry with missing or unparsable fields
/// is dropped and the rest of the payload is kept.
pub trait Venue: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// All-symbol current price listing
    fn price_listing_url(&self) -> String;

    /// All-symbol 24h volume listing
    fn volume_listing_url(&self) -> String;

    /// Candle history of one symbol
    fn klines_url(&self, symbol: &str, interval: TickInterval, limit: usize) -> String;

    fn parse_prices(&self, body: &Value) -> Vec<(String, Decimal)>;

    /// 24h volume in quote asset, keyed by symbol
    fn parse_volumes(&self, body: &Value) -> HashMap<String, Decimal>;

    /// Candles oldest first
    fn parse_klines(&self, body: &Value) -> CandleHistory;
}

/// Build the venue for an exchange, optionally against another base URL
pub fn venue_for(exchange: Exchange, base_url: Option<&str>) -> Arc<dyn Venue> {
    match exchange {
        Exchange::Binance => Arc::new(match base_url {
            Some(url) => BinanceVenue::with_base_url(url),
            None => BinanceVenue::new(),
        }),
        Exchange::Bybit => Arc::new(match base_url {
            Some(url) => BybitVenue::with_base_url(url),
            None => BybitVenue::new(),
        }),
    }
}

/// Exchanges send numbers as strings; accept both
pub(crate) fn decimal_field(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

pub(crate) fn f64_field(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

pub(crate) fn i64_field(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn numeric_fields_accept_strings_and_numbers() {
        assert_eq!(decimal_field(&json!("0.00012345")), Some(dec!(0.00012345)));
        assert_eq!(decimal_field(&json!(42)), Some(dec!(42)));
        assert_eq!(decimal_field(&json!(null)), None);
        assert_eq!(f64_field(&json!("1.5")), Some(1.5));
        assert_eq!(f64_field(&json!("NaN")), None);
        assert_eq!(i64_field(&json!("1499040000000")), Some(1_499_040_000_000));
    }

    #[test]
    fn venue_for_honours_base_url() {
        let venue = venue_for(Exchange::Binance, Some("http://127.0.0.1:9000/"));
        assert_eq!(venue.exchange(), Exchange::Binance);
        assert!(venue
            .price_listing_url()
            .starts_with("http://127.0.0.1:9000/api/v3/"));

        let venue = venue_for(Exchange::Bybit, None);
        assert!(venue.price_listing_url().starts_with("https://api.bybit.com/"));
    }
}
