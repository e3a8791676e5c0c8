//! Core types used throughout Moonwatch
//!
//! Defines exchanges, tick intervals, market snapshots, candles and alert events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Exchange {
    Binance,
    Bybit,
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange::Binance
    }
}

impl Exchange {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "binance" => Some(Exchange::Binance),
            "bybit" => Some(Exchange::Bybit),
            _ => None,
        }
    }
}

impl TryFrom<String> for Exchange {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Exchange::from_str(&value).ok_or_else(|| format!("unknown exchange: {}", value))
    }
}

impl From<Exchange> for String {
    fn from(value: Exchange) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Binance => write!(f, "Binance"),
            Exchange::Bybit => write!(f, "Bybit"),
        }
    }
}

/// Candle interval used for RSI history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TickInterval {
    OneMin,
    FiveMin,
    FifteenMin,
    ThirtyMin,
    Hour,
    Day,
}

impl Default for TickInterval {
    fn default() -> Self {
        TickInterval::FifteenMin
    }
}

impl TickInterval {
    /// Parse from either the legacy names (`fiveMin`) or exchange codes (`5m`)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "oneMin" | "1m" => Some(TickInterval::OneMin),
            "fiveMin" | "5m" => Some(TickInterval::FiveMin),
            "fifteenMin" | "15m" => Some(TickInterval::FifteenMin),
            "thirtyMin" | "30m" => Some(TickInterval::ThirtyMin),
            "hour" | "1h" => Some(TickInterval::Hour),
            "day" | "1d" => Some(TickInterval::Day),
            _ => None,
        }
    }

    /// Interval code for the Binance klines endpoint
    pub fn binance_code(&self) -> &'static str {
        match self {
            TickInterval::OneMin => "1m",
            TickInterval::FiveMin => "5m",
            TickInterval::FifteenMin => "15m",
            TickInterval::ThirtyMin => "30m",
            TickInterval::Hour => "1h",
            TickInterval::Day => "1d",
        }
    }

    /// Interval code for the Bybit v5 kline endpoint
    pub fn bybit_code(&self) -> &'static str {
        match self {
            TickInterval::OneMin => "1",
            TickInterval::FiveMin => "5",
            TickInterval::FifteenMin => "15",
            TickInterval::ThirtyMin => "30",
            TickInterval::Hour => "60",
            TickInterval::Day => "D",
        }
    }
}

impl TryFrom<String> for TickInterval {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TickInterval::from_str(&value).ok_or_else(|| format!("unknown tick interval: {}", value))
    }
}

impl From<TickInterval> for String {
    fn from(value: TickInterval) -> Self {
        value.binance_code().to_string()
    }
}

impl fmt::Display for TickInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.binance_code())
    }
}

/// Price and 24h quote volume of one symbol at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub price: Decimal,
    pub volume: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
}

/// Point-in-time listing of an exchange keyed by symbol (e.g. "ETHBTC")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub exchange: Exchange,
    pub taken_at: DateTime<Utc>,
    quotes: HashMap<String, MarketQuote>,
}

impl MarketSnapshot {
    pub fn new(exchange: Exchange, taken_at: DateTime<Utc>) -> Self {
        Self {
            exchange,
            taken_at,
            quotes: HashMap::new(),
        }
    }

    /// Empty snapshot, the state of the engine before the baseline is loaded
    pub fn empty(exchange: Exchange) -> Self {
        Self::new(exchange, Utc::now())
    }

    pub fn insert(&mut self, symbol: impl Into<String>, quote: MarketQuote) {
        self.quotes.insert(symbol.into(), quote);
    }

    pub fn get(&self, symbol: &str) -> Option<&MarketQuote> {
        self.quotes.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.quotes.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &MarketQuote)> {
        self.quotes.iter()
    }

    /// Symbols in lexical order
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.quotes.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

/// OHLCV candle data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles ordered oldest first
pub type CandleHistory = Vec<Candle>;

/// Price movement of one symbol between two snapshots
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChange {
    pub symbol: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
    /// Rounded to 2 decimals, positive means the price went up
    pub percent_change: f64,
}

/// A significant move detected during one surveillance cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub symbol: String,
    pub exchange: Exchange,
    pub percent_change: f64,
    /// `None` when the candle history was too short for a real reading
    pub rsi: Option<u8>,
    pub volume: Decimal,
    pub change_significant: bool,
    pub rsi_significant: bool,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} change={:.2}% rsi={} vol={}",
            self.exchange,
            self.symbol,
            self.percent_change,
            self.rsi.map(|r| r.to_string()).unwrap_or_else(|| "n/a".to_string()),
            self.volume
        )
    }
}
