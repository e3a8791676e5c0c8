//! Configuration sections

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::exchange::RejectionPolicy;
use crate::indicators::RsiMode;
use crate::types::{Exchange, TickInterval};

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot version tag for logging
    pub tag: String,
    /// Verbose logging
    pub debug: bool,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveillanceConfig {
    /// Percent change at or above which a symbol is "mooning"
    pub mooning: f64,
    /// Percent change at or below which a symbol is in free fall (negative)
    pub free_fall: f64,
    /// RSI at or above which a symbol is overbought
    pub over_bought: u8,
    /// RSI at or below which a symbol is oversold
    pub over_sold: u8,
    /// Minimum 24h quote volume for a symbol to be watched
    pub vol_threshold: Decimal,
    /// Seconds between two surveillance cycles
    pub update_interval_secs: u64,
    /// RSI period (number of candles)
    pub rsi_time_frame: usize,
    /// Candle interval for RSI history
    pub rsi_tick_interval: TickInterval,
    /// Candles requested per history fetch
    pub rsi_history_limit: usize,
    /// Full recompute or incremental RSI
    pub rsi_mode: RsiMode,
    /// Quote asset filter, matched as symbol prefix or suffix ("" keeps everything)
    pub quote_asset: String,
    /// Channel id handed to the notifier
    pub update_channel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Exchange to watch
    pub venue: Exchange,
    /// REST base URL override (mirrors, test servers)
    pub base_url: Option<String>,
    /// Attempts per fetch before giving up for this cycle
    pub max_attempts: u32,
    /// Timeout of a single HTTP request in milliseconds
    pub request_timeout_ms: u64,
    /// First retry delay in milliseconds (0 = immediate re-attempt)
    pub backoff_base_ms: u64,
    /// Retry delay cap in milliseconds
    pub backoff_max_ms: u64,
    /// Random jitter applied to retry delays (0.2 = +/-20%)
    pub jitter_ratio: f64,
    /// What to do when the exchange answers with its own error payload
    pub on_rejection: RejectionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierKind {
    Log,
    Webhook,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    /// Chat webhook receiving `{"content": ...}` posts
    pub webhook_url: Option<String>,
    /// Send a "---Time ...---" header at the start of every cycle
    pub cycle_header: bool,
}
