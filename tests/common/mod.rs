//! Shared fixtures: an in-memory Binance and a recording notifier

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use moonwatch::error::TransportError;
use moonwatch::exchange::{
    BinanceVenue, ExchangeClient, HttpResponse, HttpTransport, RejectionPolicy, RetryPolicy,
};
use moonwatch::indicators::RsiMode;
use moonwatch::notifier::Notifier;
use moonwatch::surveillance::{SignificanceThresholds, SurveillanceEngine, SurveillanceSettings};
use moonwatch::types::TickInterval;

#[derive(Default)]
struct Market {
    prices: BTreeMap<String, String>,
    volumes: BTreeMap<String, String>,
    closes: BTreeMap<String, Vec<f64>>,
    kline_rejection: Option<(i64, String)>,
    price_requests: usize,
    kline_requests: usize,
    latency: Duration,
}

/// Answers the Binance REST endpoints from scripted state
#[derive(Default)]
pub struct ScriptedTransport {
    market: Mutex<Market>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_listing(&self, symbol: &str, price: &str, volume: &str) {
        let mut market = self.market.lock().unwrap();
        market.prices.insert(symbol.to_string(), price.to_string());
        market.volumes.insert(symbol.to_string(), volume.to_string());
    }

    pub fn set_price(&self, symbol: &str, price: &str) {
        let mut market = self.market.lock().unwrap();
        market.prices.insert(symbol.to_string(), price.to_string());
    }

    pub fn set_closes(&self, symbol: &str, closes: Vec<f64>) {
        let mut market = self.market.lock().unwrap();
        market.closes.insert(symbol.to_string(), closes);
    }

    /// Every kline request answers with a Binance error payload
    pub fn reject_klines(&self, code: i64, message: &str) {
        let mut market = self.market.lock().unwrap();
        market.kline_rejection = Some((code, message.to_string()));
    }

    /// Delay every answer by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.market.lock().unwrap().latency = latency;
    }

    pub fn price_requests(&self) -> usize {
        self.market.lock().unwrap().price_requests
    }

    pub fn kline_requests(&self) -> usize {
        self.market.lock().unwrap().kline_requests
    }
}

fn klines(closes: &[f64]) -> Value {
    let rows: Vec<Value> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            let close = close.to_string();
            json!([i as i64 * 900_000, close, close, close, close, "10.0", 0, "0", 0, "0", "0", "0"])
        })
        .collect();
    Value::Array(rows)
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let latency = self.market.lock().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut market = self.market.lock().unwrap();

        let body = if url.contains("/api/v3/ticker/price") {
            market.price_requests += 1;
            let entries: Vec<Value> = market
                .prices
                .iter()
                .map(|(symbol, price)| json!({ "symbol": symbol, "price": price }))
                .collect();
            Value::Array(entries)
        } else if url.contains("/api/v3/ticker/24hr") {
            let entries: Vec<Value> = market
                .volumes
                .iter()
                .map(|(symbol, volume)| json!({ "symbol": symbol, "quoteVolume": volume }))
                .collect();
            Value::Array(entries)
        } else if url.contains("/api/v3/klines") {
            market.kline_requests += 1;
            if let Some((code, message)) = &market.kline_rejection {
                return Ok(HttpResponse {
                    status: 400,
                    body: json!({ "code": code, "msg": message }).to_string(),
                });
            }
            let symbol = url
                .split("symbol=")
                .nth(1)
                .and_then(|rest| rest.split('&').next())
                .unwrap_or_default();
            klines(market.closes.get(symbol).map(Vec::as_slice).unwrap_or(&[]))
        } else {
            return Ok(HttpResponse {
                status: 404,
                body: "not found".to_string(),
            });
        };

        Ok(HttpResponse::ok(body.to_string()))
    }
}

/// Keeps every message it is asked to deliver
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel_id: &str, text: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
    }
}

pub fn settings() -> SurveillanceSettings {
    SurveillanceSettings {
        poll_interval: Duration::from_secs(3600),
        rsi_period: 14,
        rsi_tick_interval: TickInterval::FifteenMin,
        rsi_history_limit: 100,
        rsi_mode: RsiMode::Full,
        quote_asset: "BTC".to_string(),
        update_channel: "updates".to_string(),
        cycle_header: false,
        thresholds: SignificanceThresholds {
            mooning: 4.0,
            free_fall: -10.0,
            over_bought: 70,
            over_sold: 30,
            volume_threshold: dec!(100),
        },
    }
}

pub fn client(transport: Arc<ScriptedTransport>) -> Arc<ExchangeClient> {
    Arc::new(ExchangeClient::new(
        transport,
        RetryPolicy::immediate(3),
        RejectionPolicy::Fatal,
    ))
}

pub fn engine(
    transport: Arc<ScriptedTransport>,
    notifier: Arc<RecordingNotifier>,
) -> SurveillanceEngine {
    SurveillanceEngine::new(
        settings(),
        client(transport),
        Arc::new(BinanceVenue::new()),
        notifier,
    )
}

/// Closes alternating around 100: RSI stays near 50
pub fn neutral_closes() -> Vec<f64> {
    (0..40)
        .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
        .collect()
}

/// Strictly rising closes: RSI 100
pub fn rising_closes() -> Vec<f64> {
    (0..40).map(|i| 100.0 + i as f64).collect()
}
