//! Relative Strength Index (Wilder's smoothing)
//!
//! 1. Close-to-close deltas split into gains and losses
//! 2. Seed: simple mean of the first `period` gains/losses
//! 3. Every later pair: avg = (avg * (period - 1) + value) / period
//! 4. RSI = 100 - 100 / (1 + avg_gain / avg_loss), truncated to an integer
//!
//! avg_loss == 0 reads as 100. Fewer than `period + 1` candles give no reading.

use serde::Deserialize;
use std::collections::HashMap;

use crate::types::Candle;

/// How RSI is produced across cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiMode {
    /// Recompute from the whole history every cycle
    Full,
    /// Carry smoothed averages between cycles and only fold in new candles
    Incremental,
}

impl Default for RsiMode {
    fn default() -> Self {
        RsiMode::Full
    }
}

/// Smoothed averages after the last consumed candle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilderAverages {
    pub avg_gain: f64,
    pub avg_loss: f64,
}

impl WilderAverages {
    fn smooth(&mut self, delta: f64, period: usize) {
        let n = period as f64;
        self.avg_gain = (self.avg_gain * (n - 1.0) + delta.max(0.0)) / n;
        self.avg_loss = (self.avg_loss * (n - 1.0) + (-delta).max(0.0)) / n;
    }

    pub fn rsi(&self) -> u8 {
        if self.avg_loss <= 0.0 {
            return 100;
        }
        let rs = self.avg_gain / self.avg_loss;
        let rsi = 100.0 - 100.0 / (1.0 + rs);
        rsi.clamp(0.0, 100.0) as u8
    }
}

/// Wilder averages over the whole history, `None` if it is too short
pub fn wilder_averages(history: &[Candle], period: usize) -> Option<WilderAverages> {
    if period == 0 || history.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = history
        .windows(2)
        .map(|pair| pair[1].close - pair[0].close)
        .collect();

    let (seed, rest) = deltas.split_at(period);
    let mut averages = WilderAverages {
        avg_gain: seed.iter().map(|d| d.max(0.0)).sum::<f64>() / period as f64,
        avg_loss: seed.iter().map(|d| (-d).max(0.0)).sum::<f64>() / period as f64,
    };

    for &delta in rest {
        averages.smooth(delta, period);
    }

    Some(averages)
}

/// RSI in [0, 100] from a full candle history, `None` when there is not enough data
pub fn compute_rsi(history: &[Candle], period: usize) -> Option<u8> {
    wilder_averages(history, period).map(|averages| averages.rsi())
}

/// Averages as of the last closed candle. The newest candle is still
/// forming, so it is folded in on every call and never stored.
#[derive(Debug, Clone, Copy)]
struct IncrementalState {
    averages: WilderAverages,
    settled_open_time: i64,
    settled_close: f64,
}

/// Per-symbol RSI calculator honouring the configured mode
#[derive(Debug, Clone)]
pub struct RsiEngine {
    period: usize,
    mode: RsiMode,
    states: HashMap<String, IncrementalState>,
}

impl RsiEngine {
    pub fn new(period: usize, mode: RsiMode) -> Self {
        Self {
            period,
            mode,
            states: HashMap::new(),
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn mode(&self) -> RsiMode {
        self.mode
    }

    /// Drop all carried state
    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn compute(&mut self, symbol: &str, history: &[Candle]) -> Option<u8> {
        match self.mode {
            RsiMode::Full => compute_rsi(history, self.period),
            RsiMode::Incremental => self.compute_incremental(symbol, history),
        }
    }

    fn compute_incremental(&mut self, symbol: &str, history: &[Candle]) -> Option<u8> {
        let (forming, closed) = history.split_last()?;

        if let Some(state) = self.states.get_mut(symbol) {
            let settled = closed
                .iter()
                .position(|candle| candle.open_time == state.settled_open_time);

            if let Some(index) = settled {
                for candle in &closed[index + 1..] {
                    state.averages.smooth(candle.close - state.settled_close, self.period);
                    state.settled_close = candle.close;
                    state.settled_open_time = candle.open_time;
                }

                let mut current = state.averages;
                current.smooth(forming.close - state.settled_close, self.period);
                return Some(current.rsi());
            }

            tracing::debug!(symbol = %symbol, "History no longer overlaps carried RSI state, reseeding");
        }

        let (Some(averages), Some(settled)) = (wilder_averages(closed, self.period), closed.last())
        else {
            self.states.remove(symbol);
            return compute_rsi(history, self.period);
        };

        self.states.insert(
            symbol.to_string(),
            IncrementalState {
                averages,
                settled_open_time: settled.open_time,
                settled_close: settled.close,
            },
        );

        let mut current = averages;
        current.smooth(forming.close - settled.close, self.period);
        Some(current.rsi())
    }
}
