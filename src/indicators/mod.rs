//! Technical indicators computed from candle history

pub mod rsi;

pub use rsi::{compute_rsi, wilder_averages, RsiEngine, RsiMode, WilderAverages};
