//! Moonwatch Library
//!
//! Market surveillance for crypto exchanges: polls the spot listing, flags
//! symbols whose price change or RSI turns extreme and posts them to a chat channel.

pub mod config;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod market;
pub mod notifier;
pub mod surveillance;
pub mod types;
