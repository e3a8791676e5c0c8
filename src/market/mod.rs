//! Market module - snapshots of an exchange listing and their differences

pub mod differ;
mod snapshot;

pub use differ::{diff, percent_change};
pub use snapshot::{MarketSnapshotProvider, SnapshotFilter};
