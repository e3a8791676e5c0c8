//! Surveillance - the periodic market watch and its control surface

mod engine;
mod monitor;
pub mod significance;

pub use engine::{LoopState, ShutdownReason, StartOutcome, SurveillanceEngine};
pub use monitor::{CycleReport, SurveillanceLoop, SurveillanceSettings};
pub use significance::{SignificanceThresholds, SignificanceTracker, SymbolReading};
