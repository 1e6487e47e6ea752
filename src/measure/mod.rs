//! Measurement domain: row names, shifts, months, and the load calculator.

/// Load and imbalance calculator for one three-phase reading.
pub mod calculator;
/// Lenient numeric coercion for loosely typed inputs.
pub mod coerce;
pub mod types;

pub use calculator::{DerivedMetrics, calculate, format_percent};
pub use types::{Measurement, Month, RawReadings, RowName, Shift};
