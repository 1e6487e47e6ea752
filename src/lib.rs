//! Distribution substation (gardu) load monitoring.
//!
//! Substations carry nameplate data; each one has five measurement rows
//! (INDUK plus feeders 1 to 4) per month and per shift (siang, malam). Raw
//! phase currents and voltage are stored with derived load and imbalance
//! figures, recomputed whenever readings or rated power change.

#[cfg(feature = "api")]
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
/// Spreadsheet and CSV exchange.
pub mod io;
pub mod measure;
/// Workflows composed from store operations.
pub mod ops;
pub mod store;
pub mod substation;
#[cfg(feature = "tui")]
pub mod tui;
