//! Operations on the store shared by the API, CLI, and TUI.
//!
//! Every function takes a `&Connection`, so callers decide the transaction
//! boundary (usually one [`crate::store::Store::write`] per request).

pub mod bulk;
pub mod dashboard;
pub mod normalize;
pub mod recompute;
pub mod registry;
pub mod snapshot;

pub use bulk::{BulkOutcome, MeasurementInput, RowError, WriteMode};
pub use dashboard::DashboardReport;
pub use normalize::{BackfillReport, RowsCreated};
pub use recompute::RecomputeReport;
pub use snapshot::MonthSnapshot;
