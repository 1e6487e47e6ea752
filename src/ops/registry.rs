//! Substation lifecycle: creation seeds placeholder rows, and a rated-power
//! change re-derives every stored measurement.

use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use super::normalize::{RowsCreated, ensure_rows};
use super::recompute::{RecomputeReport, recompute_substation};
use crate::error::Result;
use crate::measure::Month;
use crate::store::substations;
use crate::substation::{Substation, SubstationFields};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Created {
    pub substation: Substation,
    pub rows_created: RowsCreated,
}

/// Stores a new substation and its placeholder rows for `month`.
pub fn create(
    conn: &Connection,
    fields: &SubstationFields,
    month: &Month,
    now: &str,
) -> Result<Created> {
    let substation = substations::insert(conn, fields, now)?;
    let rows_created = ensure_rows(conn, substation.id, month)?;
    info!(id = substation.id, no_gardu = %substation.fields.no_gardu, "substation created");
    Ok(Created {
        substation,
        rows_created,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Updated {
    pub substation: Substation,
    /// Present when the rated power changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recomputed: Option<RecomputeReport>,
}

/// Replaces a substation's metadata, recomputing its rows if `daya` changed.
pub fn update(conn: &Connection, id: i64, fields: &SubstationFields, now: &str) -> Result<Updated> {
    let before = substations::require(conn, id)?;
    let substation = substations::update(conn, id, fields, now)?;
    let recomputed = if before.rated_power_kva() != substation.rated_power_kva() {
        let report = recompute_substation(conn, id, substation.rated_power_kva())?;
        info!(id, changed = report.changed, "rated power changed, rows recomputed");
        Some(report)
    } else {
        None
    };
    Ok(Updated {
        substation,
        recomputed,
    })
}
