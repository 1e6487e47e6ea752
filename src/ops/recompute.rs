//! Re-derives stored metrics from raw readings and current rated power.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::measure::Shift;
use crate::store::{measurements, substations};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeReport {
    /// Rows inspected.
    pub scanned: usize,
    /// Rows whose derived fields differed and were rewritten.
    pub changed: usize,
}

impl RecomputeReport {
    fn merge(&mut self, other: RecomputeReport) {
        self.scanned += other.scanned;
        self.changed += other.changed;
    }
}

/// Recomputes every row of one substation, both shifts and all months.
pub fn recompute_substation(
    conn: &Connection,
    substation_id: i64,
    rated_power_kva: f64,
) -> Result<RecomputeReport> {
    let mut report = RecomputeReport::default();
    for shift in Shift::ALL {
        for m in measurements::list_for_substation(conn, shift, substation_id, None)? {
            report.scanned += 1;
            let derived = m.raw.derive(rated_power_kva);
            if derived != m.derived {
                measurements::set_derived(conn, shift, substation_id, &m.month, m.row_name, &derived)?;
                report.changed += 1;
            }
        }
    }
    debug!(substation_id, scanned = report.scanned, changed = report.changed, "recomputed substation");
    Ok(report)
}

/// Recomputes every stored row. Running it twice changes nothing the second time.
pub fn recompute_all(conn: &Connection) -> Result<RecomputeReport> {
    let mut report = RecomputeReport::default();
    for id in substations::all_ids(conn)? {
        let rated = substations::rated_power(conn, id)?.unwrap_or(0.0);
        report.merge(recompute_substation(conn, id, rated)?);
    }
    info!(scanned = report.scanned, changed = report.changed, "recompute complete");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{Measurement, Month, RawReadings, RowName};
    use crate::store::Store;
    use crate::substation::SubstationFields;

    #[test]
    fn stale_rows_are_rewritten_once() {
        let store = Store::open_in_memory().unwrap();
        let month = Month::parse("2024-03").unwrap();
        store
            .write(|c| {
                let fields = SubstationFields {
                    no_gardu: "KB-7".into(),
                    daya: "200".into(),
                    ..SubstationFields::default()
                };
                let s = substations::insert(c, &fields, "t0")?;
                // Derived fields left at zero, as if written by an older tool.
                let stale = Measurement {
                    raw: RawReadings {
                        r: 95.0,
                        s: 102.0,
                        t: 121.0,
                        pp: 413.0,
                        ..RawReadings::default()
                    },
                    ..Measurement::placeholder(s.id, month.clone(), RowName::Induk)
                };
                measurements::insert(c, Shift::Siang, &stale)?;
                measurements::insert_placeholder_if_missing(c, Shift::Malam, s.id, &month, RowName::One)?;
                Ok(())
            })
            .unwrap();

        let first = store.write(recompute_all).unwrap();
        assert_eq!(first, RecomputeReport { scanned: 2, changed: 1 });
        let second = store.write(recompute_all).unwrap();
        assert_eq!(second, RecomputeReport { scanned: 2, changed: 0 });

        let row = store
            .read(|c| measurements::find(c, Shift::Siang, 1, &month, RowName::Induk))
            .unwrap()
            .unwrap();
        assert_eq!(row.derived.average, 106.0);
        assert!((row.derived.load_percent - 37.86797).abs() < 1e-4);
        assert!(row.last_update.is_none());
    }
}
