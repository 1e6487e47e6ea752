//! Placeholder rows: every substation carries one siang and one malam row
//! per row name for each month it is tracked in.

use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::measure::{Month, RowName, Shift};
use crate::store::{measurements, substations};

/// Rows created by one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsCreated {
    pub siang: usize,
    pub malam: usize,
}

impl RowsCreated {
    pub fn total(&self) -> usize {
        self.siang + self.malam
    }

    fn add(&mut self, shift: Shift, n: usize) {
        match shift {
            Shift::Siang => self.siang += n,
            Shift::Malam => self.malam += n,
        }
    }
}

/// Creates any missing all-zero rows for `substation_id` in `month`.
///
/// Existing rows are left untouched, so repeated calls are no-ops.
pub fn ensure_rows(conn: &Connection, substation_id: i64, month: &Month) -> Result<RowsCreated> {
    let mut created = RowsCreated::default();
    for shift in Shift::ALL {
        let mut n = 0;
        for row_name in RowName::ALL {
            if measurements::insert_placeholder_if_missing(conn, shift, substation_id, month, row_name)? {
                n += 1;
            }
        }
        created.add(shift, n);
    }
    Ok(created)
}

/// Outcome of auditing every substation for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    pub month: Month,
    pub substations_audited: usize,
    pub created: RowsCreated,
}

/// Runs [`ensure_rows`] for every stored substation.
pub fn backfill_all(conn: &Connection, month: &Month) -> Result<BackfillReport> {
    let ids = substations::all_ids(conn)?;
    let mut created = RowsCreated::default();
    for &id in &ids {
        let rows = ensure_rows(conn, id, month)?;
        created.siang += rows.siang;
        created.malam += rows.malam;
    }
    info!(
        month = %month,
        substations = ids.len(),
        created = created.total(),
        siang = created.siang,
        malam = created.malam,
        "row backfill complete"
    );
    Ok(BackfillReport {
        month: month.clone(),
        substations_audited: ids.len(),
        created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::substation::SubstationFields;

    fn add_substation(store: &Store, no_gardu: &str) -> i64 {
        store
            .write(|c| {
                let fields = SubstationFields {
                    no_gardu: no_gardu.into(),
                    ..SubstationFields::default()
                };
                Ok(substations::insert(c, &fields, "t0")?.id)
            })
            .unwrap()
    }

    #[test]
    fn ensure_rows_twice_creates_five_per_shift() {
        let store = Store::open_in_memory().unwrap();
        let id = add_substation(&store, "KB-1");
        let month = Month::parse("2024-02").unwrap();

        let first = store.write(|c| ensure_rows(c, id, &month)).unwrap();
        let second = store.write(|c| ensure_rows(c, id, &month)).unwrap();

        assert_eq!(first, RowsCreated { siang: 5, malam: 5 });
        assert_eq!(second.total(), 0);
        for shift in Shift::ALL {
            let rows = store
                .read(|c| measurements::list_for_substation(c, shift, id, Some(&month)))
                .unwrap();
            assert_eq!(rows.len(), 5);
        }
    }

    #[test]
    fn backfill_only_fills_gaps() {
        let store = Store::open_in_memory().unwrap();
        let a = add_substation(&store, "KB-1");
        add_substation(&store, "KB-2");
        let month = Month::parse("2024-02").unwrap();
        store.write(|c| ensure_rows(c, a, &month)).unwrap();

        let report = store.write(|c| backfill_all(c, &month)).unwrap();
        assert_eq!(report.substations_audited, 2);
        assert_eq!(report.created, RowsCreated { siang: 5, malam: 5 });
    }
}
