use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::Result;
use crate::measure::{Measurement, Month, RowName, Shift};
use crate::store::measurements;
use crate::store::substations::{self, SubstationFilter};
use crate::substation::Substation;

/// All substations and their measurement rows for one month, loaded in one
/// read so reports and exports see a consistent view.
#[derive(Debug, Clone)]
pub struct MonthSnapshot {
    pub month: Month,
    pub substations: Vec<Substation>,
    rows: HashMap<(Shift, i64, RowName), Measurement>,
}

impl MonthSnapshot {
    pub fn load(conn: &Connection, month: &Month) -> Result<Self> {
        let substations = substations::list(conn, &SubstationFilter::default())?;
        let mut rows = HashMap::new();
        for shift in Shift::ALL {
            for m in measurements::list_for_month(conn, shift, month)? {
                rows.insert((shift, m.substation_id, m.row_name), m);
            }
        }
        Ok(Self {
            month: month.clone(),
            substations,
            rows,
        })
    }

    pub fn row(&self, shift: Shift, substation_id: i64, row_name: RowName) -> Option<&Measurement> {
        self.rows.get(&(shift, substation_id, row_name))
    }

    /// The five rows of one substation in sheet order, with all-zero
    /// stand-ins for rows that were never created.
    pub fn sheet_rows(&self, shift: Shift, substation_id: i64) -> [Measurement; 5] {
        RowName::ALL.map(|row_name| {
            self.row(shift, substation_id, row_name).cloned().unwrap_or_else(|| {
                Measurement::placeholder(substation_id, self.month.clone(), row_name)
            })
        })
    }

    /// Rows that have been written at least once since their creation.
    pub fn measured_rows(&self) -> usize {
        self.rows.values().filter(|m| m.last_update.is_some()).count()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
