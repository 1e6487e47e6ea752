//! CSV export of one month's measurement rows.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;
use crate::measure::{RowName, Shift};
use crate::ops::snapshot::MonthSnapshot;

/// Column header, one line per stored row.
const HEADER: &str = "shift,substationId,noGardu,month,row_name,r,s,t,n,rn,sn,tn,pp,pn,\
                      rata2,kva,persen,unbalanced,lastUpdate";

/// Exports a month to a CSV file at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_csv(snapshot: &MonthSnapshot, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(snapshot, io::BufWriter::new(file))
}

/// Writes a month as CSV to any writer.
///
/// Rows are grouped by substation in register order, siang before malam,
/// INDUK first. Only rows that exist in the store are written. Numbers are
/// unrounded.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_csv(snapshot: &MonthSnapshot, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(HEADER.split(','))?;

    for s in &snapshot.substations {
        for shift in Shift::ALL {
            for row_name in RowName::ALL {
                let Some(m) = snapshot.row(shift, s.id, row_name) else {
                    continue;
                };
                let (raw, d) = (&m.raw, &m.derived);
                wtr.write_record([
                    shift.as_str().to_string(),
                    s.id.to_string(),
                    s.fields.no_gardu.clone(),
                    m.month.to_string(),
                    row_name.as_str().to_string(),
                    raw.r.to_string(),
                    raw.s.to_string(),
                    raw.t.to_string(),
                    raw.n.to_string(),
                    raw.rn.to_string(),
                    raw.sn.to_string(),
                    raw.tn.to_string(),
                    raw.pp.to_string(),
                    raw.pn.to_string(),
                    d.average.to_string(),
                    d.apparent_power_kva.to_string(),
                    d.load_percent.to_string(),
                    d.imbalance_percent.to_string(),
                    m.last_update.clone().unwrap_or_default(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
