//! Monitoring workbook import.
//!
//! A straight fixed-offset reader over the first worksheet (see
//! [`super::layout`]). Parsing and applying are separate steps: parsing
//! never touches the store, so a sheet can be checked before anything is
//! written.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx, open_workbook_from_rs};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use super::layout::{self, GROUP_ROWS, HEADER_ROWS};
use crate::error::{GarduError, Result};
use crate::measure::coerce::coerce_str;
use crate::measure::{Measurement, Month, RawReadings, RowName, Shift};
use crate::ops::bulk::RowError;
use crate::ops::normalize::ensure_rows;
use crate::ops::registry;
use crate::store::{measurements, substations};
use crate::substation::SubstationFields;

/// One worksheet cell, reduced to what the layout needs.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Numeric value; text is parsed, anything unparseable is `0.0`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Cell::Empty => 0.0,
            Cell::Number(n) if n.is_finite() => *n,
            Cell::Number(_) => 0.0,
            Cell::Text(s) => coerce_str(s),
        }
    }

    /// Text value; whole numbers print without a fractional part.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{n:.0}"),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.trim().to_string(),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Float(f) => Cell::Number(*f),
            Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Data::String(s) => Cell::Text(s.clone()),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Reads the first worksheet into a dense grid anchored at A1.
///
/// # Errors
///
/// Returns [`GarduError::Import`] if the bytes are not an xlsx workbook or
/// it has no worksheet.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Vec<Cell>>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GarduError::Import("workbook has no worksheets".into()))??;
    let Some((end_row, end_col)) = range.end() else {
        return Ok(Vec::new());
    };
    let grid = (0..=end_row)
        .map(|r| {
            (0..=end_col)
                .map(|c| range.get_value((r, c)).map_or(Cell::Empty, Cell::from))
                .collect()
        })
        .collect();
    Ok(grid)
}

/// One substation's block of five rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetGroup {
    /// 1-based sheet row of the INDUK line.
    pub sheet_row: usize,
    pub fields: SubstationFields,
    /// Readings per row name, in [`RowName::ALL`] order.
    pub siang: [RawReadings; 5],
    pub malam: [RawReadings; 5],
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSheet {
    pub groups: Vec<SheetGroup>,
    pub errors: Vec<RowError>,
}

fn cell(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&Cell::Empty)
}

fn readings(row: &[Cell], shift: Shift) -> RawReadings {
    let start = layout::raw_start(shift);
    let v = |offset: usize| cell(row, start + offset).as_f64();
    RawReadings {
        r: v(0),
        s: v(1),
        t: v(2),
        n: v(3),
        rn: v(4),
        sn: v(5),
        tn: v(6),
        pp: v(7),
        pn: v(8),
    }
}

fn metadata(row: &[Cell]) -> SubstationFields {
    let text = |col: usize| cell(row, col).as_text();
    let no = match cell(row, layout::NO) {
        Cell::Number(n) if n.fract() == 0.0 => Some(*n as i64),
        Cell::Text(s) => s.trim().parse().ok(),
        _ => None,
    };
    SubstationFields {
        no,
        ulp: text(layout::ULP),
        no_gardu: text(layout::NO_GARDU),
        nama_lokasi: text(layout::NAMA_LOKASI),
        jenis: text(layout::JENIS),
        merek: text(layout::MEREK),
        daya: text(layout::DAYA),
        tahun: text(layout::TAHUN),
        phasa: text(layout::PHASA),
        tap: text(layout::TAP),
        penyulang: text(layout::PENYULANG),
        arah_sequence: text(layout::ARAH_SEQUENCE),
        ..SubstationFields::default()
    }
}

/// Splits the data area into groups of five rows.
///
/// Rows are assigned to INDUK, 1, 2, 3, 4 by position; the JURUSAN column
/// and the derived columns are not read. Trailing blank rows are ignored.
pub fn parse_grid(grid: &[Vec<Cell>]) -> ParsedSheet {
    let data_end = grid
        .iter()
        .rposition(|row| row.iter().any(|c| !c.is_blank()))
        .map_or(0, |last| last + 1);
    let data = grid.get(HEADER_ROWS..data_end).unwrap_or(&[]);

    let mut parsed = ParsedSheet::default();
    for (i, rows) in data.chunks(GROUP_ROWS).enumerate() {
        let sheet_row = HEADER_ROWS + i * GROUP_ROWS + 1;
        if rows.len() < GROUP_ROWS {
            parsed.errors.push(RowError::at(
                sheet_row,
                format!("incomplete group: {} of {GROUP_ROWS} rows", rows.len()),
            ));
            continue;
        }
        let fields = metadata(&rows[0]);
        if fields.no_gardu.is_empty() {
            parsed
                .errors
                .push(RowError::at(sheet_row, "NO GARDU is empty"));
            continue;
        }
        parsed.groups.push(SheetGroup {
            sheet_row,
            fields,
            siang: std::array::from_fn(|k| readings(&rows[k], Shift::Siang)),
            malam: std::array::from_fn(|k| readings(&rows[k], Shift::Malam)),
        });
    }
    parsed
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub month: Month,
    pub substations_created: usize,
    pub substations_updated: usize,
    pub rows_written: usize,
    pub errors: Vec<RowError>,
}

/// Writes parsed groups for `month`.
///
/// Each group upserts its substation by gardu number. Sheet columns replace
/// the stored metadata; status, flags, coordinates, photo, and installation
/// date of an existing substation are kept.
pub fn apply(conn: &Connection, month: &Month, parsed: &ParsedSheet, now: &str) -> Result<ImportReport> {
    let mut report = ImportReport {
        month: month.clone(),
        substations_created: 0,
        substations_updated: 0,
        rows_written: 0,
        errors: parsed.errors.clone(),
    };

    for group in &parsed.groups {
        let upserted = match substations::find_by_gardu(conn, &group.fields.no_gardu)? {
            Some(existing) => {
                let fields = SubstationFields {
                    status: existing.fields.status,
                    is_active: existing.fields.is_active,
                    ugb: existing.fields.ugb,
                    latitude: existing.fields.latitude,
                    longitude: existing.fields.longitude,
                    photo_url: existing.fields.photo_url.clone(),
                    tanggal_pasang: existing.fields.tanggal_pasang.clone(),
                    ..group.fields.clone()
                };
                registry::update(conn, existing.id, &fields, now).map(|u| {
                    report.substations_updated += 1;
                    u.substation
                })
            }
            None => registry::create(conn, &group.fields, month, now).map(|c| {
                report.substations_created += 1;
                c.substation
            }),
        };
        let substation = match upserted {
            Ok(s) => s,
            Err(GarduError::Validation(msg)) => {
                warn!(row = group.sheet_row, error = %msg, "import group rejected");
                report.errors.push(RowError::at(group.sheet_row, msg));
                continue;
            }
            Err(e) => return Err(e),
        };

        ensure_rows(conn, substation.id, month)?;
        let rated = substation.rated_power_kva();
        for (shift, rows) in [(Shift::Siang, &group.siang), (Shift::Malam, &group.malam)] {
            for (row_name, raw) in RowName::ALL.into_iter().zip(rows.iter()) {
                let record = Measurement {
                    substation_id: substation.id,
                    month: month.clone(),
                    row_name,
                    raw: *raw,
                    derived: raw.derive(rated),
                    last_update: Some(now.to_string()),
                };
                measurements::upsert(conn, shift, &record)?;
                report.rows_written += 1;
            }
        }
    }

    info!(
        month = %month,
        created = report.substations_created,
        updated = report.substations_updated,
        rows = report.rows_written,
        errors = report.errors.len(),
        "workbook imported"
    );
    Ok(report)
}

/// Parses `bytes` as a monitoring workbook and applies it for `month`.
pub fn import_xlsx(conn: &Connection, bytes: &[u8], month: &Month, now: &str) -> Result<ImportReport> {
    let grid = read_workbook(bytes)?;
    let parsed = parse_grid(&grid);
    apply(conn, month, &parsed, now)
}
