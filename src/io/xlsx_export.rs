//! Monitoring workbook export in the same layout the importer reads.

use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};

use super::layout::{self, HEADER_ROWS};
use crate::error::Result;
use crate::measure::{Measurement, RowName, Shift, format_percent};
use crate::ops::snapshot::MonthSnapshot;
use crate::substation::Substation;

fn write_text(ws: &mut Worksheet, row: u32, col: usize, value: &str) -> Result<()> {
    if !value.is_empty() {
        ws.write_string(row, col as u16, value)?;
    }
    Ok(())
}

fn write_header(ws: &mut Worksheet, snapshot: &MonthSnapshot) -> Result<()> {
    let bold = Format::new().set_bold().set_align(FormatAlign::Center);
    let last = (layout::COLUMN_COUNT - 1) as u16;
    ws.merge_range(
        0,
        0,
        0,
        last,
        &format!("MONITORING GARDU {}", snapshot.month),
        &bold,
    )?;
    ws.merge_range(1, 0, 1, (layout::JURUSAN) as u16, "DATA GARDU", &bold)?;
    for shift in Shift::ALL {
        let first = layout::raw_start(shift) as u16;
        let end = (layout::derived_start(shift) + layout::DERIVED_HEADERS.len() - 1) as u16;
        ws.merge_range(1, first, 1, end, layout::shift_title(shift), &bold)?;
    }

    let header_row = (HEADER_ROWS - 1) as u32;
    for (col, title) in layout::METADATA_HEADERS.iter().enumerate() {
        ws.write_string_with_format(header_row, col as u16, *title, &bold)?;
    }
    for shift in Shift::ALL {
        let titles = layout::RAW_HEADERS.iter().chain(layout::DERIVED_HEADERS.iter());
        for (offset, title) in titles.enumerate() {
            let col = (layout::raw_start(shift) + offset) as u16;
            ws.write_string_with_format(header_row, col, *title, &bold)?;
        }
    }
    Ok(())
}

fn write_metadata(ws: &mut Worksheet, row: u32, position: usize, s: &Substation) -> Result<()> {
    let f = &s.fields;
    let no = f.no.unwrap_or(position as i64 + 1);
    ws.write_number(row, layout::NO as u16, no as f64)?;
    write_text(ws, row, layout::ULP, &f.ulp)?;
    write_text(ws, row, layout::NO_GARDU, &f.no_gardu)?;
    write_text(ws, row, layout::NAMA_LOKASI, &f.nama_lokasi)?;
    write_text(ws, row, layout::JENIS, &f.jenis)?;
    write_text(ws, row, layout::MEREK, &f.merek)?;
    write_text(ws, row, layout::DAYA, &f.daya)?;
    write_text(ws, row, layout::TAHUN, &f.tahun)?;
    write_text(ws, row, layout::PHASA, &f.phasa)?;
    write_text(ws, row, layout::TAP, &f.tap)?;
    write_text(ws, row, layout::PENYULANG, &f.penyulang)?;
    write_text(ws, row, layout::ARAH_SEQUENCE, &f.arah_sequence)?;
    Ok(())
}

fn write_measurement(ws: &mut Worksheet, row: u32, shift: Shift, m: &Measurement) -> Result<()> {
    let raw = &m.raw;
    let start = layout::raw_start(shift);
    let values = [raw.r, raw.s, raw.t, raw.n, raw.rn, raw.sn, raw.tn, raw.pp, raw.pn];
    for (offset, value) in values.into_iter().enumerate() {
        ws.write_number(row, (start + offset) as u16, value)?;
    }
    let d = &m.derived;
    let col = layout::derived_start(shift) as u16;
    ws.write_number(row, col, d.average)?;
    ws.write_number(row, col + 1, d.apparent_power_kva)?;
    ws.write_string(row, col + 2, format_percent(d.load_percent))?;
    ws.write_string(row, col + 3, format_percent(d.imbalance_percent))?;
    Ok(())
}

/// Renders a month as an xlsx workbook.
///
/// Every substation gets a full five-row group; rows never created are
/// written as zeros. Load and imbalance are written as text (`"37.9%"`).
///
/// # Errors
///
/// Returns [`crate::error::GarduError::Export`] if the workbook cannot be
/// assembled.
pub fn export_xlsx(snapshot: &MonthSnapshot) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(format!("Gardu {}", snapshot.month))?;
    ws.set_column_width(layout::NAMA_LOKASI as u16, 28)?;
    write_header(ws, snapshot)?;

    for (position, s) in snapshot.substations.iter().enumerate() {
        let first = (HEADER_ROWS + position * layout::GROUP_ROWS) as u32;
        write_metadata(ws, first, position, s)?;
        let siang = snapshot.sheet_rows(Shift::Siang, s.id);
        let malam = snapshot.sheet_rows(Shift::Malam, s.id);
        for (k, row_name) in RowName::ALL.into_iter().enumerate() {
            let row = first + k as u32;
            ws.write_string(row, layout::JURUSAN as u16, row_name.label())?;
            write_measurement(ws, row, Shift::Siang, &siang[k])?;
            write_measurement(ws, row, Shift::Malam, &malam[k])?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::xlsx_import::{Cell, parse_grid, read_workbook};
    use crate::measure::Month;
    use crate::store::Store;

    #[test]
    fn empty_month_has_header_only() {
        let store = Store::open_in_memory().unwrap();
        let month = Month::parse("2024-10").unwrap();
        let snap = store.read(|c| MonthSnapshot::load(c, &month)).unwrap();
        let bytes = export_xlsx(&snap).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let grid = read_workbook(&bytes).unwrap();
        assert_eq!(grid.len(), HEADER_ROWS);
        assert_eq!(grid[2][layout::NO_GARDU], Cell::Text("NO GARDU".into()));
        assert_eq!(grid[2][layout::derived_start(Shift::Malam) + 2], Cell::Text("%".into()));
        assert!(parse_grid(&grid).groups.is_empty());
    }
}
