//! Fixed column layout of the monitoring workbook, shared by the importer
//! and the exporter. Changing the sheet format means changing these
//! constants.

use crate::measure::Shift;

/// Title, group header, column header.
pub const HEADER_ROWS: usize = 3;

/// Data rows per substation: INDUK, 1, 2, 3, 4.
pub const GROUP_ROWS: usize = 5;

pub const NO: usize = 0;
pub const ULP: usize = 1;
pub const NO_GARDU: usize = 2;
pub const NAMA_LOKASI: usize = 3;
pub const JENIS: usize = 4;
pub const MEREK: usize = 5;
pub const DAYA: usize = 6;
pub const TAHUN: usize = 7;
pub const PHASA: usize = 8;
pub const TAP: usize = 9;
pub const PENYULANG: usize = 10;
pub const ARAH_SEQUENCE: usize = 11;
pub const JURUSAN: usize = 12;

pub const METADATA_HEADERS: [&str; 13] = [
    "NO",
    "ULP",
    "NO GARDU",
    "NAMA/LOKASI",
    "JENIS",
    "MEREK",
    "DAYA",
    "TAHUN",
    "PHASA",
    "TAP",
    "PENYULANG",
    "ARAH SEQUENCE",
    "JURUSAN",
];

/// Raw reading headers in column order: r, s, t, n, rn, sn, tn, pp, pn.
pub const RAW_HEADERS: [&str; 9] = ["R", "S", "T", "N", "R-N", "S-N", "T-N", "P-P", "P-N"];

pub const DERIVED_HEADERS: [&str; 4] = ["RATA2", "KVA", "%", "UNBALANCED"];

/// Total columns in a data row.
pub const COLUMN_COUNT: usize = 39;

/// First raw-reading column of a shift.
pub fn raw_start(shift: Shift) -> usize {
    match shift {
        Shift::Siang => 13,
        Shift::Malam => 26,
    }
}

/// First derived-metric column of a shift.
pub fn derived_start(shift: Shift) -> usize {
    raw_start(shift) + RAW_HEADERS.len()
}

/// Group header text above a shift's columns.
pub fn shift_title(shift: Shift) -> &'static str {
    match shift {
        Shift::Siang => "PENGUKURAN SIANG",
        Shift::Malam => "PENGUKURAN MALAM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_blocks_tile_the_row() {
        assert_eq!(METADATA_HEADERS.len(), raw_start(Shift::Siang));
        assert_eq!(derived_start(Shift::Siang), 22);
        assert_eq!(derived_start(Shift::Siang) + DERIVED_HEADERS.len(), raw_start(Shift::Malam));
        assert_eq!(derived_start(Shift::Malam), 35);
        assert_eq!(derived_start(Shift::Malam) + DERIVED_HEADERS.len(), COLUMN_COUNT);
    }
}
