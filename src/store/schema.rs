use rusqlite::Connection;

use crate::error::Result;
use crate::measure::Shift;

pub const SCHEMA_VERSION: i64 = 1;

const SUBSTATIONS_DDL: &str = "
CREATE TABLE IF NOT EXISTS substations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  no INTEGER,
  ulp TEXT NOT NULL DEFAULT '',
  no_gardu TEXT NOT NULL COLLATE NOCASE UNIQUE,
  nama_lokasi TEXT NOT NULL DEFAULT '',
  jenis TEXT NOT NULL DEFAULT '',
  merek TEXT NOT NULL DEFAULT '',
  daya TEXT NOT NULL DEFAULT '',
  tahun TEXT NOT NULL DEFAULT '',
  phasa TEXT NOT NULL DEFAULT '',
  tap TEXT NOT NULL DEFAULT '',
  penyulang TEXT NOT NULL DEFAULT '',
  arah_sequence TEXT NOT NULL DEFAULT '',
  tanggal_pasang TEXT NOT NULL DEFAULT '',
  status TEXT NOT NULL DEFAULT 'normal',
  is_active INTEGER NOT NULL DEFAULT 1,
  ugb INTEGER NOT NULL DEFAULT 0,
  latitude REAL,
  longitude REAL,
  photo_url TEXT,
  last_update TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_substations_ulp ON substations(ulp);
";

/// DDL for one shift table. The natural key is enforced by the UNIQUE
/// constraint; `row_name` compares case-insensitively.
fn measurement_ddl(shift: Shift) -> String {
    let table = shift.table();
    format!(
        "
CREATE TABLE IF NOT EXISTS {table} (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  substation_id INTEGER NOT NULL REFERENCES substations(id) ON DELETE CASCADE,
  month TEXT NOT NULL,
  row_name TEXT NOT NULL COLLATE NOCASE,
  r REAL NOT NULL DEFAULT 0,
  s REAL NOT NULL DEFAULT 0,
  t REAL NOT NULL DEFAULT 0,
  n REAL NOT NULL DEFAULT 0,
  rn REAL NOT NULL DEFAULT 0,
  sn REAL NOT NULL DEFAULT 0,
  tn REAL NOT NULL DEFAULT 0,
  pp REAL NOT NULL DEFAULT 0,
  pn REAL NOT NULL DEFAULT 0,
  rata2 REAL NOT NULL DEFAULT 0,
  kva REAL NOT NULL DEFAULT 0,
  persen REAL NOT NULL DEFAULT 0,
  unbalanced REAL NOT NULL DEFAULT 0,
  last_update TEXT,
  UNIQUE (substation_id, month, row_name)
);
CREATE INDEX IF NOT EXISTS idx_{table}_month ON {table}(month);
"
    )
}

/// Creates tables and indexes if missing and stamps `user_version`.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SUBSTATIONS_DDL)?;
    for shift in Shift::ALL {
        conn.execute_batch(&measurement_ddl(shift))?;
    }
    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    Ok(())
}
