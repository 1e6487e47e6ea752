//! Measurement table access, one table per shift.
//!
//! Rows are addressed by their natural key (substation, month, row name).
//! Row names are stored in canonical lowercase and compared with NOCASE.

use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};

use crate::error::Result;
use crate::measure::{DerivedMetrics, Measurement, Month, RawReadings, RowName, Shift};

const COLUMNS: &str = "substation_id, month, row_name, r, s, t, n, rn, sn, tn, pp, pn, \
                       rata2, kva, persen, unbalanced, last_update";

/// Sorts `induk` first, then circuits 1 to 4.
const ROW_ORDER: &str =
    "CASE lower(row_name) WHEN 'induk' THEN 0 ELSE CAST(row_name AS INTEGER) END";

fn conversion<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Measurement> {
    let month: String = row.get(1)?;
    let row_name: String = row.get(2)?;
    Ok(Measurement {
        substation_id: row.get(0)?,
        month: Month::parse(&month).map_err(|e| conversion(1, e))?,
        row_name: row_name.parse::<RowName>().map_err(|e| conversion(2, e))?,
        raw: RawReadings {
            r: row.get(3)?,
            s: row.get(4)?,
            t: row.get(5)?,
            n: row.get(6)?,
            rn: row.get(7)?,
            sn: row.get(8)?,
            tn: row.get(9)?,
            pp: row.get(10)?,
            pn: row.get(11)?,
        },
        derived: DerivedMetrics {
            average: row.get(12)?,
            apparent_power_kva: row.get(13)?,
            load_percent: row.get(14)?,
            imbalance_percent: row.get(15)?,
        },
        last_update: row.get(16)?,
    })
}

/// Finds the row for a natural key.
#[cfg(test)]
pub(crate) fn find(
    conn: &Connection,
    shift: Shift,
    substation_id: i64,
    month: &Month,
    row_name: RowName,
) -> Result<Option<Measurement>> {
    use rusqlite::OptionalExtension;

    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE substation_id = ?1 AND month = ?2 AND row_name = ?3",
        shift.table()
    );
    Ok(conn
        .query_row(
            &sql,
            params![substation_id, month.as_str(), row_name.as_str()],
            from_row,
        )
        .optional()?)
}

/// Inserts a full row. Fails on a natural-key conflict.
pub fn insert(conn: &Connection, shift: Shift, m: &Measurement) -> Result<()> {
    let sql = format!(
        "INSERT INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        shift.table()
    );
    conn.execute(
        &sql,
        params![
            m.substation_id,
            m.month.as_str(),
            m.row_name.as_str(),
            m.raw.r,
            m.raw.s,
            m.raw.t,
            m.raw.n,
            m.raw.rn,
            m.raw.sn,
            m.raw.tn,
            m.raw.pp,
            m.raw.pn,
            m.derived.average,
            m.derived.apparent_power_kva,
            m.derived.load_percent,
            m.derived.imbalance_percent,
            m.last_update,
        ],
    )?;
    Ok(())
}

/// Replaces readings, metrics, and timestamp of the row matching `m`'s key.
///
/// Returns `false` when no row has that key.
pub fn update(conn: &Connection, shift: Shift, m: &Measurement) -> Result<bool> {
    let sql = format!(
        "UPDATE {} SET r = ?4, s = ?5, t = ?6, n = ?7, rn = ?8, sn = ?9, tn = ?10, pp = ?11,
           pn = ?12, rata2 = ?13, kva = ?14, persen = ?15, unbalanced = ?16, last_update = ?17
         WHERE substation_id = ?1 AND month = ?2 AND row_name = ?3",
        shift.table()
    );
    let changed = conn.execute(
        &sql,
        params![
            m.substation_id,
            m.month.as_str(),
            m.row_name.as_str(),
            m.raw.r,
            m.raw.s,
            m.raw.t,
            m.raw.n,
            m.raw.rn,
            m.raw.sn,
            m.raw.tn,
            m.raw.pp,
            m.raw.pn,
            m.derived.average,
            m.derived.apparent_power_kva,
            m.derived.load_percent,
            m.derived.imbalance_percent,
            m.last_update,
        ],
    )?;
    Ok(changed > 0)
}

/// Updates a row if present, inserts it otherwise.
pub fn upsert(conn: &Connection, shift: Shift, m: &Measurement) -> Result<()> {
    if !update(conn, shift, m)? {
        insert(conn, shift, m)?;
    }
    Ok(())
}

/// Overwrites only the derived metrics of a row, leaving `last_update` alone.
pub fn set_derived(
    conn: &Connection,
    shift: Shift,
    substation_id: i64,
    month: &Month,
    row_name: RowName,
    derived: &DerivedMetrics,
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET rata2 = ?4, kva = ?5, persen = ?6, unbalanced = ?7
         WHERE substation_id = ?1 AND month = ?2 AND row_name = ?3",
        shift.table()
    );
    conn.execute(
        &sql,
        params![
            substation_id,
            month.as_str(),
            row_name.as_str(),
            derived.average,
            derived.apparent_power_kva,
            derived.load_percent,
            derived.imbalance_percent,
        ],
    )?;
    Ok(())
}

/// Inserts an all-zero row unless one already exists for the key.
///
/// Returns `true` when a row was created.
pub fn insert_placeholder_if_missing(
    conn: &Connection,
    shift: Shift,
    substation_id: i64,
    month: &Month,
    row_name: RowName,
) -> Result<bool> {
    let sql = format!(
        "INSERT OR IGNORE INTO {} (substation_id, month, row_name) VALUES (?1, ?2, ?3)",
        shift.table()
    );
    let inserted = conn.execute(&sql, params![substation_id, month.as_str(), row_name.as_str()])?;
    Ok(inserted > 0)
}

/// Rows of one substation, optionally restricted to a month, in sheet order.
pub fn list_for_substation(
    conn: &Connection,
    shift: Shift,
    substation_id: i64,
    month: Option<&Month>,
) -> Result<Vec<Measurement>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE substation_id = ?1 AND (?2 IS NULL OR month = ?2)
         ORDER BY month, {ROW_ORDER}",
        shift.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![substation_id, month.map(Month::as_str)], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// All rows of a month across substations, grouped by substation in sheet order.
pub fn list_for_month(conn: &Connection, shift: Shift, month: &Month) -> Result<Vec<Measurement>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} WHERE month = ?1 ORDER BY substation_id, {ROW_ORDER}",
        shift.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([month.as_str()], from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

#[cfg(test)]
pub(crate) fn count(conn: &Connection, shift: Shift) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", shift.table());
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}
