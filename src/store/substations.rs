//! Substation table access.

use rusqlite::types::{Type, Value};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params, params_from_iter};
use serde::Deserialize;

use crate::error::{GarduError, Result};
use crate::substation::{Substation, SubstationFields, SubstationStatus};

const COLUMNS: &str = "id, no, ulp, no_gardu, nama_lokasi, jenis, merek, daya, tahun, phasa, \
                       tap, penyulang, arah_sequence, tanggal_pasang, status, is_active, ugb, \
                       latitude, longitude, photo_url, last_update";

/// Optional list filters; all present filters must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubstationFilter {
    /// Exact ULP match, case-insensitive.
    pub ulp: Option<String>,
    pub status: Option<SubstationStatus>,
    /// Substring over gardu number, location name, and feeder.
    pub q: Option<String>,
    pub active: Option<bool>,
}

fn from_row(row: &Row<'_>) -> rusqlite::Result<Substation> {
    let status: String = row.get(14)?;
    let status = status
        .parse::<SubstationStatus>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(14, Type::Text, Box::new(e)))?;
    Ok(Substation {
        id: row.get(0)?,
        fields: SubstationFields {
            no: row.get(1)?,
            ulp: row.get(2)?,
            no_gardu: row.get(3)?,
            nama_lokasi: row.get(4)?,
            jenis: row.get(5)?,
            merek: row.get(6)?,
            daya: row.get(7)?,
            tahun: row.get(8)?,
            phasa: row.get(9)?,
            tap: row.get(10)?,
            penyulang: row.get(11)?,
            arah_sequence: row.get(12)?,
            tanggal_pasang: row.get(13)?,
            status,
            is_active: row.get(15)?,
            ugb: row.get(16)?,
            latitude: row.get(17)?,
            longitude: row.get(18)?,
            photo_url: row.get(19)?,
        },
        last_update: row.get(20)?,
    })
}

fn duplicate_or(err: rusqlite::Error, no_gardu: &str) -> GarduError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            GarduError::Validation(format!("noGardu \"{no_gardu}\" already exists"))
        }
        _ => err.into(),
    }
}

/// Inserts a new substation after validating its fields.
///
/// # Errors
///
/// Returns [`GarduError::Validation`] for invalid fields or a duplicate
/// gardu number.
pub fn insert(conn: &Connection, fields: &SubstationFields, now: &str) -> Result<Substation> {
    fields.validate()?;
    let no_gardu = fields.no_gardu.trim();
    conn.execute(
        "INSERT INTO substations (
           no, ulp, no_gardu, nama_lokasi, jenis, merek, daya, tahun, phasa, tap,
           penyulang, arah_sequence, tanggal_pasang, status, is_active, ugb,
           latitude, longitude, photo_url, last_update
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
        params![
            fields.no,
            fields.ulp,
            no_gardu,
            fields.nama_lokasi,
            fields.jenis,
            fields.merek,
            fields.daya,
            fields.tahun,
            fields.phasa,
            fields.tap,
            fields.penyulang,
            fields.arah_sequence,
            fields.tanggal_pasang,
            fields.status.as_str(),
            fields.is_active,
            fields.ugb,
            fields.latitude,
            fields.longitude,
            fields.photo_url,
            now,
        ],
    )
    .map_err(|e| duplicate_or(e, no_gardu))?;
    require(conn, conn.last_insert_rowid())
}

pub fn get(conn: &Connection, id: i64) -> Result<Option<Substation>> {
    let sql = format!("SELECT {COLUMNS} FROM substations WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

/// Like [`get`], but a missing substation is an error.
///
/// # Errors
///
/// Returns [`GarduError::NotFound`] if no substation has this id.
pub fn require(conn: &Connection, id: i64) -> Result<Substation> {
    get(conn, id)?.ok_or_else(|| GarduError::NotFound(format!("substation {id}")))
}

/// Looks up a substation by gardu number, case-insensitively.
pub fn find_by_gardu(conn: &Connection, no_gardu: &str) -> Result<Option<Substation>> {
    let sql = format!("SELECT {COLUMNS} FROM substations WHERE no_gardu = ?1");
    Ok(conn
        .query_row(&sql, [no_gardu.trim()], from_row)
        .optional()?)
}

/// Lists substations in register order.
pub fn list(conn: &Connection, filter: &SubstationFilter) -> Result<Vec<Substation>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(ulp) = filter.ulp.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        values.push(Value::Text(ulp.to_string()));
        clauses.push("ulp = ? COLLATE NOCASE");
    }
    if let Some(status) = filter.status {
        values.push(Value::Text(status.as_str().to_string()));
        clauses.push("status = ?");
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = format!("%{q}%");
        for _ in 0..3 {
            values.push(Value::Text(pattern.clone()));
        }
        clauses.push("(no_gardu LIKE ? OR nama_lokasi LIKE ? OR penyulang LIKE ?)");
    }
    if let Some(active) = filter.active {
        values.push(Value::Integer(i64::from(active)));
        clauses.push("is_active = ?");
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {COLUMNS} FROM substations{where_sql} ORDER BY no IS NULL, no, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

/// Replaces all metadata of an existing substation.
///
/// # Errors
///
/// Returns [`GarduError::NotFound`] if the id is unknown, or
/// [`GarduError::Validation`] for invalid fields or a duplicate gardu number.
pub fn update(
    conn: &Connection,
    id: i64,
    fields: &SubstationFields,
    now: &str,
) -> Result<Substation> {
    fields.validate()?;
    let no_gardu = fields.no_gardu.trim();
    let changed = conn
        .execute(
            "UPDATE substations SET
               no = ?1, ulp = ?2, no_gardu = ?3, nama_lokasi = ?4, jenis = ?5, merek = ?6,
               daya = ?7, tahun = ?8, phasa = ?9, tap = ?10, penyulang = ?11,
               arah_sequence = ?12, tanggal_pasang = ?13, status = ?14, is_active = ?15,
               ugb = ?16, latitude = ?17, longitude = ?18, photo_url = ?19, last_update = ?20
             WHERE id = ?21",
            params![
                fields.no,
                fields.ulp,
                no_gardu,
                fields.nama_lokasi,
                fields.jenis,
                fields.merek,
                fields.daya,
                fields.tahun,
                fields.phasa,
                fields.tap,
                fields.penyulang,
                fields.arah_sequence,
                fields.tanggal_pasang,
                fields.status.as_str(),
                fields.is_active,
                fields.ugb,
                fields.latitude,
                fields.longitude,
                fields.photo_url,
                now,
                id,
            ],
        )
        .map_err(|e| duplicate_or(e, no_gardu))?;
    if changed == 0 {
        return Err(GarduError::NotFound(format!("substation {id}")));
    }
    require(conn, id)
}

/// Deletes a substation; its measurement rows go with it.
///
/// # Errors
///
/// Returns [`GarduError::NotFound`] if the id is unknown.
pub fn delete(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM substations WHERE id = ?1", [id])?;
    if changed == 0 {
        return Err(GarduError::NotFound(format!("substation {id}")));
    }
    Ok(())
}

/// Rated power of one substation, `None` if it does not exist.
pub fn rated_power(conn: &Connection, id: i64) -> Result<Option<f64>> {
    Ok(get(conn, id)?.map(|s| s.rated_power_kva()))
}

pub fn all_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM substations ORDER BY id")?;
    let ids = stmt.query_map([], |row| row.get(0))?;
    Ok(ids.collect::<rusqlite::Result<Vec<i64>>>()?)
}
