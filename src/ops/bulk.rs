//! Batch writes of measurement rows keyed by (substation, month, row name).
//!
//! Rows are applied one at a time in input order. A row that fails
//! validation, names an unknown substation, or (in update-only mode) has no
//! stored counterpart is recorded in [`BulkOutcome::errors`] and the batch
//! moves on. Only storage failures abort the batch.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{GarduError, Result};
use crate::measure::coerce::{lenient_id, lenient_string};
use crate::measure::{Measurement, Month, RawReadings, RowName, Shift};
use crate::store::{measurements, substations};

/// One row of a bulk request. Any JSON object parses; the key fields are
/// checked by [`MeasurementInput::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeasurementInput {
    #[serde(
        default,
        rename = "substationId",
        alias = "substation_id",
        deserialize_with = "lenient_id"
    )]
    pub substation_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub row_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub month: String,
    #[serde(flatten)]
    pub raw: RawReadings,
}

/// A row whose natural key has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RowKey {
    pub substation_id: i64,
    pub month: Month,
    pub row_name: RowName,
}

impl MeasurementInput {
    /// Checks that the natural key is present and well formed.
    ///
    /// # Errors
    ///
    /// Returns [`GarduError::Validation`] naming the first bad key field.
    pub fn validate(&self) -> Result<RowKey> {
        let substation_id = self
            .substation_id
            .ok_or_else(|| GarduError::Validation("substationId is required".into()))?;
        if self.row_name.is_empty() {
            return Err(GarduError::Validation("row_name is required".into()));
        }
        if self.month.is_empty() {
            return Err(GarduError::Validation("month is required".into()));
        }
        Ok(RowKey {
            substation_id,
            row_name: self.row_name.parse()?,
            month: Month::parse(&self.month)?,
        })
    }
}

/// How rows without a stored counterpart are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Insert missing rows.
    Upsert,
    /// Report missing rows as errors.
    UpdateOnly,
}

/// A rejected input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// Position in the input (0-based for JSON batches, 1-based sheet row for imports).
    pub index: usize,
    #[serde(rename = "substationId", skip_serializing_if = "Option::is_none")]
    pub substation_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(rename = "error")]
    pub message: String,
}

impl RowError {
    /// An error with no key context, used for sheet-level problems.
    pub fn at(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            substation_id: None,
            row_name: None,
            month: None,
            message: message.into(),
        }
    }

    fn for_input(index: usize, input: &MeasurementInput, message: impl Into<String>) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            index,
            substation_id: input.substation_id,
            row_name: non_empty(&input.row_name),
            month: non_empty(&input.month),
            message: message.into(),
        }
    }
}

/// Written rows and per-row rejections of one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub updated: Vec<Measurement>,
    pub errors: Vec<RowError>,
}

impl BulkOutcome {
    /// No row was written. An empty batch counts as a failure.
    pub fn is_failure(&self) -> bool {
        self.updated.is_empty()
    }
}

/// Strips the category prefix so row errors read as plain messages.
fn row_message(err: GarduError) -> String {
    match err {
        GarduError::Validation(msg) | GarduError::NotFound(msg) => msg,
        other => other.to_string(),
    }
}

struct Batch<'a> {
    conn: &'a Connection,
    shift: Shift,
    mode: WriteMode,
    now: &'a str,
    rated: HashMap<i64, Option<f64>>,
    outcome: BulkOutcome,
}

impl Batch<'_> {
    fn rated_power(&mut self, id: i64) -> Result<Option<f64>> {
        if let Some(&cached) = self.rated.get(&id) {
            return Ok(cached);
        }
        let rated = substations::rated_power(self.conn, id)?;
        self.rated.insert(id, rated);
        Ok(rated)
    }

    fn apply(&mut self, index: usize, input: &MeasurementInput) -> Result<()> {
        let key = match input.validate() {
            Ok(key) => key,
            Err(e) => {
                self.reject(index, input, row_message(e));
                return Ok(());
            }
        };
        let Some(rated) = self.rated_power(key.substation_id)? else {
            self.reject(index, input, format!("substation {} not found", key.substation_id));
            return Ok(());
        };

        let record = Measurement {
            substation_id: key.substation_id,
            month: key.month,
            row_name: key.row_name,
            raw: input.raw,
            derived: input.raw.derive(rated),
            last_update: Some(self.now.to_string()),
        };
        match self.mode {
            WriteMode::Upsert => measurements::upsert(self.conn, self.shift, &record)?,
            WriteMode::UpdateOnly => {
                if !measurements::update(self.conn, self.shift, &record)? {
                    self.reject(index, input, "not found for update");
                    return Ok(());
                }
            }
        }
        self.outcome.updated.push(record);
        Ok(())
    }

    fn reject(&mut self, index: usize, input: &MeasurementInput, message: impl Into<String>) {
        let err = RowError::for_input(index, input, message);
        debug!(index, error = %err.message, "bulk row rejected");
        self.outcome.errors.push(err);
    }

    fn finish(self) -> BulkOutcome {
        if !self.outcome.errors.is_empty() {
            warn!(
                shift = %self.shift,
                written = self.outcome.updated.len(),
                rejected = self.outcome.errors.len(),
                "bulk write finished with rejected rows"
            );
        }
        self.outcome
    }
}

/// Applies already-typed rows in order.
#[cfg(test)]
pub(crate) fn apply_batch(
    conn: &Connection,
    shift: Shift,
    rows: &[MeasurementInput],
    mode: WriteMode,
    now: &str,
) -> Result<BulkOutcome> {
    let mut batch = Batch {
        conn,
        shift,
        mode,
        now,
        rated: HashMap::new(),
        outcome: BulkOutcome::default(),
    };
    for (index, input) in rows.iter().enumerate() {
        batch.apply(index, input)?;
    }
    Ok(batch.finish())
}

/// Applies JSON rows in order. Each element is parsed on its own, so a
/// malformed element is rejected alone instead of failing the whole request.
///
/// # Errors
///
/// Returns an error only when the store fails; row problems are collected
/// in the outcome.
pub fn apply_json_batch(
    conn: &Connection,
    shift: Shift,
    rows: &[Value],
    mode: WriteMode,
    now: &str,
) -> Result<BulkOutcome> {
    let mut batch = Batch {
        conn,
        shift,
        mode,
        now,
        rated: HashMap::new(),
        outcome: BulkOutcome::default(),
    };
    for (index, value) in rows.iter().enumerate() {
        match MeasurementInput::deserialize(value) {
            Ok(input) => batch.apply(index, &input)?,
            Err(e) => batch
                .outcome
                .errors
                .push(RowError::at(index, format!("row is not a measurement object: {e}"))),
        }
    }
    Ok(batch.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::normalize::ensure_rows;
    use crate::store::Store;
    use crate::substation::SubstationFields;
    use serde_json::json;

    fn setup() -> (Store, i64) {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .write(|c| {
                let fields = SubstationFields {
                    no_gardu: "KB-200".into(),
                    daya: "200".into(),
                    ..SubstationFields::default()
                };
                let s = substations::insert(c, &fields, "t0")?;
                ensure_rows(c, s.id, &Month::parse("2024-01")?)?;
                Ok(s.id)
            })
            .unwrap();
        (store, id)
    }

    #[test]
    fn input_parses_loose_json() {
        let input: MeasurementInput = serde_json::from_value(json!({
            "substationId": "3",
            "row_name": "INDUK",
            "month": "2024-01",
            "r": "95",
            "s": 102,
            "rata2": 999,
        }))
        .unwrap();
        assert_eq!(input.substation_id, Some(3));
        assert_eq!(input.raw.r, 95.0);
        assert_eq!(input.raw.t, 0.0);
        let key = input.validate().unwrap();
        assert_eq!(key.row_name, RowName::Induk);
    }

    #[test]
    fn missing_key_fields_are_named() {
        let input = MeasurementInput {
            substation_id: Some(1),
            row_name: "1".into(),
            ..MeasurementInput::default()
        };
        let err = input.validate().unwrap_err();
        assert_eq!(row_message(err), "month is required");
    }

    #[test]
    fn partial_batch_keeps_going() {
        let (store, id) = setup();
        let rows = vec![
            json!({"substationId": id, "row_name": "induk", "month": "2024-01", "r": 95, "s": 102, "t": 121, "pp": 413}),
            json!({"substationId": id, "row_name": "1"}),
            json!({"substationId": id, "row_name": "2", "month": "2024-01", "r": 10}),
        ];
        let outcome = store
            .write(|c| apply_json_batch(c, Shift::Siang, &rows, WriteMode::UpdateOnly, "t1"))
            .unwrap();
        assert_eq!(outcome.updated.len(), 2);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 1);
        assert_eq!(outcome.errors[0].message, "month is required");
        assert!((outcome.updated[0].derived.imbalance_percent - 28.30188).abs() < 1e-4);
        assert_eq!(outcome.updated[0].last_update.as_deref(), Some("t1"));
    }

    #[test]
    fn update_only_reports_missing_rows() {
        let (store, id) = setup();
        let rows = vec![json!({"substationId": id, "row_name": "3", "month": "2024-02"})];
        let outcome = store
            .write(|c| apply_json_batch(c, Shift::Malam, &rows, WriteMode::UpdateOnly, "t1"))
            .unwrap();
        assert!(outcome.is_failure());
        assert_eq!(outcome.errors[0].message, "not found for update");
        assert_eq!(outcome.errors[0].month.as_deref(), Some("2024-02"));
    }

    #[test]
    fn upsert_inserts_then_updates_same_key() {
        let (store, id) = setup();
        let first = vec![json!({"substationId": id, "row_name": "4", "month": "2024-02", "r": 1})];
        let second = vec![json!({"substationId": id, "row_name": "4", "month": "2024-02", "r": 2})];
        store
            .write(|c| apply_json_batch(c, Shift::Malam, &first, WriteMode::Upsert, "t1"))
            .unwrap();
        store
            .write(|c| apply_json_batch(c, Shift::Malam, &second, WriteMode::Upsert, "t2"))
            .unwrap();
        let month = Month::parse("2024-02").unwrap();
        let rows = store
            .read(|c| measurements::list_for_substation(c, Shift::Malam, id, Some(&month)))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].raw.r, 2.0);
    }

    #[test]
    fn unknown_substation_and_garbage_rows_are_rejected() {
        let (store, _) = setup();
        let rows = vec![
            json!({"substationId": 999, "row_name": "induk", "month": "2024-01"}),
            json!("not an object"),
            json!({"substationId": 1, "row_name": "5", "month": "2024-01"}),
        ];
        let outcome = store
            .write(|c| apply_json_batch(c, Shift::Siang, &rows, WriteMode::Upsert, "t1"))
            .unwrap();
        assert!(outcome.is_failure());
        let indices: Vec<usize> = outcome.errors.iter().map(|e| e.index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(outcome.errors[0].message, "substation 999 not found");
    }

    #[test]
    fn empty_batch_is_a_failure() {
        let (store, _) = setup();
        let outcome = store
            .write(|c| apply_batch(c, Shift::Siang, &[], WriteMode::Upsert, "t1"))
            .unwrap();
        assert!(outcome.is_failure());
        assert!(outcome.errors.is_empty());
    }
}
