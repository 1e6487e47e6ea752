//! Core measurement types: the fixed row-name domain, shifts, months, and
//! the stored record shape.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::calculator::{DerivedMetrics, calculate};
use super::coerce::lenient_f64;
use crate::error::{GarduError, Result};

/// One of the five measured circuits of a substation.
///
/// Stored lowercase; matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum RowName {
    /// Main feed.
    #[serde(rename = "induk")]
    Induk,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
}

impl RowName {
    /// The fixed domain, in sheet order.
    pub const ALL: [RowName; 5] = [
        RowName::Induk,
        RowName::One,
        RowName::Two,
        RowName::Three,
        RowName::Four,
    ];

    /// Canonical stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Induk => "induk",
            Self::One => "1",
            Self::Two => "2",
            Self::Three => "3",
            Self::Four => "4",
        }
    }

    /// Label used in spreadsheet exports (`INDUK`, `1`, ...).
    pub fn label(self) -> &'static str {
        match self {
            Self::Induk => "INDUK",
            other => other.as_str(),
        }
    }
}

impl FromStr for RowName {
    type Err = GarduError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|row| row.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                GarduError::Validation(format!(
                    "row_name \"{raw}\" is not one of induk, 1, 2, 3, 4"
                ))
            })
    }
}

impl fmt::Display for RowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Measurement shift. Each shift lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    /// Day measurement.
    Siang,
    /// Night measurement.
    Malam,
}

impl Shift {
    pub const ALL: [Shift; 2] = [Shift::Siang, Shift::Malam];

    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Siang => "siang_measurements",
            Self::Malam => "malam_measurements",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Siang => "siang",
            Self::Malam => "malam",
        }
    }
}

impl FromStr for Shift {
    type Err = GarduError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "siang" => Ok(Self::Siang),
            "malam" => Ok(Self::Malam),
            _ => Err(GarduError::Validation(format!(
                "shift \"{raw}\" must be siang or malam"
            ))),
        }
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A calendar month in `YYYY-MM` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month(String);

impl Month {
    /// Validates and wraps a `YYYY-MM` string.
    ///
    /// # Errors
    ///
    /// Returns [`GarduError::Validation`] when the value is not a real month.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let valid = trimmed.len() == 7
            && NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d").is_ok();
        if valid {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(GarduError::Validation(format!(
                "month \"{raw}\" must be formatted as YYYY-MM"
            )))
        }
    }

    /// The current month in UTC.
    pub fn current() -> Self {
        Self(Utc::now().format("%Y-%m").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The following month (`2024-12` → `2025-01`).
    pub fn next(&self) -> Self {
        self.shift_by(1)
    }

    /// The preceding month (`2024-01` → `2023-12`).
    pub fn prev(&self) -> Self {
        self.shift_by(-1)
    }

    fn shift_by(&self, delta: i32) -> Self {
        let (year, month) = self
            .0
            .split_once('-')
            .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<i32>().ok()?)))
            .unwrap_or((1970, 1));
        let index = year * 12 + (month - 1) + delta;
        Self(format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1))
    }
}

impl TryFrom<String> for Month {
    type Error = GarduError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Raw readings of one measurement row.
///
/// Every field deserializes leniently: missing, null, or non-numeric input
/// becomes `0.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReadings {
    /// Phase R current (A).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub r: f64,
    /// Phase S current (A).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub s: f64,
    /// Phase T current (A).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub t: f64,
    /// Neutral current (A).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub n: f64,
    /// R to neutral voltage (V).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rn: f64,
    /// S to neutral voltage (V).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sn: f64,
    /// T to neutral voltage (V).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tn: f64,
    /// Phase-to-phase voltage (V).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pp: f64,
    /// End-of-line phase-to-neutral voltage (V).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub pn: f64,
}

impl RawReadings {
    /// Runs the calculator on these readings.
    pub fn derive(&self, rated_power_kva: f64) -> DerivedMetrics {
        calculate(self.r, self.s, self.t, self.pp, rated_power_kva)
    }
}

/// A stored measurement row, serialized in the public record shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    #[serde(rename = "substationId")]
    pub substation_id: i64,
    pub month: Month,
    pub row_name: RowName,
    #[serde(flatten)]
    pub raw: RawReadings,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    /// RFC 3339 timestamp of the last write, if any.
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<String>,
}

impl Measurement {
    /// An all-zero row for the given key.
    pub fn placeholder(substation_id: i64, month: Month, row_name: RowName) -> Self {
        Self {
            substation_id,
            month,
            row_name,
            raw: RawReadings::default(),
            derived: DerivedMetrics::default(),
            last_update: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_name_matches_case_insensitively() {
        assert_eq!("INDUK".parse::<RowName>().ok(), Some(RowName::Induk));
        assert_eq!(" Induk ".parse::<RowName>().ok(), Some(RowName::Induk));
        assert_eq!("3".parse::<RowName>().ok(), Some(RowName::Three));
        assert!("5".parse::<RowName>().is_err());
        assert!("".parse::<RowName>().is_err());
    }

    #[test]
    fn row_name_domain_is_fixed() {
        let names: Vec<&str> = RowName::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, ["induk", "1", "2", "3", "4"]);
    }

    #[test]
    fn shift_parses_and_maps_to_table() {
        assert_eq!("MALAM".parse::<Shift>().ok(), Some(Shift::Malam));
        assert_eq!(Shift::Siang.table(), "siang_measurements");
        assert!("pagi".parse::<Shift>().is_err());
    }

    #[test]
    fn display_honors_width_and_alignment() {
        assert_eq!(format!("[{:<6}]", Shift::Siang), "[siang ]");
        assert_eq!(format!("[{:>5}]", RowName::One), "[    1]");
        assert_eq!(format!("[{:^9}]", Month::parse("2024-05").unwrap()), "[ 2024-05 ]");
    }

    #[test]
    fn month_validation() {
        assert!(Month::parse("2024-03").is_ok());
        assert!(Month::parse("2024-13").is_err());
        assert!(Month::parse("2024-3").is_err());
        assert!(Month::parse("March").is_err());
        assert_eq!(Month::current().as_str().len(), 7);
    }

    #[test]
    fn month_steps_across_years() {
        let dec = Month::parse("2024-12").unwrap();
        assert_eq!(dec.next().as_str(), "2025-01");
        assert_eq!(dec.prev().as_str(), "2024-11");
        let jan = Month::parse("2024-01").unwrap();
        assert_eq!(jan.prev().as_str(), "2023-12");
    }

    #[test]
    fn raw_readings_coerce_missing_and_garbage() {
        let raw: RawReadings =
            serde_json::from_str(r#"{"r": "95", "s": 102, "t": null, "pp": "abc"}"#)
                .unwrap_or_default();
        assert_eq!(raw.r, 95.0);
        assert_eq!(raw.s, 102.0);
        assert_eq!(raw.t, 0.0);
        assert_eq!(raw.pp, 0.0);
        assert_eq!(raw.n, 0.0);
    }

    #[test]
    fn measurement_serializes_record_shape() {
        let month = Month::parse("2024-05").unwrap_or_else(|_| Month::current());
        let m = Measurement::placeholder(4, month, RowName::Induk);
        let json = serde_json::to_value(&m).unwrap_or_default();
        assert_eq!(json["substationId"], 4);
        assert_eq!(json["month"], "2024-05");
        assert_eq!(json["row_name"], "induk");
        for key in [
            "r", "s", "t", "n", "rn", "sn", "tn", "pp", "pn", "rata2", "kva", "persen",
            "unbalanced", "lastUpdate",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
    }
}
