//! Substation nameplate data and operational status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GarduError, Result};
use crate::measure::coerce::{leading_f64, lenient_string};

/// Operational status of a substation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubstationStatus {
    #[default]
    Normal,
    Warning,
    Critical,
    NonActive,
}

impl SubstationStatus {
    pub const ALL: [SubstationStatus; 4] = [
        SubstationStatus::Normal,
        SubstationStatus::Warning,
        SubstationStatus::Critical,
        SubstationStatus::NonActive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::NonActive => "non-active",
        }
    }
}

impl FromStr for SubstationStatus {
    type Err = GarduError;

    fn from_str(raw: &str) -> Result<Self> {
        let wanted = raw.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                GarduError::Validation(format!(
                    "status \"{raw}\" must be one of normal, warning, critical, non-active"
                ))
            })
    }
}

impl fmt::Display for SubstationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Writable substation metadata, as sent by clients and read from imports.
///
/// Text fields accept numbers too (`"daya": 200` and `"daya": "200"` are the
/// same), since spreadsheets and older clients send both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubstationFields {
    /// Sequence number within the register.
    pub no: Option<i64>,
    /// Administrative service area.
    #[serde(deserialize_with = "lenient_string")]
    pub ulp: String,
    /// Gardu number; unique, required.
    #[serde(deserialize_with = "lenient_string")]
    pub no_gardu: String,
    #[serde(deserialize_with = "lenient_string")]
    pub nama_lokasi: String,
    #[serde(deserialize_with = "lenient_string")]
    pub jenis: String,
    #[serde(deserialize_with = "lenient_string")]
    pub merek: String,
    /// Rated power in kVA, kept as entered (e.g. `"200"` or `"200 kVA"`).
    #[serde(deserialize_with = "lenient_string")]
    pub daya: String,
    #[serde(deserialize_with = "lenient_string")]
    pub tahun: String,
    /// Phase count.
    #[serde(deserialize_with = "lenient_string")]
    pub phasa: String,
    /// Maximum tap setting.
    #[serde(deserialize_with = "lenient_string")]
    pub tap: String,
    /// Feeder.
    #[serde(deserialize_with = "lenient_string")]
    pub penyulang: String,
    #[serde(deserialize_with = "lenient_string")]
    pub arah_sequence: String,
    /// Installation date, free text.
    #[serde(deserialize_with = "lenient_string")]
    pub tanggal_pasang: String,
    pub status: SubstationStatus,
    pub is_active: bool,
    pub ugb: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub photo_url: Option<String>,
}

impl Default for SubstationFields {
    fn default() -> Self {
        Self {
            no: None,
            ulp: String::new(),
            no_gardu: String::new(),
            nama_lokasi: String::new(),
            jenis: String::new(),
            merek: String::new(),
            daya: String::new(),
            tahun: String::new(),
            phasa: String::new(),
            tap: String::new(),
            penyulang: String::new(),
            arah_sequence: String::new(),
            tanggal_pasang: String::new(),
            status: SubstationStatus::Normal,
            is_active: true,
            ugb: false,
            latitude: None,
            longitude: None,
            photo_url: None,
        }
    }
}

impl SubstationFields {
    /// Rated power parsed from the leading number of `daya`, `0.0` if none.
    pub fn rated_power_kva(&self) -> f64 {
        leading_f64(&self.daya)
    }

    /// Checks required fields and coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns [`GarduError::Validation`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.no_gardu.trim().is_empty() {
            return Err(GarduError::Validation("noGardu is required".into()));
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(GarduError::Validation(format!(
                    "latitude {lat} is outside [-90, 90]"
                )));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(GarduError::Validation(format!(
                    "longitude {lon} is outside [-180, 180]"
                )));
            }
        }
        Ok(())
    }
}

/// A stored substation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Substation {
    pub id: i64,
    #[serde(flatten)]
    pub fields: SubstationFields,
    pub last_update: String,
}

impl Substation {
    pub fn rated_power_kva(&self) -> f64 {
        self.fields.rated_power_kva()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in SubstationStatus::ALL {
            assert_eq!(status.as_str().parse::<SubstationStatus>().ok(), Some(status));
        }
        assert_eq!(
            "NON-ACTIVE".parse::<SubstationStatus>().ok(),
            Some(SubstationStatus::NonActive)
        );
        assert!("offline".parse::<SubstationStatus>().is_err());
    }

    #[test]
    fn fields_deserialize_with_defaults() {
        let f: SubstationFields =
            serde_json::from_str(r#"{"noGardu": "KB-001", "daya": 200, "ugb": true}"#)
                .unwrap_or_default();
        assert_eq!(f.no_gardu, "KB-001");
        assert_eq!(f.daya, "200");
        assert!(f.ugb);
        assert!(f.is_active);
        assert_eq!(f.status, SubstationStatus::Normal);
        assert_eq!(f.rated_power_kva(), 200.0);
    }

    #[test]
    fn status_uses_kebab_case() {
        let f: SubstationFields =
            serde_json::from_str(r#"{"noGardu": "X", "status": "non-active"}"#)
                .unwrap_or_default();
        assert_eq!(f.status, SubstationStatus::NonActive);
    }

    #[test]
    fn rated_power_parses_text() {
        let mut f = SubstationFields {
            daya: "160 kVA".into(),
            ..SubstationFields::default()
        };
        assert_eq!(f.rated_power_kva(), 160.0);
        f.daya = "unknown".into();
        assert_eq!(f.rated_power_kva(), 0.0);
    }

    #[test]
    fn validation() {
        let mut f = SubstationFields::default();
        assert!(f.validate().is_err());
        f.no_gardu = "KB-002".into();
        assert!(f.validate().is_ok());
        f.latitude = Some(120.0);
        assert!(f.validate().is_err());
        f.latitude = Some(-7.25);
        f.longitude = Some(112.75);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn substation_serializes_flat() {
        let s = Substation {
            id: 3,
            fields: SubstationFields {
                no_gardu: "KB-003".into(),
                ..SubstationFields::default()
            },
            last_update: "2024-05-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&s).unwrap_or_default();
        assert_eq!(json["id"], 3);
        assert_eq!(json["noGardu"], "KB-003");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["lastUpdate"], "2024-05-01T00:00:00Z");
    }
}
