//! Monthly fleet summary computed from a [`MonthSnapshot`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::snapshot::MonthSnapshot;
use crate::config::ThresholdsConfig;
use crate::measure::{Month, RowName, Shift, format_percent};
use crate::substation::{Substation, SubstationStatus};

/// A substation flagged by one of the thresholds, with its worst row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flagged {
    pub substation_id: i64,
    pub no_gardu: String,
    pub ulp: String,
    pub shift: Shift,
    #[serde(rename = "row_name")]
    pub row_name: RowName,
    /// The offending percentage (load or imbalance).
    pub value: f64,
}

impl Flagged {
    fn new(s: &Substation, shift: Shift, row_name: RowName, value: f64) -> Self {
        Self {
            substation_id: s.id,
            no_gardu: s.fields.no_gardu.clone(),
            ulp: s.fields.ulp.clone(),
            shift,
            row_name,
            value,
        }
    }
}

/// Aggregate indicators for one month.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub month: Month,
    pub total_substations: usize,
    pub active_substations: usize,
    pub ugb_substations: usize,
    /// Substations per status; every status is present, possibly zero.
    pub status_counts: BTreeMap<String, usize>,
    /// Substations per ULP. Blank ULPs are counted under `"-"`.
    pub ulp_counts: BTreeMap<String, usize>,
    /// Rows written at least once this month, both shifts.
    pub measured_rows: usize,
    /// Mean load over measured INDUK rows, both shifts.
    pub average_load_percent: f64,
    pub peak_load_percent: f64,
    /// Sorted by value, worst first.
    pub overloaded: Vec<Flagged>,
    /// Sorted by value, worst first.
    pub unbalanced: Vec<Flagged>,
}

impl DashboardReport {
    /// Builds the report from a loaded month.
    ///
    /// Overload looks at INDUK rows only; imbalance looks at every row. Each
    /// flagged substation appears once, with its worst row.
    pub fn from_snapshot(snapshot: &MonthSnapshot, thresholds: &ThresholdsConfig) -> Self {
        let mut status_counts: BTreeMap<String, usize> = SubstationStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        let mut ulp_counts = BTreeMap::new();
        let mut load_sum = 0.0;
        let mut load_n = 0_usize;
        let mut peak = 0.0_f64;
        let mut overloaded = Vec::new();
        let mut unbalanced = Vec::new();

        for s in &snapshot.substations {
            *status_counts.entry(s.fields.status.as_str().to_string()).or_insert(0) += 1;
            let ulp = match s.fields.ulp.trim() {
                "" => "-".to_string(),
                u => u.to_string(),
            };
            *ulp_counts.entry(ulp).or_insert(0) += 1;

            let mut worst_load: Option<Flagged> = None;
            let mut worst_imbalance: Option<Flagged> = None;
            for shift in Shift::ALL {
                for row_name in RowName::ALL {
                    let Some(m) = snapshot.row(shift, s.id, row_name) else {
                        continue;
                    };
                    if row_name == RowName::Induk && m.last_update.is_some() {
                        load_sum += m.derived.load_percent;
                        load_n += 1;
                        peak = peak.max(m.derived.load_percent);
                    }
                    let load = m.derived.load_percent;
                    if row_name == RowName::Induk
                        && load >= thresholds.overload_percent
                        && worst_load.as_ref().is_none_or(|w| load > w.value)
                    {
                        worst_load = Some(Flagged::new(s, shift, row_name, load));
                    }
                    let imbalance = m.derived.imbalance_percent;
                    if imbalance >= thresholds.unbalance_percent
                        && worst_imbalance.as_ref().is_none_or(|w| imbalance > w.value)
                    {
                        worst_imbalance = Some(Flagged::new(s, shift, row_name, imbalance));
                    }
                }
            }
            overloaded.extend(worst_load);
            unbalanced.extend(worst_imbalance);
        }

        overloaded.sort_by(|a, b| b.value.total_cmp(&a.value));
        unbalanced.sort_by(|a, b| b.value.total_cmp(&a.value));

        Self {
            month: snapshot.month.clone(),
            total_substations: snapshot.substations.len(),
            active_substations: snapshot.substations.iter().filter(|s| s.fields.is_active).count(),
            ugb_substations: snapshot.substations.iter().filter(|s| s.fields.ugb).count(),
            status_counts,
            ulp_counts,
            measured_rows: snapshot.measured_rows(),
            average_load_percent: if load_n > 0 { load_sum / load_n as f64 } else { 0.0 },
            peak_load_percent: peak,
            overloaded,
            unbalanced,
        }
    }
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Gardu Dashboard {} ---", self.month)?;
        writeln!(
            f,
            "Substations:      {} ({} active, {} UGB)",
            self.total_substations, self.active_substations, self.ugb_substations
        )?;
        let statuses: Vec<String> = self
            .status_counts
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        writeln!(f, "Status:           {}", statuses.join(" "))?;
        writeln!(f, "Measured rows:    {}", self.measured_rows)?;
        writeln!(f, "Average load:     {}", format_percent(self.average_load_percent))?;
        writeln!(f, "Peak load:        {}", format_percent(self.peak_load_percent))?;
        for (ulp, n) in &self.ulp_counts {
            writeln!(f, "ULP {ulp:<13} {n}")?;
        }
        writeln!(f, "Overloaded:       {}", self.overloaded.len())?;
        for o in &self.overloaded {
            writeln!(f, "  {:<12} {:<6} {}", o.no_gardu, o.shift, format_percent(o.value))?;
        }
        write!(f, "Unbalanced:       {}", self.unbalanced.len())?;
        for u in &self.unbalanced {
            write!(
                f,
                "\n  {:<12} {:<6} {:<5} {}",
                u.no_gardu,
                u.shift,
                u.row_name.label(),
                format_percent(u.value)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::bulk::{WriteMode, apply_json_batch};
    use crate::ops::registry;
    use crate::store::Store;
    use crate::substation::SubstationFields;
    use serde_json::json;

    fn thresholds() -> ThresholdsConfig {
        ThresholdsConfig {
            overload_percent: 80.0,
            unbalance_percent: 20.0,
        }
    }

    fn build() -> DashboardReport {
        let store = Store::open_in_memory().unwrap();
        let month = Month::parse("2024-08").unwrap();
        store
            .write(|c| {
                let heavy = SubstationFields {
                    no_gardu: "KB-HEAVY".into(),
                    ulp: "ULP A".into(),
                    daya: "50".into(),
                    ugb: true,
                    ..SubstationFields::default()
                };
                let skewed = SubstationFields {
                    no_gardu: "KB-SKEW".into(),
                    ulp: "ULP B".into(),
                    daya: "200".into(),
                    status: SubstationStatus::Warning,
                    is_active: false,
                    ..SubstationFields::default()
                };
                let h = registry::create(c, &heavy, &month, "t0")?.substation.id;
                let k = registry::create(c, &skewed, &month, "t0")?.substation.id;
                let siang = vec![
                    // 100 A at 400 V on 50 kVA: 138.4 % load, balanced.
                    json!({"substationId": h, "row_name": "induk", "month": "2024-08", "r": 100, "s": 100, "t": 100, "pp": 400}),
                    // 95/102/121 A: 28.3 % imbalance on circuit 2.
                    json!({"substationId": k, "row_name": "2", "month": "2024-08", "r": 95, "s": 102, "t": 121, "pp": 400}),
                    json!({"substationId": k, "row_name": "induk", "month": "2024-08", "r": 50, "s": 50, "t": 50, "pp": 400}),
                ];
                apply_json_batch(c, Shift::Siang, &siang, WriteMode::UpdateOnly, "t1")?;
                Ok(())
            })
            .unwrap();
        let snap = store.read(|c| MonthSnapshot::load(c, &month)).unwrap();
        DashboardReport::from_snapshot(&snap, &thresholds())
    }

    #[test]
    fn counts_and_flags() {
        let report = build();
        assert_eq!(report.total_substations, 2);
        assert_eq!(report.active_substations, 1);
        assert_eq!(report.ugb_substations, 1);
        assert_eq!(report.status_counts["normal"], 1);
        assert_eq!(report.status_counts["warning"], 1);
        assert_eq!(report.status_counts["critical"], 0);
        assert_eq!(report.ulp_counts["ULP A"], 1);
        assert_eq!(report.measured_rows, 3);

        assert_eq!(report.overloaded.len(), 1);
        assert_eq!(report.overloaded[0].no_gardu, "KB-HEAVY");
        assert!((report.overloaded[0].value - 138.4).abs() < 1e-9);

        assert_eq!(report.unbalanced.len(), 1);
        assert_eq!(report.unbalanced[0].no_gardu, "KB-SKEW");
        assert_eq!(report.unbalanced[0].row_name, RowName::Two);
    }

    #[test]
    fn load_statistics_use_measured_induk_rows() {
        let report = build();
        // 138.4 % and 17.3 % (50 A at 400 V on 200 kVA).
        assert!((report.peak_load_percent - 138.4).abs() < 1e-9);
        assert!((report.average_load_percent - (138.4 + 17.3) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn display_lists_flagged_substations() {
        let text = build().to_string();
        assert!(text.starts_with("--- Gardu Dashboard 2024-08 ---"));
        assert!(text.contains("Peak load:        138.4%"));
        assert!(text.contains("KB-SKEW"));
    }

    #[test]
    fn empty_month() {
        let store = Store::open_in_memory().unwrap();
        let month = Month::parse("2024-08").unwrap();
        let snap = store.read(|c| MonthSnapshot::load(c, &month)).unwrap();
        let report = DashboardReport::from_snapshot(&snap, &thresholds());
        assert_eq!(report.total_substations, 0);
        assert_eq!(report.average_load_percent, 0.0);
        assert!(report.overloaded.is_empty());
    }
}
