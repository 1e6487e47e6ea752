//! TUI application state over one month of the store.

use std::time::{Duration, Instant};

use crate::config::ThresholdsConfig;
use crate::error::Result;
use crate::measure::{Measurement, Month, RowName, Shift};
use crate::ops::{DashboardReport, MonthSnapshot};
use crate::store::Store;
use crate::substation::{Substation, SubstationStatus};

/// How often the snapshot is reloaded while idle.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// TUI application state.
pub struct App {
    store: Store,
    pub thresholds: ThresholdsConfig,
    pub snapshot: MonthSnapshot,
    pub report: DashboardReport,
    /// Shift shown in the detail panel.
    pub shift: Shift,
    /// `None` shows every substation.
    pub status_filter: Option<SubstationStatus>,
    /// Index into [`App::visible`].
    pub selected: usize,
    /// Whether the user has requested quit.
    pub quit: bool,
    /// When the snapshot was last loaded.
    pub last_refresh: Instant,
}

impl App {
    /// Loads `month` from `store`.
    ///
    /// # Errors
    ///
    /// Returns the store error if the month cannot be read.
    pub fn new(store: Store, thresholds: ThresholdsConfig, month: Month) -> Result<Self> {
        let snapshot = store.read(|c| MonthSnapshot::load(c, &month))?;
        let report = DashboardReport::from_snapshot(&snapshot, &thresholds);
        Ok(Self {
            store,
            thresholds,
            snapshot,
            report,
            shift: Shift::Siang,
            status_filter: None,
            selected: 0,
            quit: false,
            last_refresh: Instant::now(),
        })
    }

    pub fn month(&self) -> &Month {
        &self.snapshot.month
    }

    fn load(&mut self, month: &Month) -> Result<()> {
        self.snapshot = self.store.read(|c| MonthSnapshot::load(c, month))?;
        self.report = DashboardReport::from_snapshot(&self.snapshot, &self.thresholds);
        self.last_refresh = Instant::now();
        self.clamp_selection();
        Ok(())
    }

    /// Reloads the current month, keeping the selection where possible.
    pub fn refresh(&mut self) -> Result<()> {
        let month = self.snapshot.month.clone();
        self.load(&month)
    }

    pub fn next_month(&mut self) -> Result<()> {
        let month = self.snapshot.month.next();
        self.load(&month)
    }

    pub fn prev_month(&mut self) -> Result<()> {
        let month = self.snapshot.month.prev();
        self.load(&month)
    }

    pub fn toggle_shift(&mut self) {
        self.shift = match self.shift {
            Shift::Siang => Shift::Malam,
            Shift::Malam => Shift::Siang,
        };
    }

    /// Cycles all → normal → warning → critical → non-active → all.
    pub fn cycle_status_filter(&mut self) {
        self.status_filter = match self.status_filter {
            None => Some(SubstationStatus::ALL[0]),
            Some(current) => SubstationStatus::ALL
                .iter()
                .position(|s| *s == current)
                .and_then(|i| SubstationStatus::ALL.get(i + 1))
                .copied(),
        };
        self.selected = 0;
    }

    /// Substations passing the status filter, in list order.
    pub fn visible(&self) -> Vec<&Substation> {
        self.snapshot
            .substations
            .iter()
            .filter(|s| self.status_filter.is_none_or(|f| s.fields.status == f))
            .collect()
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible().len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let n = self.visible().len();
        self.selected = self.selected.min(n.saturating_sub(1));
    }

    pub fn selected_substation(&self) -> Option<&Substation> {
        self.visible().get(self.selected).copied()
    }

    /// The five rows of the selected substation for the active shift.
    pub fn selected_rows(&self) -> Option<[Measurement; 5]> {
        self.selected_substation()
            .map(|s| self.snapshot.sheet_rows(self.shift, s.id))
    }

    /// INDUK load of a substation for `shift`, if that row exists.
    pub fn induk_load(&self, substation_id: i64, shift: Shift) -> Option<f64> {
        self.snapshot
            .row(shift, substation_id, RowName::Induk)
            .map(|m| m.derived.load_percent)
    }

    /// Highest imbalance over every row of a substation, both shifts.
    pub fn worst_imbalance(&self, substation_id: i64) -> f64 {
        Shift::ALL
            .iter()
            .flat_map(|&shift| {
                RowName::ALL
                    .iter()
                    .filter_map(move |&r| self.snapshot.row(shift, substation_id, r))
            })
            .map(|m| m.derived.imbalance_percent)
            .fold(0.0, f64::max)
    }

    pub fn needs_refresh(&self) -> bool {
        self.last_refresh.elapsed() >= REFRESH_INTERVAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::bulk::{WriteMode, apply_json_batch};
    use crate::ops::registry;
    use crate::substation::SubstationFields;
    use serde_json::json;

    fn seeded(month: &Month) -> Store {
        let store = Store::open_in_memory().unwrap();
        store
            .write(|c| {
                for (no, status) in [
                    ("KB-001", SubstationStatus::Normal),
                    ("KB-002", SubstationStatus::Critical),
                    ("KB-003", SubstationStatus::Normal),
                ] {
                    let fields = SubstationFields {
                        no_gardu: no.into(),
                        daya: "100".into(),
                        status,
                        ..SubstationFields::default()
                    };
                    registry::create(c, &fields, month, "t0")?;
                }
                let rows = [json!({
                    "substationId": 2, "row_name": "induk", "month": month.as_str(),
                    "r": 100, "s": 100, "t": 100, "pp": 231
                })];
                apply_json_batch(c, Shift::Siang, &rows, WriteMode::Upsert, "t1")?;
                Ok(())
            })
            .unwrap();
        store
    }

    fn app() -> App {
        let month = Month::parse("2024-06").unwrap();
        App::new(seeded(&month), ThresholdsConfig::default(), month).unwrap()
    }

    #[test]
    fn loads_month_and_report() {
        let app = app();
        assert_eq!(app.visible().len(), 3);
        assert_eq!(app.report.total_substations, 3);
        assert_eq!(app.report.measured_rows, 1);
        let load = app.induk_load(2, Shift::Siang).unwrap();
        assert!((load - 39.963).abs() < 1e-3, "load was {load}");
    }

    #[test]
    fn status_filter_cycles_back_to_all() {
        let mut app = app();
        app.cycle_status_filter();
        assert_eq!(app.status_filter, Some(SubstationStatus::Normal));
        assert_eq!(app.visible().len(), 2);
        app.cycle_status_filter();
        app.cycle_status_filter();
        assert_eq!(app.status_filter, Some(SubstationStatus::Critical));
        assert_eq!(app.visible().len(), 1);
        app.cycle_status_filter();
        app.cycle_status_filter();
        assert_eq!(app.status_filter, None);
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut app = app();
        for _ in 0..10 {
            app.select_next();
        }
        assert_eq!(app.selected, 2);
        for _ in 0..10 {
            app.select_prev();
        }
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn month_navigation_reloads() {
        let mut app = app();
        app.next_month().unwrap();
        assert_eq!(app.month().as_str(), "2024-07");
        assert_eq!(app.snapshot.row_count(), 0);
        assert_eq!(app.report.total_substations, 3);
        app.prev_month().unwrap();
        assert_eq!(app.snapshot.row_count(), 30);
    }

    #[test]
    fn selected_rows_follow_shift() {
        let mut app = app();
        app.select_next();
        let siang = app.selected_rows().unwrap();
        assert!(siang[0].derived.load_percent > 0.0);
        app.toggle_shift();
        let malam = app.selected_rows().unwrap();
        assert_eq!(malam[0].derived.load_percent, 0.0);
    }
}
