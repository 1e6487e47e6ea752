//! Derived metrics for one row of three-phase readings.
//!
//! The same function backs every write path (record creation, bulk updates,
//! spreadsheet import, rated-power changes, and the recompute maintenance
//! pass), so stored derived fields never drift from their inputs.

use serde::Serialize;

/// Approximation of √3 used by all stored and exported data.
///
/// Must stay `1.73`; replacing it would change every historical value.
pub const SQRT3_APPROX: f64 = 1.73;

/// Load and imbalance metrics derived from one reading.
///
/// Serialized with the stored column names (`rata2`, `kva`, `persen`,
/// `unbalanced`). Values are unrounded; rounding is a presentation concern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    /// Mean of the R, S, and T phase currents (A).
    #[serde(rename = "rata2")]
    pub average: f64,
    /// Apparent power (kVA).
    #[serde(rename = "kva")]
    pub apparent_power_kva: f64,
    /// Apparent power relative to rated power (%).
    #[serde(rename = "persen")]
    pub load_percent: f64,
    /// Phase-current imbalance (%).
    #[serde(rename = "unbalanced")]
    pub imbalance_percent: f64,
}

/// Computes the derived metrics for phase currents `r`, `s`, `t`, the
/// phase-to-phase voltage `pp`, and the substation's rated power in kVA.
///
/// Never fails and never returns NaN or infinity: non-finite inputs are
/// treated as `0.0`, a zero average yields zero imbalance, and a zero rated
/// power yields zero load.
///
/// # Examples
///
/// ```
/// use gardu_monitor::measure::calculate;
///
/// let m = calculate(100.0, 100.0, 100.0, 400.0, 100.0);
/// assert_eq!(m.average, 100.0);
/// assert_eq!(m.imbalance_percent, 0.0);
/// assert!((m.apparent_power_kva - 69.2).abs() < 1e-9);
/// ```
pub fn calculate(r: f64, s: f64, t: f64, pp: f64, rated_power_kva: f64) -> DerivedMetrics {
    let [r, s, t, pp, rated] = [r, s, t, pp, rated_power_kva].map(finite_or_zero);

    let average = (r + s + t) / 3.0;
    let apparent_power_kva = (average * pp * SQRT3_APPROX) / 1000.0;
    let load_percent = if rated != 0.0 {
        (apparent_power_kva / rated) * 100.0
    } else {
        0.0
    };
    let imbalance_percent = if average != 0.0 {
        ((r / average - 1.0).abs() + (s / average - 1.0).abs() + (t / average - 1.0).abs())
            * 100.0
    } else {
        0.0
    };

    DerivedMetrics {
        average,
        apparent_power_kva,
        load_percent,
        imbalance_percent,
    }
}

/// Formats a percentage for display and export: one decimal and a `%` sign.
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() { n } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn reference_reading() {
        let m = calculate(95.0, 102.0, 121.0, 413.0, 200.0);
        assert_eq!(m.average, 106.0);
        // 106 * 413 * 1.73 / 1000
        assert!(close(m.apparent_power_kva, 75.735_94));
        assert!(close(m.load_percent, 37.867_97));
        // (11 + 4 + 15) / 106 * 100
        assert!(close(m.imbalance_percent, 3000.0 / 106.0));
        assert!((m.imbalance_percent - 28.30).abs() < 0.01);
    }

    #[test]
    fn deterministic() {
        let a = calculate(12.5, 40.0, 33.3, 398.0, 160.0);
        let b = calculate(12.5, 40.0, 33.3, 398.0, 160.0);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_average_gives_zero_imbalance() {
        let m = calculate(0.0, 0.0, 0.0, 400.0, 100.0);
        assert_eq!(m.average, 0.0);
        assert_eq!(m.imbalance_percent, 0.0);
        assert_eq!(m.apparent_power_kva, 0.0);
        assert!(!m.imbalance_percent.is_nan());
    }

    #[test]
    fn zero_rated_power_gives_zero_load() {
        let m = calculate(50.0, 60.0, 70.0, 400.0, 0.0);
        assert_eq!(m.load_percent, 0.0);
        assert!(m.apparent_power_kva > 0.0);
    }

    #[test]
    fn balanced_phases_have_no_imbalance() {
        for current in [1.0, 17.0, 250.0] {
            let m = calculate(current, current, current, 400.0, 100.0);
            assert!(m.imbalance_percent.abs() < 1e-12);
        }
    }

    #[test]
    fn every_term_is_absolute() {
        // T below the average must still add to the imbalance: 20 + 20 + 40.
        let low_t = calculate(120.0, 120.0, 60.0, 400.0, 100.0);
        let high_t = calculate(80.0, 80.0, 140.0, 400.0, 100.0);
        assert!(close(low_t.imbalance_percent, 80.0));
        assert!(close(high_t.imbalance_percent, 80.0));
    }

    #[test]
    fn non_finite_inputs_are_zeroed() {
        let m = calculate(f64::NAN, f64::INFINITY, 30.0, 400.0, f64::NAN);
        assert!(close(m.average, 10.0));
        assert_eq!(m.load_percent, 0.0);
        assert!(m.imbalance_percent.is_finite());
    }

    #[test]
    fn percent_formatting() {
        assert_eq!(format_percent(37.867_97), "37.9%");
        assert_eq!(format_percent(0.0), "0.0%");
        assert_eq!(format_percent(100.04), "100.0%");
    }
}
