//! Color constants and threshold coloring for the TUI.

use ratatui::style::Color;

use crate::config::ThresholdsConfig;
use crate::substation::SubstationStatus;

/// Header bar foreground.
pub const HEADER_FG: Color = Color::White;
/// Header bar background.
pub const HEADER_BG: Color = Color::DarkGray;
/// Footer help text color.
pub const FOOTER_FG: Color = Color::DarkGray;
/// Selected table row background.
pub const SELECTED_BG: Color = Color::Blue;

const OK: Color = Color::Green;
const NEAR: Color = Color::Yellow;
const OVER: Color = Color::Red;

/// Fraction of a threshold at which values turn yellow.
const NEAR_FRACTION: f64 = 0.75;

fn graded(value: f64, limit: f64) -> Color {
    if value >= limit {
        OVER
    } else if value >= limit * NEAR_FRACTION {
        NEAR
    } else {
        OK
    }
}

/// Color for a load percentage.
pub fn load_color(percent: f64, thresholds: &ThresholdsConfig) -> Color {
    graded(percent, thresholds.overload_percent)
}

/// Color for an imbalance percentage.
pub fn imbalance_color(percent: f64, thresholds: &ThresholdsConfig) -> Color {
    graded(percent, thresholds.unbalance_percent)
}

pub fn status_color(status: SubstationStatus) -> Color {
    match status {
        SubstationStatus::Normal => OK,
        SubstationStatus::Warning => NEAR,
        SubstationStatus::Critical => OVER,
        SubstationStatus::NonActive => Color::DarkGray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_grades_against_threshold() {
        let th = ThresholdsConfig::default();
        assert_eq!(load_color(10.0, &th), OK);
        assert_eq!(load_color(60.0, &th), NEAR);
        assert_eq!(load_color(80.0, &th), OVER);
        assert_eq!(imbalance_color(19.9, &th), NEAR);
        assert_eq!(imbalance_color(25.0, &th), OVER);
    }
}
