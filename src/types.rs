// =============================================================================
// Shared types used across the Trendscope dashboard
// =============================================================================

use serde::{Deserialize, Serialize};

/// Sampling interval of a price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarInterval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1wk")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Default for BarInterval {
    fn default() -> Self {
        Self::Weekly
    }
}

impl BarInterval {
    /// Number of bars in one year, used to annualize per-bar growth.
    pub fn bars_per_year(self) -> f64 {
        match self {
            Self::Daily => 252.0,
            Self::Weekly => 52.0,
            Self::Monthly => 12.0,
        }
    }

    /// Interval code understood by the Yahoo chart endpoint.
    pub fn as_code(self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }

    /// Parse an interval code (`1d`, `1wk`, `1mo`). Unknown codes yield `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "1d" | "d" | "daily" => Some(Self::Daily),
            "1wk" | "w" | "weekly" => Some(Self::Weekly),
            "1mo" | "m" | "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

impl std::fmt::Display for BarInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// How the benchmark's trend slope is carried over onto the asset's starting
/// point when building the projected benchmark line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionMode {
    /// Reuse the benchmark's slope in its own price units per bar.
    RawSlope,
    /// Reuse the benchmark's percent-per-bar slope, rescaled to the asset's
    /// starting value.
    RelativeSlope,
}

impl Default for ProjectionMode {
    fn default() -> Self {
        Self::RawSlope
    }
}

impl std::fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RawSlope => write!(f, "raw_slope"),
            Self::RelativeSlope => write!(f, "relative_slope"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_codes_roundtrip() {
        for iv in [BarInterval::Daily, BarInterval::Weekly, BarInterval::Monthly] {
            assert_eq!(BarInterval::from_code(iv.as_code()), Some(iv));
        }
        assert_eq!(BarInterval::from_code("5m"), None);
    }

    #[test]
    fn weekly_is_default_with_52_bars() {
        assert_eq!(BarInterval::default(), BarInterval::Weekly);
        assert!((BarInterval::Weekly.bars_per_year() - 52.0).abs() < f64::EPSILON);
    }

    #[test]
    fn interval_serde_uses_codes() {
        let json = serde_json::to_string(&BarInterval::Monthly).unwrap();
        assert_eq!(json, "\"1mo\"");
        let back: BarInterval = serde_json::from_str("\"1wk\"").unwrap();
        assert_eq!(back, BarInterval::Weekly);
    }
}
