//! Editor tunables.

use crate::dragdrop::HOVER_ACTIVATE_MS;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::resize::MIN_SIZE;
use crate::snap::{GUIDE_MARGIN, SNAP_THRESHOLD, SnapOptions, SnapStrategy};
use serde::{Deserialize, Serialize};

/// Every tunable constant of the editing engine. Missing JSON fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub snap_threshold: f64,
    pub guide_margin: f64,
    pub snap_strategy: SnapStrategy,
    pub hover_activate_ms: u64,
    pub history_limit: usize,
    /// Smallest width or height a resize produces.
    pub min_size: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub scale_step: f64,
    /// Margin kept around the canvas by fit-to-view.
    pub fit_padding: f64,
    /// Measurements closer than this to the stored ones are ignored.
    pub measure_threshold: f64,
    pub duplicate_offset: f64,
    pub min_group_size: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: SNAP_THRESHOLD,
            guide_margin: GUIDE_MARGIN,
            snap_strategy: SnapStrategy::FirstMatch,
            hover_activate_ms: HOVER_ACTIVATE_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            min_size: MIN_SIZE,
            min_scale: 0.1,
            max_scale: 3.0,
            scale_step: 0.1,
            fit_padding: 80.0,
            measure_threshold: 1.0,
            duplicate_offset: 20.0,
            min_group_size: 100.0,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn snap_options(&self) -> SnapOptions {
        SnapOptions {
            threshold: self.snap_threshold,
            guide_margin: self.guide_margin,
            strategy: self.snap_strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EditorConfig::from_json(r#"{"snapThreshold": 8, "hoverActivateMs": 250}"#).unwrap();
        assert!((config.snap_threshold - 8.0).abs() < f64::EPSILON);
        assert_eq!(config.hover_activate_ms, 250);
        assert_eq!(config.history_limit, 100);
        assert!((config.max_scale - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snap_options() {
        let config = EditorConfig {
            snap_strategy: SnapStrategy::Closest,
            ..EditorConfig::default()
        };
        let options = config.snap_options();
        assert_eq!(options.strategy, SnapStrategy::Closest);
        assert!((options.guide_margin - 20.0).abs() < f64::EPSILON);
    }
}
