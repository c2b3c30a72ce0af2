//! Editor configuration.

use serde::Deserialize;

/// Configuration for the designer's editing engine.
///
/// Every field has a usable default; hosts override only what they need,
/// either in code or from a JSON blob (`EditorConfig::from_json`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo steps kept. Default: **100**.
    pub history_depth: usize,

    /// Name given to statuses created with `add_status`. Default: **"New Status"**.
    pub new_status_name: String,

    /// Accent colour for new statuses. Default: **#64748B**.
    pub new_status_color: String,

    /// Canvas position of the first auto-placed status.
    pub placement_origin: (f64, f64),

    /// Offset between consecutive auto-placed statuses.
    pub placement_step: (f64, f64),

    /// Auto-placement cascades this many times before starting a new row.
    pub placement_wrap: usize,

    /// Message shown when persistence fails without saying why.
    pub save_failure_message: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 100,
            new_status_name: "New Status".into(),
            new_status_color: wfd_core::DEFAULT_COLOR_ACCENT.into(),
            placement_origin: (120.0, 120.0),
            placement_step: (48.0, 36.0),
            placement_wrap: 8,
            save_failure_message: "failed to save workflow".into(),
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Position of the `k`-th auto-placed status: a diagonal cascade of
    /// `placement_wrap` steps, then the next row below it.
    pub fn placement(&self, k: usize) -> (f64, f64) {
        let wrap = self.placement_wrap.max(1);
        let (col, row) = ((k % wrap) as f64, (k / wrap) as f64);
        let (ox, oy) = self.placement_origin;
        let (sx, sy) = self.placement_step;
        (ox + sx * col + sx * 0.5 * row, oy + sy * col + sy * wrap as f64 * row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg =
            EditorConfig::from_json(r#"{"historyDepth": 5, "newStatusName": "Todo"}"#).unwrap();
        assert_eq!(cfg.history_depth, 5);
        assert_eq!(cfg.new_status_name, "Todo");
        assert_eq!(cfg.placement_wrap, 8);
        assert_eq!(cfg.save_failure_message, "failed to save workflow");
    }

    #[test]
    fn placement_cascades_then_wraps() {
        let cfg = EditorConfig {
            placement_wrap: 2,
            ..Default::default()
        };
        assert_eq!(cfg.placement(0), (120.0, 120.0));
        assert_eq!(cfg.placement(1), (168.0, 156.0));
        // Second row starts below the first cascade, nudged right.
        assert_eq!(cfg.placement(2), (144.0, 192.0));
    }
}
