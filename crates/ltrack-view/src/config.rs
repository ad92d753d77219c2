#![forbid(unsafe_code)]

//! View configuration marshalled from the host application.

use serde::{Deserialize, Serialize};

/// Settings the view consumes from its host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchemeConfig {
    /// Spatial calibration: physical units per pixel. Drives cell sizing
    /// and the layout geometry.
    pub calibration: f64,
    /// Whether direct cell-to-cell linking in the view creates domain
    /// links. Off by default; toggled from the host toolbar.
    #[serde(default)]
    pub linking_enabled: bool,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            calibration: 1.0,
            linking_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_linking() {
        let config = SchemeConfig::default();
        assert_eq!(config.calibration, 1.0);
        assert!(!config.linking_enabled);
    }
}
