use serde::{Deserialize, Serialize};

/// `[display]` section of the runtime config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub xrandr_bin: String,
    /// X display to query; inherited from the environment when unset.
    pub x_display: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            xrandr_bin: "xrandr".to_string(),
            x_display: None,
        }
    }
}
