use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_ENDPOINT;
use crate::palette::DEFAULT_MAX_COLORS;

pub const DEFAULT_PROCESS_NAME: &str = "YouTube Music Desktop App";

/// `[media]` section of the runtime config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub endpoint: String,
    /// Image names of the desktop app. The endpoint is only queried while
    /// one of them is running.
    pub process_names: Vec<String>,
    /// When false the endpoint is treated as always present.
    pub require_process: bool,
    pub query_timeout_ms: u64,
    pub artwork_timeout_ms: u64,
    pub max_colors: usize,
    pub ignore_limits: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            process_names: vec![DEFAULT_PROCESS_NAME.to_string()],
            require_process: true,
            query_timeout_ms: 1000,
            artwork_timeout_ms: 5000,
            max_colors: DEFAULT_MAX_COLORS,
            ignore_limits: true,
        }
    }
}

impl MediaConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn artwork_timeout(&self) -> Duration {
        Duration::from_millis(self.artwork_timeout_ms)
    }
}
