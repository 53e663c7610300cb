use serde::{Deserialize, Serialize};

use crate::pointer::FieldSpec;

pub const DEFAULT_PROCESS_NAME: &str = "re8";
pub const DEFAULT_RESOLVE_INTERVAL_MS: u64 = 2000;

/// `[game]` section of the runtime config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub process_names: Vec<String>,
    /// Pointer re-resolution cadence.
    pub resolve_interval_ms: u64,
    pub fields: Vec<FieldSpec>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            process_names: vec![DEFAULT_PROCESS_NAME.to_string()],
            resolve_interval_ms: DEFAULT_RESOLVE_INTERVAL_MS,
            fields: Vec::new(),
        }
    }
}
