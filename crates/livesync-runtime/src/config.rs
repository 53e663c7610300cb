//! Runtime configuration: an optional TOML file with one table per concern.
//!
//! ```toml
//! [engine]
//! data_interval_ms = 1000
//!
//! [media]
//! endpoint = "http://localhost:9863"
//!
//! [host]
//! tick_rate_hz = 30.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use livesync_engine::EngineConfig;
use livesync_source_display::DisplayConfig;
use livesync_source_game::GameConfig;
use livesync_source_media::MediaConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// `[host]` section: how this binary drives the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tick_rate_hz: f64,
    /// Minimum spacing between printed model updates.
    pub print_interval_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 30.0,
            print_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub media: MediaConfig,
    pub game: GameConfig,
    pub display: DisplayConfig,
    pub host: HostConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.host.tick_rate_hz.is_finite() && self.host.tick_rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "host.tick_rate_hz must be positive, got {}",
                self.host.tick_rate_hz
            )));
        }
        if self.engine.data_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.data_interval_ms must be positive".into(),
            ));
        }
        if self.engine.resolve_interval_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.resolve_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(body.as_bytes()).expect("write");
        file
    }

    #[test]
    fn no_path_means_defaults() {
        let config = AppConfig::load(None).expect("defaults");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.media.endpoint, "http://localhost:9863");
        assert_eq!(config.game.process_names, vec!["re8".to_string()]);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            [engine]
            data_interval_ms = 500
            min_dwell_secs = 1.5

            [media]
            process_names = ["ytmdesktop"]

            [host]
            tick_rate_hz = 60.0
            "#,
        );
        let config = AppConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.engine.data_interval_ms, 500);
        assert_eq!(config.engine.fetch_timeout_ms, 1000);
        assert_eq!(config.engine.min_dwell_secs, 1.5);
        assert_eq!(config.media.process_names, vec!["ytmdesktop".to_string()]);
        assert_eq!(config.media.max_colors, 256);
        assert_eq!(config.host.tick_rate_hz, 60.0);
        assert_eq!(config.display, DisplayConfig::default());
    }

    #[test]
    fn game_fields_load() {
        let file = write_config(
            r#"
            [game]
            resolve_interval_ms = 1500

            [[game.fields]]
            name = "player_health"
            module = "re8.exe"
            base_offset = 0x10
            offsets = [0x58]
            kind = "f32"
            "#,
        );
        let config = AppConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.game.resolve_interval_ms, 1500);
        assert_eq!(config.game.fields[0].name, "player_health");
    }

    #[test]
    fn example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("livesync.example.toml");
        let config = AppConfig::load(Some(&path)).expect("example config");
        assert_eq!(config.game.fields.len(), 1);
        assert_eq!(config.host.tick_rate_hz, 30.0);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let file = write_config("[engine\ndata_interval_ms = ");
        let err = AppConfig::load(Some(file.path())).expect_err("malformed");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn zero_tick_rate_is_invalid() {
        let file = write_config("[host]\ntick_rate_hz = 0.0\n");
        let err = AppConfig::load(Some(file.path())).expect_err("invalid");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn effective_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&AppConfig::default()).expect("serialize");
        let back: AppConfig = toml::from_str(&text).expect("parse");
        assert_eq!(back, AppConfig::default());
    }
}
