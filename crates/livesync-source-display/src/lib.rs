//! livesync-source-display: display topology and per-display settings,
//! enumerated with `xrandr` and re-projected only when the layout changes.

pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod source;

use livesync_engine::{EngineConfig, NoDerived, SyncEngine};
use livesync_process::{CommandExecutor, CommandRunner};

pub use config::DisplayConfig;
pub use error::DisplayError;
pub use layout::{DisplayInfo, DisplayLayout, Point, Rotation, Size, Topology, parse_xrandr};
pub use model::DisplaySettingsModel;
pub use source::DisplaySource;

pub type DisplayEngine<R = CommandExecutor> = SyncEngine<DisplaySource<R>, NoDerived, DisplaySettingsModel>;

/// Executor honoring the configured X display.
pub fn executor(config: &DisplayConfig) -> CommandExecutor {
    match &config.x_display {
        Some(display) => CommandExecutor::new().with_env("DISPLAY", display),
        None => CommandExecutor::new(),
    }
}

pub fn build_engine<R: CommandRunner + 'static>(
    config: &DisplayConfig,
    engine: EngineConfig,
    runner: R,
) -> DisplayEngine<R> {
    SyncEngine::new(DisplaySource::new(runner, &config.xrandr_bin), NoDerived, engine)
}
