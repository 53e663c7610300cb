//! Display configuration as an always-present [`ExternalSource`].

use std::sync::Arc;

use livesync_core::{FetchError, PolledSnapshot, SourceHandle, SourceTarget};
use livesync_engine::ExternalSource;
use livesync_process::CommandRunner;

use crate::error::DisplayError;
use crate::layout::{DisplayLayout, parse_xrandr};

pub struct DisplaySource<R> {
    runner: Arc<R>,
    xrandr_bin: String,
}

impl<R: CommandRunner + 'static> DisplaySource<R> {
    pub fn new(runner: R, xrandr_bin: impl Into<String>) -> Self {
        Self {
            runner: Arc::new(runner),
            xrandr_bin: xrandr_bin.into(),
        }
    }

    /// Run and parse `xrandr --query` off the async workers.
    async fn query(&self) -> Result<DisplayLayout, FetchError> {
        let runner = Arc::clone(&self.runner);
        let bin = self.xrandr_bin.clone();
        tokio::task::spawn_blocking(move || -> Result<DisplayLayout, DisplayError> {
            let output = runner.run(&bin, &["--query"])?;
            parse_xrandr(&output)
        })
        .await
        .map_err(|e| FetchError::Protocol(format!("display query task failed: {e}")))?
        .map_err(FetchError::from)
    }
}

impl<R: CommandRunner + 'static> ExternalSource for DisplaySource<R> {
    type Payload = DisplayLayout;

    fn name(&self) -> &str {
        "display"
    }

    fn discover(&mut self) -> Option<SourceTarget> {
        Some(SourceTarget::System {
            facility: "display".into(),
        })
    }

    async fn fetch_snapshot(
        &mut self,
        handle: &SourceHandle,
    ) -> Result<PolledSnapshot<DisplayLayout>, FetchError> {
        let layout = self.query().await?;
        let digest = layout.digest();
        tracing::trace!(displays = layout.displays.len(), digest = %digest, "display layout");
        Ok(PolledSnapshot::new(handle, layout).with_identity(digest))
    }
}
