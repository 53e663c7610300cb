use livesync_core::FetchError;
use livesync_process::ProcessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("failed to parse xrandr line {line_num}: {detail}")]
    Parse { line_num: usize, detail: String },

    #[error(transparent)]
    Command(#[from] ProcessError),
}

impl From<DisplayError> for FetchError {
    fn from(e: DisplayError) -> Self {
        match e {
            DisplayError::Parse { .. } => Self::Protocol(e.to_string()),
            DisplayError::Command(inner) => inner.into(),
        }
    }
}
