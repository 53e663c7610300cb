use livesync_core::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("command not found: {0}")]
    NotInstalled(String),

    #[error("process io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for FetchError {
    fn from(e: ProcessError) -> Self {
        match e {
            ProcessError::CommandFailed(detail) => Self::Protocol(detail),
            ProcessError::NotInstalled(program) => {
                Self::Unsupported(format!("{program} is not installed"))
            }
            ProcessError::Io(io) => Self::Io(io),
        }
    }
}
