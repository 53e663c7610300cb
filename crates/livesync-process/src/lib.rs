//! livesync-process: local process discovery and external command execution.
//! Both sit behind traits so sources can be tested without a live system.

pub mod command;
pub mod error;
pub mod lister;

pub use command::{CommandExecutor, CommandRunner};
pub use error::ProcessError;
pub use lister::{ProcessInfo, ProcessLister, ProcessMatcher, SysinfoProcessLister};
