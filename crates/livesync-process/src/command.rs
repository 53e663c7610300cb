//! External command execution.

use std::io;
use std::process::Command;

use crate::error::ProcessError;

/// Abstraction over running a local program, so parsers and sources can be
/// tested with canned output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProcessError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProcessError> {
        (**self).run(program, args)
    }
}

/// Runs programs with `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    env: Vec<(String, String)>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra environment for every spawned program (e.g. `DISPLAY`).
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

impl CommandRunner for CommandExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProcessError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        let output = cmd.output().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ProcessError::NotInstalled(program.to_string()),
            _ => ProcessError::Io(e),
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::CommandFailed(format!(
                "{program}: exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_env_accumulates() {
        let exec = CommandExecutor::new().with_env("DISPLAY", ":0");
        assert_eq!(exec.env, vec![("DISPLAY".to_string(), ":0".to_string())]);
    }

    #[test]
    fn missing_program_is_reported() {
        let err = CommandExecutor::new()
            .run("livesync-definitely-not-a-program", &[])
            .expect_err("must fail");
        assert!(matches!(err, ProcessError::NotInstalled(_)));
    }

    #[test]
    fn blanket_ref_impl() {
        struct Canned;
        impl CommandRunner for Canned {
            fn run(&self, program: &str, _args: &[&str]) -> Result<String, ProcessError> {
                Ok(program.to_string())
            }
        }
        let canned = Canned;
        let r: &Canned = &canned;
        assert_eq!(r.run("xrandr", &[]).expect("ok"), "xrandr");
    }
}
