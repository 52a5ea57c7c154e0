//! External command execution.
//!
//! Every command runs with an explicit working directory; the process-wide
//! working directory is never changed.

pub mod mock;

pub use mock::RecordingRunner;

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, error};

use crate::error::{BuildError, Result};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run a command to completion and capture its output.
    ///
    /// A non-zero exit is not an error here; callers inspect [CommandOutput::code].
    fn capture(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput>;

    /// Run a command with stdout and stderr both written to `log_path`.
    ///
    /// The log is truncated first. A non-zero exit is a
    /// [BuildError::ExternalCommand], returned after the log has been written.
    fn run_logged(&self, program: &str, args: &[&str], cwd: &Path, log_path: &Path)
        -> Result<()>;
}

/// [CommandRunner] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

fn spawn_error(program: &str, args: &[&str], e: std::io::Error) -> BuildError {
    error!("failed to start {}: {}", program, e);
    BuildError::command(program, args, None)
}

impl CommandRunner for SystemRunner {
    fn capture(&self, program: &str, args: &[&str], cwd: &Path) -> Result<CommandOutput> {
        debug!("{} {} (in {})", program, args.join(" "), cwd.display());
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| spawn_error(program, args, e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_logged(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        log_path: &Path,
    ) -> Result<()> {
        debug!(
            "{} {} (in {}) > {}",
            program,
            args.join(" "),
            cwd.display(),
            log_path.display()
        );
        let log = File::create(log_path)?;
        let log_err = log.try_clone()?;

        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .map_err(|e| spawn_error(program, args, e))?;

        if !status.success() {
            return Err(BuildError::command(program, args, status.code()));
        }
        Ok(())
    }
}
