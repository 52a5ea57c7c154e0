use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::process::{CommandOutput, CommandRunner};
use crate::trace::CallTrace;

fn repo_key(cwd: &Path) -> String {
    cwd.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Command runner that records invocations instead of spawning processes.
///
/// `run_logged` calls are recorded as `build:<target> <repo>`, where the repo
/// is the last component of the working directory; `capture` calls as
/// `exec:<program> <args>`.
#[derive(Default)]
pub struct RecordingRunner {
    trace: CallTrace,
    logs: HashMap<(String, String), String>,
    failing: HashSet<(String, String)>,
    outputs: HashMap<String, CommandOutput>,
}

impl RecordingRunner {
    pub fn new(trace: CallTrace) -> Self {
        RecordingRunner {
            trace,
            ..Default::default()
        }
    }

    /// Content written to the log when `target` runs for `repo`
    pub fn with_log(mut self, repo: &str, target: &str, content: &str) -> Self {
        self.logs
            .insert((repo.to_string(), target.to_string()), content.to_string());
        self
    }

    /// Make `target` exit with status 1 for `repo`
    pub fn failing(mut self, repo: &str, target: &str) -> Self {
        self.failing.insert((repo.to_string(), target.to_string()));
        self
    }

    /// Output returned by `capture` for `program`
    pub fn with_output(mut self, program: &str, output: CommandOutput) -> Self {
        self.outputs.insert(program.to_string(), output);
        self
    }
}

impl CommandRunner for RecordingRunner {
    fn capture(&self, program: &str, args: &[&str], _cwd: &Path) -> Result<CommandOutput> {
        self.trace
            .record(format!("exec:{} {}", program, args.join(" ")));
        self.outputs
            .get(program)
            .cloned()
            .ok_or_else(|| BuildError::command(program, args, None))
    }

    fn run_logged(
        &self,
        program: &str,
        args: &[&str],
        cwd: &Path,
        log_path: &Path,
    ) -> Result<()> {
        let repo = repo_key(cwd);
        let target = args.join(" ");
        self.trace.record(format!("build:{} {}", target, repo));

        let key = (repo, target);
        let content = self.logs.get(&key).cloned().unwrap_or_default();
        fs::write(log_path, content)?;

        if self.failing.contains(&key) {
            return Err(BuildError::command(program, args, Some(1)));
        }
        Ok(())
    }
}
