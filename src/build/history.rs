//! History Recorder: the only state that persists and grows across runs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate};
use tracing::{debug, warn};

use crate::error::Result;
use crate::registry::StepKind;
use crate::warning::PipelineWarning;

/// One line of the build history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub repo: String,
    pub status: String,
}

pub fn history_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("build_history_{}.log", date.format("%Y-%m-%d")))
}

/// Path of a repository's log for one step kind
pub fn log_path(log_dir: &Path, repo: &str, kind: StepKind) -> PathBuf {
    log_dir.join(format!("{}-{}.log", repo, kind.log_suffix()))
}

/// Last line of `content` containing `marker`, found by scanning backwards.
pub fn last_status_line<'a>(content: &'a str, marker: &str) -> Option<&'a str> {
    content
        .lines()
        .rev()
        .find(|line| line.contains(marker))
        .map(str::trim_end)
}

/// Reads each repository's build log and keeps those with a status line.
///
/// Repositories without a build log or without a marker line are omitted.
pub fn collect_entries(log_dir: &Path, repos: &[String], marker: &str) -> Vec<HistoryEntry> {
    let mut entries = Vec::new();
    for repo in repos {
        let build_log = log_path(log_dir, repo, StepKind::Build);
        let content = match fs::read_to_string(&build_log) {
            Ok(content) => content,
            Err(e) => {
                debug!("no build log for {} ({}): {}", repo, build_log.display(), e);
                continue;
            }
        };

        match last_status_line(&content, marker) {
            Some(status) => entries.push(HistoryEntry {
                repo: repo.clone(),
                status: status.to_string(),
            }),
            None => warn!(
                "{}",
                PipelineWarning::NoBuildStatus {
                    repo: repo.clone(),
                    marker: marker.to_string(),
                }
            ),
        }
    }
    entries
}

/// Appends a timestamped block of history entries to the dated history file.
pub fn record_history(
    log_dir: &Path,
    repos: &[String],
    marker: &str,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    let path = history_path(log_dir, now.date_naive());
    let entries = collect_entries(log_dir, repos, marker);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(file, "Build Time: {}", now.format("%Y-%m-%d %H:%M:%S%.6f"))?;
    writeln!(file, "-----------------------------------------------------")?;
    for entry in &entries {
        writeln!(file, "{}: {}", entry.repo, entry.status)?;
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_last_status_line_prefers_latest_attempt() {
        let log = "BUILD FAILED\nretrying\nBUILD SUCCESSFUL\nTotal time: 3 seconds\n";
        assert_eq!(last_status_line(log, "BUILD"), Some("BUILD SUCCESSFUL"));
    }

    #[test]
    fn test_last_status_line_missing() {
        assert_eq!(last_status_line("compiling\ndone\n", "BUILD"), None);
    }

    #[test]
    fn test_history_path_uses_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            history_path(Path::new("buildlogs"), date),
            PathBuf::from("buildlogs/build_history_2024-03-09.log")
        );
    }

    #[test]
    fn test_history_omits_repo_without_status() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("a-build.log"),
            "compile\nBUILD SUCCESSFUL\nTotal time: 1 second\n",
        )
        .unwrap();
        fs::write(temp.path().join("b-build.log"), "compile\nno status\n").unwrap();

        let now = Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let repos = vec!["a".to_string(), "b".to_string()];
        let path = record_history(temp.path(), &repos, "BUILD", now).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let entries: Vec<&str> = content
            .lines()
            .filter(|line| line.starts_with("a:") || line.starts_with("b:"))
            .collect();
        assert_eq!(entries, vec!["a: BUILD SUCCESSFUL"]);
    }

    #[test]
    fn test_history_appends_across_runs() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a-build.log"), "BUILD SUCCESSFUL\n").unwrap();
        let repos = vec!["a".to_string()];
        let now = Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        record_history(temp.path(), &repos, "BUILD", now).unwrap();
        let path = record_history(temp.path(), &repos, "BUILD", now).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.matches("a: BUILD SUCCESSFUL").count(), 2);
        assert_eq!(content.matches("Build Time:").count(), 2);
    }
}
