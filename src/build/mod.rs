//! Build Stage: optional version bump, then the repository's build profile,
//! one logged build-tool invocation per step.

pub mod history;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::decision::DecisionProvider;
use crate::error::{BuildError, Result};
use crate::git::{resolve_latest_tag, VersionControl};
use crate::process::CommandRunner;
use crate::registry::RepoDescriptor;
use crate::ui;
use crate::version::{self, VersionBump};

pub use history::{log_path, HistoryEntry};

/// Directory under the root holding all build logs and the history
pub const LOG_DIR: &str = "buildlogs";

/// How the version to tag before building is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpRequest {
    /// Same component for every repository
    Component(VersionBump),
    /// Ask per repository
    Prompt,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub tool: String,
    pub status_marker: String,
    pub bump: Option<BumpRequest>,
}

/// Outcome of the build stage
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Tags created by version bumps, as (repo, tag)
    pub new_tags: Vec<(String, String)>,
    pub history_file: PathBuf,
}

/// Creates the next version tag for one repository and returns it.
fn bump_repo(
    vcs: &dyn VersionControl,
    decisions: &mut dyn DecisionProvider,
    path: &Path,
    repo: &str,
    request: BumpRequest,
) -> Result<String> {
    let current = resolve_latest_tag(vcs, path)?
        .ok_or_else(|| BuildError::version(format!("{} has no tag to bump from", repo)))?;

    let component = match request {
        BumpRequest::Component(component) => component,
        BumpRequest::Prompt => decisions.resolve_bump(repo, &current)?,
    };

    let new_tag = version::next_tag(&current, component)?;
    let message = format!("Updated {} version to tag \"{}\"", component, new_tag);
    vcs.create_annotated_tag(path, &new_tag, &message)?;
    ui::display_success(&format!("{}: {} -> {}", repo, current, new_tag));
    Ok(new_tag)
}

fn build_repo(
    runner: &dyn CommandRunner,
    root: &Path,
    log_dir: &Path,
    repo: &RepoDescriptor,
    tool: &str,
) -> Result<()> {
    let path = repo.local_path(root);
    for step in repo.profile.steps() {
        let log = log_path(log_dir, &repo.name, step.kind);
        info!("{}: {} {} > {}", repo.name, tool, step.target, log.display());
        runner.run_logged(tool, &[step.target.as_str()], &path, &log)?;
    }
    Ok(())
}

/// Builds every repository in selection order, then records the history.
///
/// The first failing command aborts the stage; repositories after it are not built.
pub fn build_all(
    vcs: &dyn VersionControl,
    runner: &dyn CommandRunner,
    decisions: &mut dyn DecisionProvider,
    root: &Path,
    selection: &[RepoDescriptor],
    options: &BuildOptions,
) -> Result<BuildReport> {
    let log_dir = root.join(LOG_DIR);
    fs::create_dir_all(&log_dir)?;

    let mut new_tags = Vec::new();
    for repo in selection {
        ui::display_status(&format!("Building repo: {}", repo.name));
        if let Some(request) = options.bump {
            let path = repo.local_path(root);
            let tag = bump_repo(vcs, decisions, &path, &repo.name, request)?;
            new_tags.push((repo.name.clone(), tag));
        }
        build_repo(runner, root, &log_dir, repo, &options.tool)?;
    }
    ui::display_success("Repository builds complete.");

    let names: Vec<String> = selection.iter().map(|r| r.name.clone()).collect();
    let history_file =
        history::record_history(&log_dir, &names, &options.status_marker, Local::now())?;
    info!("Build history written to {}", history_file.display());

    Ok(BuildReport {
        new_tags,
        history_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecisions;
    use crate::git::MockVersionControl;
    use crate::process::RecordingRunner;
    use crate::registry::Registry;
    use crate::trace::CallTrace;
    use tempfile::TempDir;

    fn options(bump: Option<BumpRequest>) -> BuildOptions {
        BuildOptions {
            tool: "ant".to_string(),
            status_marker: "BUILD".to_string(),
            bump,
        }
    }

    #[test]
    fn test_profiles_drive_steps() {
        let temp = TempDir::new().unwrap();
        let trace = CallTrace::new();
        let registry = Registry::default();
        let selection = vec![
            registry.find("esgf-getcert").unwrap().clone(),
            registry.find("esg-orp").unwrap().clone(),
        ];
        let vcs = MockVersionControl::new(trace.clone());
        let runner = RecordingRunner::new(trace.clone());
        let mut decisions = ScriptedDecisions::new();

        build_all(
            &vcs,
            &runner,
            &mut decisions,
            temp.path(),
            &selection,
            &options(None),
        )
        .unwrap();

        assert_eq!(
            trace.matching("build:"),
            vec![
                "build:clean esgf-getcert",
                "build:dist esgf-getcert",
                "build:clean_all esg-orp",
                "build:pull esg-orp",
                "build:make_dist esg-orp",
                "build:publish_local esg-orp",
            ]
        );
        let logs = temp.path().join(LOG_DIR);
        assert!(logs.join("esgf-getcert-build.log").exists());
        assert!(!logs.join("esgf-getcert-pull.log").exists());
        assert!(logs.join("esg-orp-publishlocal.log").exists());
    }

    #[test]
    fn test_failure_aborts_remaining_repos() {
        let temp = TempDir::new().unwrap();
        let trace = CallTrace::new();
        let registry = Registry::default();
        let selection = vec![
            registry.find("esgf-idp").unwrap().clone(),
            registry.find("esg-orp").unwrap().clone(),
        ];
        let vcs = MockVersionControl::new(trace.clone());
        let runner = RecordingRunner::new(trace.clone()).failing("esgf-idp", "pull");
        let mut decisions = ScriptedDecisions::new();

        let err = build_all(
            &vcs,
            &runner,
            &mut decisions,
            temp.path(),
            &selection,
            &options(None),
        )
        .unwrap_err();

        assert!(matches!(err, BuildError::ExternalCommand { code: 1, .. }));
        assert_eq!(trace.count("build:"), 2);
        assert_eq!(trace.matching("build:").last().unwrap(), "build:pull esgf-idp");
    }

    #[test]
    fn test_bump_creates_tag_before_building() {
        let temp = TempDir::new().unwrap();
        let trace = CallTrace::new();
        let registry = Registry::default();
        let selection = vec![registry.find("esg-search").unwrap().clone()];
        let vcs = MockVersionControl::new(trace.clone()).with_tag("esg-search", "v4.17.9", Some(1));
        let runner = RecordingRunner::new(trace.clone());
        let mut decisions = ScriptedDecisions::new().bump(VersionBump::Minor);

        let report = build_all(
            &vcs,
            &runner,
            &mut decisions,
            temp.path(),
            &selection,
            &options(Some(BumpRequest::Prompt)),
        )
        .unwrap();

        assert_eq!(
            report.new_tags,
            vec![("esg-search".to_string(), "v4.18.0".to_string())]
        );
        let calls = trace.calls();
        let tag_at = calls.iter().position(|c| c == "git:tag esg-search v4.18.0").unwrap();
        let first_build = calls.iter().position(|c| c.starts_with("build:")).unwrap();
        assert!(tag_at < first_build);
    }

    #[test]
    fn test_bump_without_tags_fails() {
        let temp = TempDir::new().unwrap();
        let registry = Registry::default();
        let selection = vec![registry.find("esg-orp").unwrap().clone()];
        let vcs = MockVersionControl::new(CallTrace::new());
        let runner = RecordingRunner::new(CallTrace::new());
        let mut decisions = ScriptedDecisions::new();

        let err = build_all(
            &vcs,
            &runner,
            &mut decisions,
            temp.path(),
            &selection,
            &options(Some(BumpRequest::Component(VersionBump::Patch))),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Version(_)));
    }

    #[test]
    fn test_history_written_from_build_logs() {
        let temp = TempDir::new().unwrap();
        let registry = Registry::default();
        let selection = vec![
            registry.find("esgf-idp").unwrap().clone(),
            registry.find("esg-orp").unwrap().clone(),
        ];
        let vcs = MockVersionControl::new(CallTrace::new());
        let runner = RecordingRunner::new(CallTrace::new())
            .with_log("esgf-idp", "make_dist", "compile\nBUILD SUCCESSFUL\n")
            .with_log("esg-orp", "make_dist", "compile\n");
        let mut decisions = ScriptedDecisions::new();

        let report = build_all(
            &vcs,
            &runner,
            &mut decisions,
            temp.path(),
            &selection,
            &options(None),
        )
        .unwrap();

        let history = fs::read_to_string(report.history_file).unwrap();
        assert!(history.contains("esgf-idp: BUILD SUCCESSFUL"));
        assert!(!history.contains("esg-orp:"));
    }
}
