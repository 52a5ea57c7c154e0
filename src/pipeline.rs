//! Stage orchestration
//!
//! Runs Sync, Build (with history) and Release in that order, each stage over
//! the whole selection before the next one starts. The pipeline only sees its
//! collaborators through traits, so the same code runs against git, `ant` and
//! GitHub in production and against recording doubles in tests.

use std::path::Path;

use tracing::info;

use crate::build::{self, BuildOptions, BuildReport};
use crate::decision::DecisionProvider;
use crate::error::Result;
use crate::git::VersionControl;
use crate::process::CommandRunner;
use crate::registry::RepoDescriptor;
use crate::release::{self, ReleaseAction, ReleaseHost, ReleaseOptions};
use crate::sync::{self, BranchDirective, TagRecord};
use crate::ui;

/// Run-wide options for all stages
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub branch: BranchDirective,
    pub build: BuildOptions,
    pub release: ReleaseOptions,
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub tags: Vec<TagRecord>,
    pub build: BuildReport,
    pub releases: Vec<ReleaseAction>,
}

pub struct Pipeline<'a> {
    pub vcs: &'a dyn VersionControl,
    pub runner: &'a dyn CommandRunner,
    pub host: &'a dyn ReleaseHost,
    pub decisions: &'a mut dyn DecisionProvider,
}

impl<'a> Pipeline<'a> {
    /// Run every stage over `selection`, rooted at `root`.
    ///
    /// The first error aborts the run. Files already written by earlier
    /// stages are left in place.
    pub fn run(
        &mut self,
        root: &Path,
        selection: &[RepoDescriptor],
        options: &PipelineOptions,
    ) -> Result<PipelineReport> {
        info!(
            "Running pipeline for {} repositories under {}",
            selection.len(),
            root.display()
        );

        ui::display_stage("Sync");
        let tags = sync::sync_all(self.vcs, self.decisions, root, selection, &options.branch)?;

        ui::display_stage("Build");
        let build = build::build_all(
            self.vcs,
            self.runner,
            self.decisions,
            root,
            selection,
            &options.build,
        )?;

        ui::display_stage("Release");
        let releases = release::release_all(
            self.vcs,
            self.host,
            self.decisions,
            root,
            selection,
            &options.release,
        )?;

        Ok(PipelineReport {
            tags,
            build,
            releases,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::ScriptedDecisions;
    use crate::git::MockVersionControl;
    use crate::process::RecordingRunner;
    use crate::registry::Registry;
    use crate::release::RecordingReleaseHost;
    use crate::trace::CallTrace;
    use tempfile::TempDir;

    fn options(dry_run: bool) -> PipelineOptions {
        PipelineOptions {
            branch: BranchDirective::Latest,
            build: BuildOptions {
                tool: "ant".to_string(),
                status_marker: "BUILD".to_string(),
                bump: None,
            },
            release: ReleaseOptions {
                organization: "ESGF".to_string(),
                upload: Some(true),
                name: None,
                prerelease: false,
                dry_run,
            },
        }
    }

    fn selection() -> Vec<RepoDescriptor> {
        let registry = Registry::default();
        vec![
            registry.find("esgf-idp").unwrap().clone(),
            registry.find("esg-orp").unwrap().clone(),
        ]
    }

    fn vcs(trace: &CallTrace) -> MockVersionControl {
        MockVersionControl::new(trace.clone())
            .with_tag("esgf-idp", "v1.1.4", Some(100))
            .with_tag("esg-orp", "v2.11.0", Some(200))
    }

    fn stage_index(calls: &[String], prefix: &str, last: bool) -> usize {
        let mut positions = calls
            .iter()
            .enumerate()
            .filter(|(_, call)| call.starts_with(prefix))
            .map(|(idx, _)| idx);
        if last {
            positions.last().unwrap()
        } else {
            positions.next().unwrap()
        }
    }

    #[test]
    fn test_stages_run_over_whole_selection_in_order() {
        let temp = TempDir::new().unwrap();
        let trace = CallTrace::new();
        let vcs = vcs(&trace);
        let runner = RecordingRunner::new(trace.clone());
        let host = RecordingReleaseHost::new(trace.clone());
        let mut decisions = ScriptedDecisions::new();

        let report = Pipeline {
            vcs: &vcs,
            runner: &runner,
            host: &host,
            decisions: &mut decisions,
        }
        .run(temp.path(), &selection(), &options(false))
        .unwrap();

        let calls = trace.calls();
        assert!(stage_index(&calls, "git:checkout_new", true) < stage_index(&calls, "build:", false));
        assert!(stage_index(&calls, "build:", true) < stage_index(&calls, "release:", false));

        assert_eq!(
            report.tags.iter().map(|t| t.repo.as_str()).collect::<Vec<_>>(),
            vec!["esgf-idp", "esg-orp"]
        );
        assert_eq!(
            trace.matching("release:create"),
            vec![
                "release:create ESGF/esgf-idp v1.1.4",
                "release:create ESGF/esg-orp v2.11.0"
            ]
        );
        assert!(temp.path().join(sync::TAGLIST_FILE).exists());
        assert!(report.build.history_file.exists());
    }

    #[test]
    fn test_dry_run_never_mutates_release_host() {
        let temp = TempDir::new().unwrap();
        let trace = CallTrace::new();
        let vcs = vcs(&trace);
        let runner = RecordingRunner::new(trace.clone());
        let host = RecordingReleaseHost::new(trace.clone());
        let mut decisions = ScriptedDecisions::new();

        let report = Pipeline {
            vcs: &vcs,
            runner: &runner,
            host: &host,
            decisions: &mut decisions,
        }
        .run(temp.path(), &selection(), &options(true))
        .unwrap();

        assert_eq!(trace.count("release:list"), 2);
        assert_eq!(trace.count("release:create"), 0);
        assert_eq!(trace.count("release:upload"), 0);
        assert!(report.releases.iter().all(|action| action.dry_run));
    }

    #[test]
    fn test_build_failure_skips_release() {
        let temp = TempDir::new().unwrap();
        let trace = CallTrace::new();
        let vcs = vcs(&trace);
        let runner = RecordingRunner::new(trace.clone()).failing("esg-orp", "make_dist");
        let host = RecordingReleaseHost::new(trace.clone());
        let mut decisions = ScriptedDecisions::new();

        let result = Pipeline {
            vcs: &vcs,
            runner: &runner,
            host: &host,
            decisions: &mut decisions,
        }
        .run(temp.path(), &selection(), &options(false));

        assert!(result.is_err());
        assert_eq!(trace.count("release:"), 0);
    }
}
