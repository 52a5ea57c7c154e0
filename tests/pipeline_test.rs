// tests/pipeline_test.rs
//
// End-to-end runs of the stages against recording doubles.
use esgf_build::build::{BuildOptions, BumpRequest};
use esgf_build::decision::ScriptedDecisions;
use esgf_build::error::BuildError;
use esgf_build::git::{CommitInfo, MockVersionControl};
use esgf_build::pipeline::{Pipeline, PipelineOptions};
use esgf_build::process::RecordingRunner;
use esgf_build::registry::{Registry, RepoDescriptor};
use esgf_build::release::{RecordingReleaseHost, ReleaseActionKind, ReleaseOptions};
use esgf_build::selector::{self, RepoRequest};
use esgf_build::sync::{self, BranchDirective, COMMITS_FILE, TAGLIST_FILE};
use esgf_build::trace::CallTrace;
use esgf_build::version::VersionBump;
use std::fs;
use tempfile::TempDir;

fn pipeline_options(branch: BranchDirective, dry_run: bool) -> PipelineOptions {
    PipelineOptions {
        branch,
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

fn pick(names: &[&str]) -> Vec<RepoDescriptor> {
    let registry = Registry::default();
    names
        .iter()
        .map(|name| registry.find(name).unwrap().clone())
        .collect()
}

#[test]
fn test_index_selection_keeps_given_order() {
    let registry = Registry::default();
    let mut decisions = ScriptedDecisions::new();
    let request = RepoRequest::from_args(&[], Some("2,0"));

    let selection = selector::select_repos(&registry, &request, &mut decisions).unwrap();
    let names: Vec<&str> = selection.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["esgf-idp", "esgf-dashboard"]);
}

#[test]
fn test_repeated_latest_sync_reuses_branch() {
    let temp = TempDir::new().unwrap();
    let trace = CallTrace::new();
    let vcs = MockVersionControl::new(trace.clone()).with_tag("esg-orp", "v2.11.0", Some(10));
    let mut decisions = ScriptedDecisions::new();
    let selection = pick(&["esg-orp"]);

    sync::sync_all(&vcs, &mut decisions, temp.path(), &selection, &BranchDirective::Latest)
        .unwrap();
    let records =
        sync::sync_all(&vcs, &mut decisions, temp.path(), &selection, &BranchDirective::Latest)
            .unwrap();

    assert_eq!(records[0].tag.as_deref(), Some("v2.11.0"));
    assert_eq!(trace.count("git:clone"), 1);
    assert_eq!(trace.count("git:checkout_new esg-orp v2.11.0"), 2);
    assert_eq!(trace.matching("git:checkout esg-orp"), vec!["git:checkout esg-orp v2.11.0"]);
    assert_eq!(vcs.head("esg-orp"), Some("v2.11.0".to_string()));
}

#[test]
fn test_named_branch_is_checked_out_and_pulled() {
    let temp = TempDir::new().unwrap();
    let trace = CallTrace::new();
    let vcs = MockVersionControl::new(trace.clone())
        .with_branches("esgf-idp", &["master", "devel"])
        .with_tag("esgf-idp", "v1.1.4", Some(10))
        .with_commits_since_tag(
            "esgf-idp",
            vec![CommitInfo {
                hash: "0123abcd".to_string(),
                author: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                date: "Thu Jan  1 00:00:00 1970 +0000".to_string(),
                message: "Fix session timeout".to_string(),
            }],
        );
    let mut decisions = ScriptedDecisions::new();
    let directive = BranchDirective::Named("devel".to_string());

    sync::sync_all(&vcs, &mut decisions, temp.path(), &pick(&["esgf-idp"]), &directive).unwrap();

    assert_eq!(
        trace.matching("git:pull"),
        vec!["git:pull esgf-idp devel"]
    );
    let taglist = fs::read_to_string(temp.path().join(TAGLIST_FILE)).unwrap();
    assert!(taglist.contains("esgf-idp\n-------------------------\nv1.1.4"));
    let commits = fs::read_to_string(temp.path().join(COMMITS_FILE)).unwrap();
    assert!(commits.contains("Commits since last tag (v1.1.4) for esgf-idp"));
    assert!(commits.contains("    Fix session timeout"));
}

#[test]
fn test_unknown_branch_aborts_sync() {
    let temp = TempDir::new().unwrap();
    let vcs = MockVersionControl::new(CallTrace::new()).with_branches("esgf-idp", &["master"]);
    let mut decisions = ScriptedDecisions::new();
    let directive = BranchDirective::Named("devel".to_string());

    let err = sync::sync_all(&vcs, &mut decisions, temp.path(), &pick(&["esgf-idp"]), &directive)
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::BranchNotFound { ref branch, ref repo } if branch == "devel" && repo == "esgf-idp"
    ));
}

#[test]
fn test_prompted_branch_per_repository() {
    let temp = TempDir::new().unwrap();
    let trace = CallTrace::new();
    let vcs = MockVersionControl::new(trace.clone())
        .with_branches("esgf-idp", &["master"])
        .with_tag("esgf-idp", "v1.1.4", Some(10));
    let mut decisions =
        ScriptedDecisions::new().branch(BranchDirective::Named("master".to_string()));

    sync::sync_all(
        &vcs,
        &mut decisions,
        temp.path(),
        &pick(&["esgf-idp"]),
        &BranchDirective::Prompt,
    )
    .unwrap();

    assert_eq!(vcs.head("esgf-idp"), Some("master".to_string()));
}

#[test]
fn test_full_run_with_bump_and_release() {
    let temp = TempDir::new().unwrap();
    let trace = CallTrace::new();
    let vcs = MockVersionControl::new(trace.clone())
        .with_tag("esgf-getcert", "v1.0.3", Some(10))
        .with_tag("esg-search", "v4.17.9", Some(20));
    let runner = RecordingRunner::new(trace.clone())
        .with_log("esgf-getcert", "dist", "BUILD SUCCESSFUL\n")
        .with_log("esg-search", "make_dist", "BUILD FAILED\nBUILD SUCCESSFUL\n");
    let host = RecordingReleaseHost::new(trace.clone()).with_release("ESGF/esgf-getcert", "v1.0.4");
    let mut decisions = ScriptedDecisions::new();

    let mut options = pipeline_options(BranchDirective::Latest, false);
    options.build.bump = Some(BumpRequest::Component(VersionBump::Patch));

    let report = Pipeline {
        vcs: &vcs,
        runner: &runner,
        host: &host,
        decisions: &mut decisions,
    }
    .run(temp.path(), &pick(&["esgf-getcert", "esg-search"]), &options)
    .unwrap();

    assert_eq!(
        report.build.new_tags,
        vec![
            ("esgf-getcert".to_string(), "v1.0.4".to_string()),
            ("esg-search".to_string(), "v4.17.10".to_string()),
        ]
    );
    assert_eq!(report.releases[0].kind, ReleaseActionKind::UpdateAssets);
    assert_eq!(
        report.releases[1].kind,
        ReleaseActionKind::CreateRelease {
            name: "v4.17.10".to_string()
        }
    );

    let history = fs::read_to_string(&report.build.history_file).unwrap();
    assert!(history.contains("esgf-getcert: BUILD SUCCESSFUL"));
    assert!(history.contains("esg-search: BUILD SUCCESSFUL"));
    assert_eq!(host.uploads().len(), 2);
}

#[test]
fn test_dry_run_lists_but_never_mutates() {
    let temp = TempDir::new().unwrap();
    let trace = CallTrace::new();
    let vcs = MockVersionControl::new(trace.clone())
        .with_tag("esgf-idp", "v1.1.4", Some(10))
        .with_tag("esg-orp", "v2.11.0", Some(10));
    let runner = RecordingRunner::new(trace.clone());
    let host = RecordingReleaseHost::new(trace.clone()).with_release("ESGF/esg-orp", "v2.11.0");
    let mut decisions = ScriptedDecisions::new();

    let report = Pipeline {
        vcs: &vcs,
        runner: &runner,
        host: &host,
        decisions: &mut decisions,
    }
    .run(
        temp.path(),
        &pick(&["esgf-idp", "esg-orp"]),
        &pipeline_options(BranchDirective::Latest, true),
    )
    .unwrap();

    assert_eq!(trace.count("release:list"), 2);
    assert!(host.created().is_empty());
    assert!(host.uploads().is_empty());
    assert_eq!(
        report.releases[0].kind,
        ReleaseActionKind::CreateRelease {
            name: "v1.1.4".to_string()
        }
    );
    assert_eq!(report.releases[1].kind, ReleaseActionKind::UpdateAssets);
}

#[test]
fn test_assume_yes_runs_unattended() {
    let temp = TempDir::new().unwrap();
    let trace = CallTrace::new();
    let vcs = MockVersionControl::new(trace.clone()).with_tag("esg-orp", "v2.11.0", Some(10));
    let runner = RecordingRunner::new(trace.clone());
    let host = RecordingReleaseHost::new(trace.clone());
    let mut decisions = ScriptedDecisions::assume_yes();

    let mut options = pipeline_options(BranchDirective::Prompt, false);
    options.release.upload = None;

    let report = Pipeline {
        vcs: &vcs,
        runner: &runner,
        host: &host,
        decisions: &mut decisions,
    }
    .run(temp.path(), &pick(&["esg-orp"]), &options)
    .unwrap();

    assert_eq!(report.tags[0].tag.as_deref(), Some("v2.11.0"));
    assert_eq!(report.releases.len(), 1);
}
