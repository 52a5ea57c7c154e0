//! Version control abstraction layer
//!
//! The pipeline talks to repositories only through the [VersionControl]
//! trait. Every operation takes the repository path explicitly; nothing here
//! reads or changes the process working directory.
//!
//! - [repository::Git2VersionControl]: real implementation using the `git2` crate
//! - [mock::MockVersionControl]: in-memory implementation for tests

pub mod mock;
pub mod progress;
pub mod repository;

pub use mock::MockVersionControl;
pub use repository::Git2VersionControl;

use crate::error::Result;
use crate::version;
use std::path::Path;

/// Commit information used in the "commits since last tag" report
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// Full commit hash
    pub hash: String,
    pub author: String,
    pub email: String,
    /// Commit time formatted like `git log`
    pub date: String,
    pub message: String,
}

/// A tag together with the commit time it resolves to.
///
/// `committed_at` is `None` when the tag does not point at a commit
/// (for example a tag on a blob). `tagged_at` is the tagger time of an
/// annotated tag and `None` for lightweight tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCandidate {
    pub name: String,
    pub committed_at: Option<i64>,
    pub tagged_at: Option<i64>,
}

impl TagCandidate {
    pub fn new(name: impl Into<String>, committed_at: Option<i64>) -> Self {
        TagCandidate {
            name: name.into(),
            committed_at,
            tagged_at: None,
        }
    }

    pub fn with_tagged_at(mut self, tagged_at: Option<i64>) -> Self {
        self.tagged_at = tagged_at;
        self
    }
}

/// Picks the tag whose commit is the most recent.
///
/// Tags that do not resolve to a commit are ignored even if they were created
/// later. Tags on the same commit (a version bump on a checked-out tag) are
/// ordered by tagger time, then by version. If all of these are equal, the
/// candidate listed last wins.
pub fn select_latest_tag(candidates: &[TagCandidate]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| {
            c.committed_at.map(|time| {
                let version = version::parse_tag_version(&c.name).ok();
                ((time, c.tagged_at, version), c)
            })
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, c)| c.name.clone())
}

/// Version control operations needed by the sync, build and release stages.
pub trait VersionControl {
    /// Clone `url` into `path`, reporting transfer progress.
    fn clone_repo(&self, url: &str, path: &Path) -> Result<()>;

    /// Fetch all tags from `origin`.
    fn fetch_tags(&self, path: &Path) -> Result<()>;

    /// Names of the local branches.
    fn list_branches(&self, path: &Path) -> Result<Vec<String>>;

    /// Latest commit-pointing tag, by commit timestamp. Does not fetch.
    fn latest_tag(&self, path: &Path) -> Result<Option<String>>;

    /// Create a local branch named `branch` at the commit of `tag` and check it out.
    ///
    /// Returns [crate::error::BuildError::CheckoutConflict] if the branch already exists.
    fn checkout_new_branch(&self, path: &Path, branch: &str, tag: &str) -> Result<()>;

    /// Check out an existing local branch.
    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()>;

    /// Fetch `origin/<branch>` and fast-forward the local branch to it.
    fn pull(&self, path: &Path, branch: &str) -> Result<()>;

    /// Commits reachable from HEAD but not from `tag`, newest first.
    fn commits_since(&self, path: &Path, tag: &str) -> Result<Vec<CommitInfo>>;

    /// Create an annotated tag on HEAD.
    fn create_annotated_tag(&self, path: &Path, name: &str, message: &str) -> Result<()>;
}

/// Fetches remote tags, then resolves the latest one.
pub fn resolve_latest_tag(vcs: &dyn VersionControl, path: &Path) -> Result<Option<String>> {
    vcs.fetch_tags(path)?;
    vcs.latest_tag(path)
}
