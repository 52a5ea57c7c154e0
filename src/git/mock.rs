use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::git::{select_latest_tag, CommitInfo, TagCandidate, VersionControl};
use crate::trace::CallTrace;

#[derive(Debug, Clone, Default)]
struct MockRepoState {
    branches: Vec<String>,
    tags: Vec<TagCandidate>,
    commits_since_tag: Vec<CommitInfo>,
    head: Option<String>,
    /// Commit time at the tip of branches created from tags
    branch_commits: HashMap<String, i64>,
}

impl MockRepoState {
    /// Commit time of HEAD. A branch not created from a tag is assumed to be
    /// at the newest tagged commit.
    fn head_commit_time(&self) -> i64 {
        self.head
            .as_ref()
            .and_then(|branch| self.branch_commits.get(branch).copied())
            .or_else(|| self.tags.iter().filter_map(|t| t.committed_at).max())
            .unwrap_or(0)
    }

    /// A clock that is later than every recorded commit or tagger time
    fn now(&self) -> i64 {
        self.tags
            .iter()
            .flat_map(|t| [t.committed_at, t.tagged_at])
            .flatten()
            .max()
            .unwrap_or(0)
            + 1
    }
}

/// Mock version control for testing without actual git operations.
///
/// Repositories are keyed by the last component of their path. Every call is
/// recorded in the shared [CallTrace] as `git:<operation> <repo> [<arg>]`.
pub struct MockVersionControl {
    repos: RefCell<HashMap<String, MockRepoState>>,
    trace: CallTrace,
}

fn repo_key(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string()
}

impl MockVersionControl {
    pub fn new(trace: CallTrace) -> Self {
        MockVersionControl {
            repos: RefCell::new(HashMap::new()),
            trace,
        }
    }

    /// Set the local branches of a repository
    pub fn with_branches(self, repo: &str, branches: &[&str]) -> Self {
        self.repos
            .borrow_mut()
            .entry(repo.to_string())
            .or_default()
            .branches = branches.iter().map(|b| b.to_string()).collect();
        self
    }

    /// Add a tag; `committed_at: None` models a tag that does not point at a commit
    pub fn with_tag(self, repo: &str, name: &str, committed_at: Option<i64>) -> Self {
        self.repos
            .borrow_mut()
            .entry(repo.to_string())
            .or_default()
            .tags
            .push(TagCandidate::new(name, committed_at));
        self
    }

    /// Set the commits reported as newer than the latest tag
    pub fn with_commits_since_tag(self, repo: &str, commits: Vec<CommitInfo>) -> Self {
        self.repos
            .borrow_mut()
            .entry(repo.to_string())
            .or_default()
            .commits_since_tag = commits;
        self
    }

    /// Currently checked out branch of a repository
    pub fn head(&self, repo: &str) -> Option<String> {
        self.repos.borrow().get(repo).and_then(|r| r.head.clone())
    }

    pub fn tag_names(&self, repo: &str) -> Vec<String> {
        self.repos
            .borrow()
            .get(repo)
            .map(|r| r.tags.iter().map(|t| t.name.clone()).collect())
            .unwrap_or_default()
    }

    fn with_repo<T>(&self, path: &Path, f: impl FnOnce(&mut MockRepoState) -> T) -> T {
        let mut repos = self.repos.borrow_mut();
        f(repos.entry(repo_key(path)).or_default())
    }
}

impl VersionControl for MockVersionControl {
    fn clone_repo(&self, _url: &str, path: &Path) -> Result<()> {
        self.trace.record(format!("git:clone {}", repo_key(path)));
        fs::create_dir_all(path)?;
        self.with_repo(path, |_| ());
        Ok(())
    }

    fn fetch_tags(&self, path: &Path) -> Result<()> {
        self.trace.record(format!("git:fetch_tags {}", repo_key(path)));
        Ok(())
    }

    fn list_branches(&self, path: &Path) -> Result<Vec<String>> {
        Ok(self.with_repo(path, |repo| repo.branches.clone()))
    }

    fn latest_tag(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.with_repo(path, |repo| select_latest_tag(&repo.tags)))
    }

    fn checkout_new_branch(&self, path: &Path, branch: &str, tag: &str) -> Result<()> {
        self.trace
            .record(format!("git:checkout_new {} {}", repo_key(path), branch));
        self.with_repo(path, |repo| {
            if repo.branches.iter().any(|b| b == branch) {
                return Err(BuildError::CheckoutConflict(branch.to_string()));
            }
            if let Some(time) = repo
                .tags
                .iter()
                .find(|t| t.name == tag)
                .and_then(|t| t.committed_at)
            {
                repo.branch_commits.insert(branch.to_string(), time);
            }
            repo.branches.push(branch.to_string());
            repo.head = Some(branch.to_string());
            Ok(())
        })
    }

    fn checkout_branch(&self, path: &Path, branch: &str) -> Result<()> {
        self.trace
            .record(format!("git:checkout {} {}", repo_key(path), branch));
        self.with_repo(path, |repo| {
            if !repo.branches.iter().any(|b| b == branch) {
                return Err(BuildError::Git(git2::Error::from_str(&format!(
                    "reference 'refs/heads/{}' not found",
                    branch
                ))));
            }
            repo.head = Some(branch.to_string());
            Ok(())
        })
    }

    fn pull(&self, path: &Path, branch: &str) -> Result<()> {
        self.trace
            .record(format!("git:pull {} {}", repo_key(path), branch));
        Ok(())
    }

    fn commits_since(&self, path: &Path, _tag: &str) -> Result<Vec<CommitInfo>> {
        Ok(self.with_repo(path, |repo| repo.commits_since_tag.clone()))
    }

    fn create_annotated_tag(&self, path: &Path, name: &str, _message: &str) -> Result<()> {
        self.trace
            .record(format!("git:tag {} {}", repo_key(path), name));
        self.with_repo(path, |repo| {
            let tag = TagCandidate::new(name, Some(repo.head_commit_time()))
                .with_tagged_at(Some(repo.now()));
            repo.tags.push(tag);
        });
        Ok(())
    }
}
