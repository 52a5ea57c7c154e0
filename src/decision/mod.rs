//! Pluggable answers to the questions the pipeline may need to ask.
//!
//! Stages never read the terminal themselves. They ask a [DecisionProvider],
//! which is either [InteractiveDecisions] (prompts on a terminal) or
//! [ScriptedDecisions] (preset answers for automation and tests).

pub mod interactive;
pub mod scripted;

pub use interactive::InteractiveDecisions;
pub use scripted::ScriptedDecisions;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::registry::{Registry, RepoDescriptor};
use crate::sync::BranchDirective;
use crate::version::VersionBump;

pub trait DecisionProvider {
    /// Choose the repositories to operate on. Must return a non-empty list.
    fn select_repos(&mut self, registry: &Registry) -> Result<Vec<RepoDescriptor>>;

    /// Choose a local branch or [BranchDirective::Latest] for `repo`.
    fn resolve_branch(&mut self, repo: &str, branches: &[String]) -> Result<BranchDirective>;

    /// Whether built assets should be uploaded.
    fn resolve_upload(&mut self) -> Result<bool>;

    /// Which version component to bump, given the current tag.
    fn resolve_bump(&mut self, repo: &str, current_tag: &str) -> Result<VersionBump>;

    /// Whether a missing root directory should be created.
    fn confirm_create_directory(&mut self, path: &Path) -> Result<bool>;

    /// Ask for a root directory.
    fn choose_directory(&mut self) -> Result<PathBuf>;
}
