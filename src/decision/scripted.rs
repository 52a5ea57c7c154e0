use std::path::{Path, PathBuf};

use crate::decision::DecisionProvider;
use crate::error::{BuildError, Result};
use crate::registry::{Registry, RepoDescriptor};
use crate::selector;
use crate::sync::BranchDirective;
use crate::version::VersionBump;

/// Preset answers for non-interactive runs.
///
/// A question without a preset answer is a [BuildError::Decision], never a
/// silent default.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDecisions {
    /// `None` selects the whole registry when set via [ScriptedDecisions::select_all]
    repos: Option<Option<String>>,
    branch: Option<BranchDirective>,
    upload: Option<bool>,
    bump: Option<VersionBump>,
    create_directory: Option<bool>,
    directory: Option<PathBuf>,
}

impl ScriptedDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers used by `--yes`: all repositories, latest tag, upload, create directories.
    pub fn assume_yes() -> Self {
        ScriptedDecisions::new()
            .select_all()
            .branch(BranchDirective::Latest)
            .upload(true)
            .create_directory(true)
    }

    pub fn select_all(mut self) -> Self {
        self.repos = Some(None);
        self
    }

    /// Select repositories by a comma-separated index list
    pub fn select_indexes(mut self, indexes: impl Into<String>) -> Self {
        self.repos = Some(Some(indexes.into()));
        self
    }

    pub fn branch(mut self, branch: BranchDirective) -> Self {
        self.branch = Some(branch);
        self
    }

    pub fn upload(mut self, upload: bool) -> Self {
        self.upload = Some(upload);
        self
    }

    pub fn bump(mut self, bump: VersionBump) -> Self {
        self.bump = Some(bump);
        self
    }

    pub fn create_directory(mut self, create: bool) -> Self {
        self.create_directory = Some(create);
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }
}

fn unanswered(question: &str) -> BuildError {
    BuildError::decision(format!(
        "{} requires an answer, but the run is non-interactive",
        question
    ))
}

impl DecisionProvider for ScriptedDecisions {
    fn select_repos(&mut self, registry: &Registry) -> Result<Vec<RepoDescriptor>> {
        match &self.repos {
            Some(None) => Ok(registry.all().to_vec()),
            Some(Some(indexes)) => selector::parse_index_list(registry, indexes),
            None => Err(unanswered("Repository selection")),
        }
    }

    fn resolve_branch(&mut self, _repo: &str, _branches: &[String]) -> Result<BranchDirective> {
        match &self.branch {
            Some(BranchDirective::Prompt) | None => Err(unanswered("Branch selection")),
            Some(branch) => Ok(branch.clone()),
        }
    }

    fn resolve_upload(&mut self) -> Result<bool> {
        self.upload.ok_or_else(|| unanswered("Upload decision"))
    }

    fn resolve_bump(&mut self, _repo: &str, _current_tag: &str) -> Result<VersionBump> {
        self.bump.ok_or_else(|| unanswered("Version bump"))
    }

    fn confirm_create_directory(&mut self, _path: &Path) -> Result<bool> {
        self.create_directory
            .ok_or_else(|| unanswered("Directory creation"))
    }

    fn choose_directory(&mut self) -> Result<PathBuf> {
        self.directory
            .clone()
            .ok_or_else(|| unanswered("Directory selection"))
    }
}
