//! Repo Selector: turns command-line input (or a menu answer) into the
//! ordered build selection.

use tracing::info;

use crate::decision::DecisionProvider;
use crate::error::{BuildError, Result};
use crate::registry::{Registry, RepoDescriptor};

/// Keyword selecting every registered repository
pub const ALL: &str = "all";

/// What the caller asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoRequest {
    All,
    Names(Vec<String>),
    Indexes(String),
    /// Nothing given: show the menu
    Prompt,
}

impl RepoRequest {
    /// Positional names win over `--select`; `all` anywhere selects everything.
    pub fn from_args(names: &[String], indexes: Option<&str>) -> Self {
        if names.iter().any(|name| name == ALL) {
            RepoRequest::All
        } else if !names.is_empty() {
            RepoRequest::Names(names.to_vec())
        } else if let Some(indexes) = indexes {
            RepoRequest::Indexes(indexes.to_string())
        } else {
            RepoRequest::Prompt
        }
    }
}

/// Maps a comma-separated index list onto the registry, preserving the given order.
pub fn parse_index_list(registry: &Registry, input: &str) -> Result<Vec<RepoDescriptor>> {
    let mut selection = Vec::new();
    for piece in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let index: usize = piece
            .parse()
            .map_err(|_| BuildError::selection(format!("'{}' is not a repo index", piece)))?;
        let repo = registry.get(index).ok_or_else(|| {
            BuildError::selection(format!(
                "Index {} is out of range (0-{})",
                index,
                registry.len().saturating_sub(1)
            ))
        })?;
        selection.push(repo.clone());
    }

    if selection.is_empty() {
        return Err(BuildError::selection("No applicable repos selected."));
    }
    Ok(selection)
}

/// Looks up repositories by name, preserving the given order.
pub fn select_by_names(registry: &Registry, names: &[String]) -> Result<Vec<RepoDescriptor>> {
    let selection = names
        .iter()
        .map(|name| {
            registry
                .find(name)
                .cloned()
                .ok_or_else(|| BuildError::selection(format!("Unknown repository '{}'", name)))
        })
        .collect::<Result<Vec<_>>>()?;

    if selection.is_empty() {
        return Err(BuildError::selection("No applicable repos selected."));
    }
    Ok(selection)
}

/// Produces the non-empty, ordered build selection.
pub fn select_repos(
    registry: &Registry,
    request: &RepoRequest,
    decisions: &mut dyn DecisionProvider,
) -> Result<Vec<RepoDescriptor>> {
    let selection = match request {
        RepoRequest::All => registry.all().to_vec(),
        RepoRequest::Names(names) => select_by_names(registry, names)?,
        RepoRequest::Indexes(indexes) => parse_index_list(registry, indexes)?,
        RepoRequest::Prompt => decisions.select_repos(registry)?,
    };

    if selection.is_empty() {
        return Err(BuildError::selection("No applicable repos selected."));
    }

    let names: Vec<&str> = selection.iter().map(|r| r.name.as_str()).collect();
    info!("Building repos: {:?}", names);
    Ok(selection)
}
