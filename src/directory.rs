//! Directory Resolver: validates or creates the root holding all checkouts.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::decision::DecisionProvider;
use crate::error::{BuildError, Result};

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .map_err(|e| BuildError::directory(format!("Cannot resolve {}: {}", path.display(), e)))
}

/// Resolves one candidate path.
///
/// Returns `Ok(None)` when the user declined to create a missing directory.
fn try_resolve(path: &Path, decisions: &mut dyn DecisionProvider) -> Result<Option<PathBuf>> {
    if path.is_dir() {
        return canonical(path).map(Some);
    }
    if path.exists() {
        return Err(BuildError::directory(format!(
            "{} exists but is not a directory",
            path.display()
        )));
    }
    if !decisions.confirm_create_directory(path)? {
        return Ok(None);
    }

    info!("Creating directory {}", path.display());
    fs::create_dir_all(path).map_err(|e| {
        BuildError::directory(format!("Cannot create {}: {}", path.display(), e))
    })?;
    canonical(path).map(Some)
}

/// Returns the canonical root directory, asking for another path until one resolves.
pub fn resolve_directory(
    requested: Option<&Path>,
    decisions: &mut dyn DecisionProvider,
) -> Result<PathBuf> {
    let mut candidate = match requested {
        Some(path) => path.to_path_buf(),
        None => decisions.choose_directory()?,
    };

    loop {
        if let Some(root) = try_resolve(&candidate, decisions)? {
            info!("Using build directory {}", root.display());
            return Ok(root);
        }
        candidate = decisions.choose_directory()?;
    }
}
