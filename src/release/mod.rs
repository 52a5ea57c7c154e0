//! Release Stage: create or update a GitHub release per repository and
//! upload the contents of its `dist` directory.

pub mod github;
pub mod mock;

pub use github::GitHubReleases;
pub use mock::RecordingReleaseHost;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::decision::DecisionProvider;
use crate::error::{BuildError, Result};
use crate::git::{resolve_latest_tag, VersionControl};
use crate::registry::RepoDescriptor;
use crate::ui;
use crate::warning::PipelineWarning;

/// Directory inside a checkout holding the built artifacts
pub const DIST_DIR: &str = "dist";

/// Parameters of a release to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    pub tag: String,
    pub name: String,
    pub prerelease: bool,
}

/// Remote release hosting. `slug` is `<organization>/<repo>`.
pub trait ReleaseHost {
    /// Tags of all existing releases.
    fn list_release_tags(&self, slug: &str) -> Result<Vec<String>>;

    /// Create and publish a release. Mutates the remote.
    fn create_release(&self, slug: &str, request: &ReleaseRequest) -> Result<()>;

    /// Upload assets to the release for `tag`, replacing same-named assets. Mutates the remote.
    fn upload_assets(&self, slug: &str, tag: &str, assets: &[PathBuf]) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseOptions {
    pub organization: String,
    /// `None` asks the decision provider
    pub upload: Option<bool>,
    pub name: Option<String>,
    pub prerelease: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseActionKind {
    UpdateAssets,
    CreateRelease { name: String },
}

/// What was done (or, in a dry run, would have been done) for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAction {
    pub repo: String,
    pub tag: String,
    pub kind: ReleaseActionKind,
    pub assets: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Regular files in `dir`, sorted by path. A missing directory yields no assets.
pub fn collect_assets(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut assets = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            assets.push(path);
        }
    }
    assets.sort();
    Ok(assets)
}

fn release_repo(
    vcs: &dyn VersionControl,
    host: &dyn ReleaseHost,
    root: &Path,
    repo: &RepoDescriptor,
    options: &ReleaseOptions,
) -> Result<ReleaseAction> {
    let path = repo.local_path(root);
    let tag = resolve_latest_tag(vcs, &path)?.ok_or_else(|| {
        BuildError::release(format!("{} has no tag to release", repo.name))
    })?;
    let slug = format!("{}/{}", options.organization, repo.name);

    let assets = collect_assets(&path.join(DIST_DIR))?;
    if assets.is_empty() {
        let warning = PipelineWarning::NoAssets {
            repo: repo.name.clone(),
        };
        warn!("{}", warning);
        ui::display_warning(&warning);
    }

    let kind = if host.list_release_tags(&slug)?.contains(&tag) {
        ui::display_status(&format!(
            "Updating the assets for the latest tag {} of {}",
            tag, repo.name
        ));
        if !options.dry_run {
            host.upload_assets(&slug, &tag, &assets)?;
        }
        ReleaseActionKind::UpdateAssets
    } else {
        let name = options.name.clone().unwrap_or_else(|| tag.clone());
        ui::display_status(&format!(
            "Creating release version {} for {}",
            tag, repo.name
        ));
        if !options.dry_run {
            let request = ReleaseRequest {
                tag: tag.clone(),
                name: name.clone(),
                prerelease: options.prerelease,
            };
            host.create_release(&slug, &request)?;
            host.upload_assets(&slug, &tag, &assets)?;
        }
        ReleaseActionKind::CreateRelease { name }
    };

    if options.dry_run {
        info!(
            "[dry run] {}: {:?} for {} with {} asset(s)",
            slug,
            kind,
            tag,
            assets.len()
        );
    }

    Ok(ReleaseAction {
        repo: repo.name.clone(),
        tag,
        kind,
        assets,
        dry_run: options.dry_run,
    })
}

/// Releases every repository in selection order, if uploading was chosen.
pub fn release_all(
    vcs: &dyn VersionControl,
    host: &dyn ReleaseHost,
    decisions: &mut dyn DecisionProvider,
    root: &Path,
    selection: &[RepoDescriptor],
    options: &ReleaseOptions,
) -> Result<Vec<ReleaseAction>> {
    let upload = match options.upload {
        Some(upload) => upload,
        None => decisions.resolve_upload()?,
    };
    if !upload {
        info!("Upload not requested; skipping release stage");
        return Ok(Vec::new());
    }
    if options.prerelease {
        ui::display_status("Marking as prerelease");
    }

    let actions = selection
        .iter()
        .map(|repo| release_repo(vcs, host, root, repo, options))
        .collect::<Result<Vec<_>>>()?;

    ui::display_success("Upload completed!");
    Ok(actions)
}
