//! Static registry of the repositories this tool knows how to build.
//!
//! Each [`RepoDescriptor`] carries its own [`BuildProfile`], so the build
//! stage never branches on repository names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// GitHub organization hosting the default repositories
pub const DEFAULT_ORGANIZATION: &str = "ESGF";

/// The kind of a build step. Determines the log file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Clean,
    Pull,
    Build,
    PublishLocal,
}

impl StepKind {
    /// Suffix used in `buildlogs/<repo>-<suffix>.log`
    pub fn log_suffix(&self) -> &'static str {
        match self {
            StepKind::Clean => "clean",
            StepKind::Pull => "pull",
            StepKind::Build => "build",
            StepKind::PublishLocal => "publishlocal",
        }
    }
}

/// One invocation of the build tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    pub kind: StepKind,
    pub target: String,
}

impl BuildStep {
    pub fn new(kind: StepKind, target: impl Into<String>) -> Self {
        BuildStep {
            kind,
            target: target.into(),
        }
    }
}

/// The ordered set of build-tool steps applicable to a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildProfile {
    /// clean_all, pull, make_dist, publish_local
    #[default]
    Full,
    /// Only a clean step and a build step, with custom target names.
    CleanDist { clean: String, build: String },
}

impl BuildProfile {
    pub fn steps(&self) -> Vec<BuildStep> {
        match self {
            BuildProfile::Full => vec![
                BuildStep::new(StepKind::Clean, "clean_all"),
                BuildStep::new(StepKind::Pull, "pull"),
                BuildStep::new(StepKind::Build, "make_dist"),
                BuildStep::new(StepKind::PublishLocal, "publish_local"),
            ],
            BuildProfile::CleanDist { clean, build } => vec![
                BuildStep::new(StepKind::Clean, clean.as_str()),
                BuildStep::new(StepKind::Build, build.as_str()),
            ],
        }
    }
}

/// A repository known to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub profile: BuildProfile,
}

impl RepoDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>, profile: BuildProfile) -> Self {
        RepoDescriptor {
            name: name.into(),
            url: url.into(),
            profile,
        }
    }

    /// Local checkout path of this repository under `root`
    pub fn local_path(&self, root: &Path) -> PathBuf {
        root.join(&self.name)
    }
}

fn github_url(name: &str) -> String {
    format!("https://github.com/{}/{}.git", DEFAULT_ORGANIZATION, name)
}

/// The built-in repository list, in menu order.
pub fn default_repos() -> Vec<RepoDescriptor> {
    let full = |name: &str| RepoDescriptor::new(name, github_url(name), BuildProfile::Full);

    vec![
        full("esgf-dashboard"),
        RepoDescriptor::new(
            "esgf-getcert",
            github_url("esgf-getcert"),
            BuildProfile::CleanDist {
                clean: "clean".to_string(),
                build: "dist".to_string(),
            },
        ),
        full("esgf-idp"),
        full("esgf-node-manager"),
        full("esgf-security"),
        full("esg-orp"),
        full("esg-search"),
        RepoDescriptor::new(
            "esgf-stats-api",
            github_url("esgf-stats-api"),
            BuildProfile::CleanDist {
                clean: "clean_all".to_string(),
                build: "make_dist".to_string(),
            },
        ),
    ]
}

/// Ordered, immutable list of repositories available for selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    repos: Vec<RepoDescriptor>,
}

impl Registry {
    pub fn new(repos: Vec<RepoDescriptor>) -> Self {
        Registry { repos }
    }

    pub fn all(&self) -> &[RepoDescriptor] {
        &self.repos
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RepoDescriptor> {
        self.repos.get(index)
    }

    pub fn find(&self, name: &str) -> Option<&RepoDescriptor> {
        self.repos.iter().find(|repo| repo.name == name)
    }

    /// Numbered menu shown when no repositories were given on the command line
    pub fn menu(&self) -> String {
        let mut menu = String::from("-------------------------\n");
        for (i, repo) in self.repos.iter().enumerate() {
            menu.push_str(&format!("{}: {}\n", i, repo.name));
        }
        menu.push_str("-------------------------");
        menu
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(default_repos())
    }
}
