use std::fmt;

/// Non-fatal issues that are reported to the user while the pipeline continues.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    /// The branch for a tag checkout already existed and was reused
    BranchAlreadyExists { repo: String, branch: String },
    /// The repository has no tag pointing at a commit
    NoTags { repo: String },
    /// No build log contained the status marker
    NoBuildStatus { repo: String, marker: String },
    /// The repository has no `dist` directory to upload from
    NoAssets { repo: String },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::BranchAlreadyExists { repo, branch } => {
                write!(
                    f,
                    "Branch '{}' already exists in {}; using the existing branch",
                    branch, repo
                )
            }
            PipelineWarning::NoTags { repo } => {
                write!(f, "No annotated tags found for {}", repo)
            }
            PipelineWarning::NoBuildStatus { repo, marker } => {
                write!(
                    f,
                    "No '{}' status line in the build log for {}; not recorded in history",
                    marker, repo
                )
            }
            PipelineWarning::NoAssets { repo } => {
                write!(f, "No built assets found in {}/dist", repo)
            }
        }
    }
}
