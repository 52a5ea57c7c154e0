use thiserror::Error;

/// Unified error type for esgf-build operations
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Selection error: {0}")]
    Selection(String),

    #[error("Branch '{branch}' was not found for {repo} repo")]
    BranchNotFound { branch: String, repo: String },

    #[error("Compiler error: found version {found}, but version {required} is required")]
    ExternalCompiler { found: String, required: String },

    #[error("Command `{program} {args}` failed with exit code {code}")]
    ExternalCommand {
        program: String,
        args: String,
        code: i32,
    },

    #[error("Branch '{0}' already exists")]
    CheckoutConflict(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Release error: {0}")]
    Release(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decision error: {0}")]
    Decision(String),

    #[error("Version parsing error: {0}")]
    Version(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Convenience type alias for Results in esgf-build
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    pub fn directory(msg: impl Into<String>) -> Self {
        BuildError::Directory(msg.into())
    }

    pub fn selection(msg: impl Into<String>) -> Self {
        BuildError::Selection(msg.into())
    }

    pub fn release(msg: impl Into<String>) -> Self {
        BuildError::Release(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::Config(msg.into())
    }

    pub fn decision(msg: impl Into<String>) -> Self {
        BuildError::Decision(msg.into())
    }

    pub fn version(msg: impl Into<String>) -> Self {
        BuildError::Version(msg.into())
    }

    /// Build an `ExternalCommand` error from a program, its arguments and exit code.
    ///
    /// A process killed by a signal has no exit code and is reported as `-1`.
    pub fn command(program: &str, args: &[&str], code: Option<i32>) -> Self {
        BuildError::ExternalCommand {
            program: program.to_string(),
            args: args.join(" "),
            code: code.unwrap_or(-1),
        }
    }
}
