use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{BuildError, Result};
use crate::registry::{Registry, RepoDescriptor, DEFAULT_ORGANIZATION};

/// File name searched for in the current directory and the user config directory
pub const CONFIG_FILE_NAME: &str = "esgf-build.toml";

/// Represents the complete configuration for esgf-build.
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// working configuration for the ESGF repositories.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub preflight: PreflightConfig,

    #[serde(default)]
    pub release: ReleaseConfig,

    /// Overrides the built-in registry when non-empty
    #[serde(default)]
    pub repos: Vec<RepoDescriptor>,
}

fn default_build_tool() -> String {
    "ant".to_string()
}

fn default_status_marker() -> String {
    "BUILD".to_string()
}

/// Build tool invocation and log scanning.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BuildConfig {
    #[serde(default = "default_build_tool")]
    pub tool: String,

    /// Token searched for in build logs when recording history
    #[serde(default = "default_status_marker")]
    pub status_marker: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            tool: default_build_tool(),
            status_marker: default_status_marker(),
        }
    }
}

fn default_compiler() -> String {
    "javac".to_string()
}

fn default_required_version() -> String {
    "1.8.0".to_string()
}

/// Compiler version check run before anything else.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PreflightConfig {
    #[serde(default = "default_compiler")]
    pub compiler: String,

    #[serde(default = "default_required_version")]
    pub required_version: String,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        PreflightConfig {
            compiler: default_compiler(),
            required_version: default_required_version(),
        }
    }
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

/// GitHub release hosting.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    #[serde(default = "default_organization")]
    pub organization: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the environment variable holding the API token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            organization: default_organization(),
            api_url: default_api_url(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ReleaseConfig {
    /// Reads the API token from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

impl Config {
    /// Registry from the config file, or the built-in one when none is configured.
    pub fn registry(&self) -> Registry {
        if self.repos.is_empty() {
            Registry::default()
        } else {
            Registry::new(self.repos.clone())
        }
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `esgf-build.toml` in current directory
/// 3. `esgf-build.toml` in user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    let config_str = if let Some(path) = config_path {
        fs::read_to_string(path)
            .map_err(|e| BuildError::config(format!("Cannot read {}: {}", path, e)))?
    } else if Path::new(CONFIG_FILE_NAME).exists() {
        fs::read_to_string(CONFIG_FILE_NAME)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            fs::read_to_string(config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    parse_config(&config_str)
}

/// Parses a TOML configuration document.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| BuildError::config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::BuildProfile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.build.tool, "ant");
        assert_eq!(config.build.status_marker, "BUILD");
        assert_eq!(config.preflight.compiler, "javac");
        assert_eq!(config.preflight.required_version, "1.8.0");
        assert_eq!(config.release.organization, "ESGF");
        assert_eq!(config.registry(), Registry::default());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.build, BuildConfig::default());
        assert_eq!(config.release.timeout_secs, 300);
    }

    #[test]
    fn test_repos_override_registry() {
        let config = parse_config(
            r#"
[[repos]]
name = "widget"
url = "https://example.com/widget.git"

[[repos]]
name = "gadget"
url = "https://example.com/gadget.git"
profile = { clean_dist = { clean = "clean", build = "dist" } }
"#,
        )
        .unwrap();

        let registry = config.registry();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(0).unwrap().profile, BuildProfile::Full);
        assert_eq!(
            registry.find("gadget").unwrap().profile,
            BuildProfile::CleanDist {
                clean: "clean".to_string(),
                build: "dist".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_document_is_config_error() {
        let err = parse_config("[build\ntool = ").unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }
}
