//! Compiler version check run before anything touches the repositories.

use std::path::Path;

use regex::Regex;
use tracing::info;

use crate::config::PreflightConfig;
use crate::error::{BuildError, Result};
use crate::process::CommandRunner;

/// Extracts the version from `<compiler> -version` output, e.g. `javac 1.8.0_292`.
///
/// Older JDKs print the version on stderr, newer ones on stdout; the first
/// non-empty line of either is used.
pub fn parse_compiler_version(output: &str) -> Option<String> {
    let pattern = Regex::new(r"^\S+\s+(\S+)").ok()?;
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| pattern.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Verifies the configured compiler reports the required version prefix.
///
/// Returns the version that was found.
pub fn check_compiler(runner: &dyn CommandRunner, config: &PreflightConfig) -> Result<String> {
    let args = ["-version"];
    let output = runner.capture(&config.compiler, &args, Path::new("."))?;
    if !output.success() {
        return Err(BuildError::command(&config.compiler, &args, output.code));
    }

    let reported = if output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    };
    let found = parse_compiler_version(reported).unwrap_or_else(|| reported.trim().to_string());

    if !found.starts_with(&config.required_version) {
        return Err(BuildError::ExternalCompiler {
            found,
            required: config.required_version.clone(),
        });
    }

    info!("Found {} {}", config.compiler, found);
    Ok(found)
}
