use semver::Version;
use std::fmt;

use crate::error::{BuildError, Result};

/// Prefix carried by every release tag
pub const TAG_PREFIX: &str = "v";

/// Represents the type of semantic version bump to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
}

impl VersionBump {
    pub const ALL: [VersionBump; 3] = [VersionBump::Major, VersionBump::Minor, VersionBump::Patch];

    pub fn name(&self) -> &'static str {
        match self {
            VersionBump::Major => "major",
            VersionBump::Minor => "minor",
            VersionBump::Patch => "patch",
        }
    }

    /// Parses a menu answer: either the component name or its menu index (0-2).
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim().to_lowercase().as_str() {
            "0" | "major" => Some(VersionBump::Major),
            "1" | "minor" => Some(VersionBump::Minor),
            "2" | "patch" => Some(VersionBump::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses the version carried by a tag such as `v1.2.3`.
pub fn parse_tag_version(tag: &str) -> Result<Version> {
    let clean_tag = tag.trim_start_matches(TAG_PREFIX);
    Version::parse(clean_tag)
        .map_err(|e| BuildError::version(format!("Cannot parse tag '{}': {}", tag, e)))
}

/// Bumps a version according to the specified bump type.
///
/// Lower components are reset to 0 and any pre-release or build metadata is dropped.
pub fn bump_version(version: &Version, bump: VersionBump) -> Version {
    match bump {
        VersionBump::Major => Version::new(version.major + 1, 0, 0),
        VersionBump::Minor => Version::new(version.major, version.minor + 1, 0),
        VersionBump::Patch => Version::new(version.major, version.minor, version.patch + 1),
    }
}

/// Computes the next tag name, e.g. `v1.2.3` + patch -> `v1.2.4`.
pub fn next_tag(current_tag: &str, bump: VersionBump) -> Result<String> {
    let current = parse_tag_version(current_tag)?;
    Ok(format!("{}{}", TAG_PREFIX, bump_version(&current, bump)))
}
