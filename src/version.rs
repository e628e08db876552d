//! Schema version handling
//!
//! Schema versions on disk are free-form directory names ("1", "2.1",
//! "v1.0.3"). They are compared as semantic versions so that `latest` can be
//! resolved to a concrete directory.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Alias accepted wherever a concrete version is expected
pub const LATEST: &str = "latest";

/// A schema version as found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Normalized semantic version used for ordering
    pub version: Version,
    /// The label exactly as written (directory name)
    pub label: String,
}

impl SchemaVersion {
    /// Parse a version label, padding missing minor/patch components
    pub fn parse(label: &str) -> Result<Self, semver::Error> {
        let trimmed = label.strip_prefix('v').unwrap_or(label);
        let padded = match trimmed.matches('.').count() {
            0 => format!("{}.0.0", trimmed),
            1 => format!("{}.0", trimmed),
            _ => trimmed.to_string(),
        };
        Ok(Self {
            version: Version::parse(&padded)?,
            label: label.to_string(),
        })
    }

    /// Check whether a requested version string is the `latest` alias
    pub fn is_latest_alias(requested: &str) -> bool {
        requested.eq_ignore_ascii_case(LATEST)
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version
            .cmp(&other.version)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Pick the greatest version, if any
pub fn latest(versions: &[SchemaVersion]) -> Option<&SchemaVersion> {
    versions.iter().max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let v = SchemaVersion::parse("2").unwrap();
        assert_eq!(v.version, Version::new(2, 0, 0));
        assert_eq!(v.label, "2");

        let v = SchemaVersion::parse("v1.3").unwrap();
        assert_eq!(v.version, Version::new(1, 3, 0));
    }

    #[test]
    fn test_version_rejects_garbage() {
        assert!(SchemaVersion::parse("draft").is_err());
    }

    #[test]
    fn test_latest() {
        let versions: Vec<_> = ["1.10", "1.2", "1"]
            .iter()
            .map(|v| SchemaVersion::parse(v).unwrap())
            .collect();
        assert_eq!(latest(&versions).unwrap().label, "1.10");
        assert!(SchemaVersion::is_latest_alias("LATEST"));
    }
}
