//! Schema Loading
//!
//! Reads a raw schema from a directory tree:
//!
//! ```text
//! <schemas_dir>/<name>/<version>/ontology.json    {"name", "version", "doc"}
//! <schemas_dir>/<name>/<version>/<package>.json   {"doc", "classes", "enums"}
//! ```
//!
//! The package name is the file stem. Package files are read in file-name
//! order so that loading is reproducible.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{FactoryMap, RawPackage, RawSchema};
use crate::error::{OntologyError, Result};
use crate::version::{self, SchemaVersion};

/// File holding ontology-level metadata inside a version directory
pub const ONTOLOGY_FILE: &str = "ontology.json";

/// Where to find a schema
#[derive(Debug, Clone)]
pub struct SchemaSource {
    /// Root directory holding one subdirectory per schema
    pub dir: PathBuf,
    /// Schema name
    pub name: String,
    /// Version label or "latest"
    pub version: String,
}

impl SchemaSource {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Load the schema this source points at
    pub fn load(&self) -> Result<RawSchema> {
        load_schema(&self.dir, &self.name, &self.version)
    }
}

#[derive(Debug, Deserialize)]
struct OntologyFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    doc: String,
}

#[derive(Debug, Deserialize)]
struct PackageFile {
    #[serde(default)]
    doc: Option<String>,
    #[serde(default)]
    classes: Option<FactoryMap>,
    #[serde(default)]
    enums: Option<FactoryMap>,
}

/// List the versions available for a schema, sorted ascending
pub fn available_versions(schemas_dir: &Path, name: &str) -> Result<Vec<SchemaVersion>> {
    let schema_dir = schemas_dir.join(name);
    if !schema_dir.is_dir() {
        return Err(OntologyError::SchemaNotFound {
            name: name.to_string(),
            dir: schemas_dir.display().to_string(),
        });
    }

    let mut versions = Vec::new();
    for entry in WalkDir::new(&schema_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let label = entry.file_name().to_string_lossy().to_string();
        match SchemaVersion::parse(&label) {
            Ok(v) => versions.push(v),
            Err(e) => debug!("Skipping non-version directory {}: {}", label, e),
        }
    }

    versions.sort();
    Ok(versions)
}

/// Load a raw schema by name and version ("latest" allowed)
pub fn load_schema(schemas_dir: &Path, name: &str, requested: &str) -> Result<RawSchema> {
    let versions = available_versions(schemas_dir, name)?;

    let selected = if SchemaVersion::is_latest_alias(requested) {
        version::latest(&versions)
    } else {
        SchemaVersion::parse(requested)
            .ok()
            .and_then(|wanted| versions.iter().find(|v| v.version == wanted.version))
    };

    let selected = selected.ok_or_else(|| OntologyError::VersionNotFound {
        name: name.to_string(),
        version: requested.to_string(),
    })?;

    let version_dir = schemas_dir.join(name).join(&selected.label);
    debug!("Loading schema {} from {}", name, version_dir.display());
    load_version_dir(&version_dir, name, &selected.label)
}

/// Load every JSON file of a single version directory
fn load_version_dir(version_dir: &Path, name: &str, label: &str) -> Result<RawSchema> {
    let mut schema = RawSchema::new(name, label, "");

    let ontology_path = version_dir.join(ONTOLOGY_FILE);
    if ontology_path.is_file() {
        let meta: OntologyFile = serde_json::from_str(&fs::read_to_string(&ontology_path)?)?;
        if let Some(n) = meta.name {
            schema.name = n;
        }
        if let Some(v) = meta.version {
            schema.version = v;
        }
        schema.doc = meta.doc;
    }

    for entry in WalkDir::new(version_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
            continue;
        }
        if entry.file_name() == ONTOLOGY_FILE {
            continue;
        }

        let package_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let content = fs::read_to_string(path)?;
        let file: PackageFile = serde_json::from_str(&content)?;

        debug!("Loaded package {} from {}", package_name, path.display());
        schema.packages.push(RawPackage {
            name: package_name,
            doc: file.doc,
            classes: file.classes,
            enums: file.enums,
        });
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_latest_version_selected() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "demo/1/ontology.json", r#"{"doc": "old"}"#);
        write(tmp.path(), "demo/2/ontology.json", r#"{"doc": "new"}"#);
        write(tmp.path(), "demo/2/core.json", r#"{"doc": "Core", "classes": {}}"#);

        let schema = load_schema(tmp.path(), "demo", "latest").unwrap();
        assert_eq!(schema.version, "2");
        assert_eq!(schema.doc, "new");
        assert_eq!(schema.packages.len(), 1);
        assert_eq!(schema.packages[0].name, "core");
    }

    #[rstest]
    #[case("3")]
    #[case("draft")]
    fn test_missing_version(#[case] requested: &str) {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "demo/1/ontology.json", "{}");

        let err = load_schema(tmp.path(), "demo", requested).unwrap_err();
        assert!(matches!(err, OntologyError::VersionNotFound { ref version, .. } if version == requested));
    }

    #[test]
    fn test_missing_schema() {
        let tmp = TempDir::new().unwrap();
        let err = load_schema(tmp.path(), "nope", "latest").unwrap_err();
        assert!(matches!(err, OntologyError::SchemaNotFound { .. }));
    }
}
