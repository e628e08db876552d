//! Error types for the ontology compiler
//!
//! Only hard failures live here. Validation problems are reported as plain
//! strings by [`crate::validator`], and unresolved references found while
//! building are recorded as [`crate::ontology::Diagnostics`].

use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, OntologyError>;

/// Ontology compiler errors
#[derive(Error, Debug)]
pub enum OntologyError {
    #[error("Invalid schema structure in {entity}: {reason}")]
    InvalidSchemaStructure { entity: String, reason: String },

    #[error("Ontology has {count} unresolved reference(s); refusing to generate in strict mode")]
    UnresolvedReferences { count: usize },

    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),

    #[error("Schema not found: {name} in {dir}")]
    SchemaNotFound { name: String, dir: String },

    #[error("Schema version not found: {name} version {version}")]
    VersionNotFound { name: String, version: String },

    #[error("Invalid cardinality: {0}")]
    InvalidCardinality(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl OntologyError {
    /// Shorthand for a structural failure on a named entity
    pub fn structure(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchemaStructure {
            entity: entity.into(),
            reason: reason.into(),
        }
    }
}
