//! Raw schema types
//!
//! The declarative input to the compiler. A raw schema is a named, versioned
//! list of packages; each package maps type names to the body produced by a
//! type factory. Factory bodies stay as loose JSON so that the validator can
//! report malformed input instead of failing at deserialization time.
//!
//! Class factory body:
//!
//! ```json
//! {
//!   "type": "class",
//!   "base": "fruit.fruit",
//!   "is_abstract": false,
//!   "doc": "A mango.",
//!   "properties": [["ripeness", "int", "0.1", "How ripe it is."]],
//!   "constraints": [["weight", "constant", 0.5]],
//!   "decodings": [["ripeness", "child::ripeness"]],
//!   "doc_strings": {"ripeness": "How ripe it is."}
//! }
//! ```
//!
//! Enum factory body:
//!
//! ```json
//! { "type": "enum", "is_open": false, "members": [["low", "Not sweet"], "high"] }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use loader::{available_versions, load_schema, SchemaSource};

/// Factory body keyed by type name
pub type FactoryMap = BTreeMap<String, Value>;

/// Kind of type factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactoryKind {
    Class,
    Enum,
}

impl FactoryKind {
    /// Value expected under the factory's `type` key
    pub fn as_str(&self) -> &'static str {
        match self {
            FactoryKind::Class => "class",
            FactoryKind::Enum => "enum",
        }
    }
}

/// A complete raw schema (ontology definition)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSchema {
    /// Ontology name (e.g., "cim")
    #[serde(default)]
    pub name: String,
    /// Ontology version (e.g., "2")
    #[serde(default)]
    pub version: String,
    /// Ontology description
    #[serde(default)]
    pub doc: String,
    /// Packages in declaration order
    #[serde(default)]
    pub packages: Vec<RawPackage>,
}

impl RawSchema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>, version: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            doc: doc.into(),
            packages: Vec::new(),
        }
    }

    /// Add a package
    pub fn with_package(mut self, package: RawPackage) -> Self {
        self.packages.push(package);
        self
    }

    /// Total number of type factories across all packages
    pub fn factory_count(&self) -> usize {
        self.packages.iter().map(|p| p.factories().count()).sum()
    }
}

/// A raw package: a named grouping of type factories
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPackage {
    /// Package name (e.g., "shared")
    #[serde(default)]
    pub name: String,
    /// Package description
    #[serde(default)]
    pub doc: Option<String>,
    /// Class factories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<FactoryMap>,
    /// Enum factories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enums: Option<FactoryMap>,
}

impl RawPackage {
    /// Create an empty package
    pub fn new(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: Some(doc.into()),
            classes: None,
            enums: None,
        }
    }

    /// Add a class factory body
    pub fn with_class(mut self, name: impl Into<String>, body: Value) -> Self {
        self.classes.get_or_insert_with(BTreeMap::new).insert(name.into(), body);
        self
    }

    /// Add an enum factory body
    pub fn with_enum(mut self, name: impl Into<String>, body: Value) -> Self {
        self.enums.get_or_insert_with(BTreeMap::new).insert(name.into(), body);
        self
    }

    /// All factories, classes first, each group in name order
    pub fn factories(&self) -> impl Iterator<Item = (FactoryKind, &str, &Value)> {
        let classes = self
            .classes
            .iter()
            .flatten()
            .map(|(name, body)| (FactoryKind::Class, name.as_str(), body));
        let enums = self
            .enums
            .iter()
            .flatten()
            .map(|(name, body)| (FactoryKind::Enum, name.as_str(), body));
        classes.chain(enums)
    }
}
