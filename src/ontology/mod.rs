//! Ontology Model
//!
//! The resolved semantic model produced by [`build`]. Entities live in
//! per-kind arenas owned by [`Ontology`] and refer to each other through
//! copyable ids, so mutual references between classes (and back-pointers to
//! packages) never form ownership cycles.
//!
//! The model is mutated only by the builder's resolution passes. After
//! [`build`] returns it is read-only and can be shared across threads.

pub mod analysis;
pub mod builder;
pub mod diagnostics;
pub mod types;

pub use builder::build;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use types::{Cardinality, EntityId, MaxOccurs, ScalarKind, Type, TypeRef};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// Property name reserved by generated code
pub const RESERVED_PROPERTY: &str = "ext";

/// Property name that marks a class as a standalone document
pub const ENTITY_MARKER: &str = "meta";

// =============================================================================
// Ids
// =============================================================================

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(usize);

        impl $name {
            /// Position in the owning arena
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

arena_id!(
    /// Handle of a [`Package`]
    PackageId
);
arena_id!(
    /// Handle of a [`Class`]
    ClassId
);
arena_id!(
    /// Handle of an [`Enum`]
    EnumId
);
arena_id!(
    /// Handle of a [`Property`]
    PropertyId
);

// =============================================================================
// Entities
// =============================================================================

/// A `(package, type_name)` import edge between generated modules
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ImportEdge {
    pub package: String,
    pub type_name: String,
}

impl ImportEdge {
    pub fn new(package: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for ImportEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.package, self.type_name)
    }
}

/// Kind of a class-level constraint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Pins the property to one literal
    Constant,
    /// Overrides the inherited cardinality
    Cardinality,
    /// Narrows the inherited type
    Type,
    /// Hides the property from generated output
    Hidden,
    /// Value must match a pattern
    Regex,
    /// Value must be one of a set
    Value,
    Other(String),
}

impl ConstraintKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "constant" => Self::Constant,
            "cardinality" => Self::Cardinality,
            "type" => Self::Type,
            "hidden" => Self::Hidden,
            "regex" => Self::Regex,
            "value" => Self::Value,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Constant => "constant",
            Self::Cardinality => "cardinality",
            Self::Type => "type",
            Self::Hidden => "hidden",
            Self::Regex => "regex",
            Self::Value => "value",
            Self::Other(kind) => kind,
        }
    }
}

/// A typed override or restriction a class places on one of its properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub property: String,
    pub kind: ConstraintKind,
    pub value: Value,
}

/// How to populate a property from an external representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decoding {
    pub property: String,
    pub rule: String,
    pub override_type: Option<Type>,
}

impl Decoding {
    /// Key used when merging inherited decodings
    fn merge_key(&self) -> (String, Option<String>) {
        (
            self.property.clone(),
            self.override_type.as_ref().map(|t| t.name.clone()),
        )
    }
}

/// A typed, cardinality-constrained class member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub name: String,
    pub class: ClassId,
    pub package: PackageId,
    pub ty: Type,
    pub cardinality: Cardinality,
    pub doc: String,
}

/// An ontology class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub qualified_name: String,
    pub package: PackageId,
    /// Base as declared (`package.name`), kept for diagnostics
    pub declared_base: Option<String>,
    /// Base after resolution; `None` when undeclared, missing or cut
    pub base: Option<ClassId>,
    pub is_abstract: bool,
    pub doc: String,
    /// Own properties, sorted by name
    pub properties: Vec<PropertyId>,
    pub constraints: Vec<Constraint>,
    pub decodings: Vec<Decoding>,
    pub imports: BTreeSet<ImportEdge>,
    pub circular_imports: BTreeSet<ImportEdge>,
}

impl Class {
    /// Import edge pointing at this class
    pub fn as_import(&self, package_name: &str) -> ImportEdge {
        ImportEdge::new(package_name, &self.name)
    }
}

/// An enumeration member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub doc: String,
}

/// An ontology enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub id: EnumId,
    pub name: String,
    pub qualified_name: String,
    pub package: PackageId,
    /// Whether unlisted values are legal
    pub is_open: bool,
    pub doc: String,
    /// Members, unique and sorted by name
    pub members: Vec<EnumMember>,
}

/// A named grouping of classes and enums
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub doc: String,
    pub classes: Vec<ClassId>,
    pub enums: Vec<EnumId>,
    /// Packages this package must import
    pub associated_packages: BTreeSet<PackageId>,
    /// Types owned by other packages that this package references
    pub external_types: BTreeSet<ImportEdge>,
}

// =============================================================================
// Ontology
// =============================================================================

/// The resolved ontology: root of the entity graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ontology {
    pub name: String,
    pub version: String,
    pub doc: String,
    pub(crate) packages: Vec<Package>,
    pub(crate) classes: Vec<Class>,
    pub(crate) enums: Vec<Enum>,
    pub(crate) properties: Vec<Property>,
    /// Fully-qualified type name -> entity
    pub(crate) index: BTreeMap<String, EntityId>,
    pub(crate) diagnostics: Diagnostics,
}

impl Ontology {
    pub(crate) fn empty(name: &str, version: &str, doc: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            doc: doc.to_string(),
            packages: Vec::new(),
            classes: Vec::new(),
            enums: Vec::new(),
            properties: Vec::new(),
            index: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    // --- arena access ---

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0]
    }

    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    pub fn enumeration(&self, id: EnumId) -> &Enum {
        &self.enums[id.0]
    }

    pub fn property(&self, id: PropertyId) -> &Property {
        &self.properties[id.0]
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    pub fn enums(&self) -> &[Enum] {
        &self.enums
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Soft failures recorded while building
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    // --- lookup ---

    /// Resolve a fully-qualified `package.type` name
    pub fn lookup(&self, qualified_name: &str) -> Option<EntityId> {
        self.index.get(qualified_name).copied()
    }

    pub fn find_package(&self, name: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn find_class(&self, qualified_name: &str) -> Option<&Class> {
        match self.lookup(qualified_name)? {
            EntityId::Class(id) => Some(self.class(id)),
            EntityId::Enum(_) => None,
        }
    }

    pub fn find_enum(&self, qualified_name: &str) -> Option<&Enum> {
        match self.lookup(qualified_name)? {
            EntityId::Enum(id) => Some(self.enumeration(id)),
            EntityId::Class(_) => None,
        }
    }

    /// Find a class's own property by name
    pub fn find_property(&self, class: ClassId, name: &str) -> Option<&Property> {
        self.class(class)
            .properties
            .iter()
            .map(|id| self.property(*id))
            .find(|p| p.name == name)
    }

    /// Package that owns a resolved entity
    pub fn entity_package(&self, entity: EntityId) -> PackageId {
        match entity {
            EntityId::Class(id) => self.class(id).package,
            EntityId::Enum(id) => self.enumeration(id).package,
        }
    }

    /// Fully-qualified name of a resolved entity
    pub fn entity_name(&self, entity: EntityId) -> &str {
        match entity {
            EntityId::Class(id) => &self.class(id).qualified_name,
            EntityId::Enum(id) => &self.enumeration(id).qualified_name,
        }
    }

    // --- deterministic iteration ---

    /// Packages ordered by name
    pub fn sorted_packages(&self) -> Vec<&Package> {
        let mut packages: Vec<&Package> = self.packages.iter().collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        packages
    }

    /// Classes ordered by name, then owning package name
    pub fn sorted_classes(&self) -> Vec<&Class> {
        let mut classes: Vec<&Class> = self.classes.iter().collect();
        classes.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| self.package(a.package).name.cmp(&self.package(b.package).name))
        });
        classes
    }

    /// Enums ordered by name, then owning package name
    pub fn sorted_enums(&self) -> Vec<&Enum> {
        let mut enums: Vec<&Enum> = self.enums.iter().collect();
        enums.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| self.package(a.package).name.cmp(&self.package(b.package).name))
        });
        enums
    }

    // --- inheritance ---

    /// Base chain from the direct base upwards. Stops on a revisited class.
    pub fn ancestors(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([class]);
        let mut current = self.class(class).base;
        while let Some(id) = current {
            if !seen.insert(id) {
                break;
            }
            chain.push(id);
            current = self.class(id).base;
        }
        chain
    }

    /// The class followed by its ancestors
    fn lineage(&self, class: ClassId) -> Vec<ClassId> {
        let mut lineage = vec![class];
        lineage.extend(self.ancestors(class));
        lineage
    }

    /// Own plus inherited properties, own winning on name, sorted by name
    pub fn all_properties(&self, class: ClassId) -> Vec<&Property> {
        let mut by_name: BTreeMap<&str, &Property> = BTreeMap::new();
        for id in self.lineage(class) {
            for pid in &self.class(id).properties {
                let property = self.property(*pid);
                by_name.entry(property.name.as_str()).or_insert(property);
            }
        }
        by_name.into_values().collect()
    }

    /// Own plus inherited constraints; own win on `(kind, property)`
    pub fn all_constraints(&self, class: ClassId) -> Vec<&Constraint> {
        let mut merged: Vec<&Constraint> = Vec::new();
        let mut seen: HashSet<(ConstraintKind, String)> = HashSet::new();
        for id in self.lineage(class) {
            let level = &self.class(id).constraints;
            for constraint in level {
                if !seen.contains(&(constraint.kind.clone(), constraint.property.clone())) {
                    merged.push(constraint);
                }
            }
            seen.extend(level.iter().map(|c| (c.kind.clone(), c.property.clone())));
        }
        merged.sort_by(|a, b| a.property.cmp(&b.property).then_with(|| a.kind.cmp(&b.kind)));
        merged
    }

    /// Own plus inherited decodings; own win on `(property, override type)`
    pub fn all_decodings(&self, class: ClassId) -> Vec<&Decoding> {
        let mut merged: Vec<&Decoding> = Vec::new();
        let mut seen = HashSet::new();
        for id in self.lineage(class) {
            let level = &self.class(id).decodings;
            for decoding in level {
                if !seen.contains(&decoding.merge_key()) {
                    merged.push(decoding);
                }
            }
            seen.extend(level.iter().map(Decoding::merge_key));
        }
        merged.sort_by(|a, b| a.property.cmp(&b.property));
        merged
    }

    /// Effective constraint of a given kind on a property, own first
    pub fn constraint_for(
        &self,
        class: ClassId,
        property: &str,
        kind: &ConstraintKind,
    ) -> Option<&Constraint> {
        self.all_constraints(class)
            .into_iter()
            .find(|c| c.property == property && &c.kind == kind)
    }

    /// True if the class or any ancestor declares a `meta` property
    pub fn is_entity(&self, class: ClassId) -> bool {
        self.lineage(class).into_iter().any(|id| {
            self.class(id)
                .properties
                .iter()
                .any(|p| self.property(*p).name == ENTITY_MARKER)
        })
    }

    // --- package views ---

    /// Non-abstract classes declared in a package
    pub fn concrete_classes(&self, package: PackageId) -> Vec<&Class> {
        self.package(package)
            .classes
            .iter()
            .map(|id| self.class(*id))
            .filter(|c| !c.is_abstract)
            .collect()
    }

    // --- cross-cutting views ---

    /// Total number of declared decodings
    pub fn decoding_count(&self) -> usize {
        self.classes.iter().map(|c| c.decodings.len()).sum()
    }

    /// Stable SHA-256 over the derived sets (imports, circular imports,
    /// bases, type targets, package associations)
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}\n", self.name, self.version).as_bytes());

        let mut classes: Vec<&Class> = self.classes.iter().collect();
        classes.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        for class in classes {
            let base = class
                .base
                .map(|b| self.class(b).qualified_name.as_str())
                .unwrap_or("-");
            hasher.update(format!("class {} base {}\n", class.qualified_name, base).as_bytes());
            for edge in &class.imports {
                hasher.update(format!("  import {}\n", edge).as_bytes());
            }
            for edge in &class.circular_imports {
                hasher.update(format!("  circular {}\n", edge).as_bytes());
            }
            for property in self.all_properties(class.id) {
                let target = match property.ty.entity() {
                    Some(entity) => self.entity_name(entity).to_string(),
                    None => property.ty.to_string(),
                };
                hasher.update(
                    format!("  prop {} {} {}\n", property.name, target, property.cardinality)
                        .as_bytes(),
                );
            }
        }

        for package in self.sorted_packages() {
            hasher.update(format!("package {}\n", package.name).as_bytes());
            for id in &package.associated_packages {
                hasher.update(format!("  assoc {}\n", self.package(*id).name).as_bytes());
            }
            for edge in &package.external_types {
                hasher.update(format!("  external {}\n", edge).as_bytes());
            }
        }

        format!("{:x}", hasher.finalize())
    }
}
