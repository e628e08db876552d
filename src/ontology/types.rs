//! Property value types and cardinalities
//!
//! A [`Type`] starts life as a parsed string. Whether a dotted name points at
//! a class or an enum is only known once every package has been instantiated,
//! so the target moves from [`TypeRef::Unresolved`] to [`TypeRef::Resolved`]
//! during the builder's type resolution pass.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ClassId, EnumId};
use crate::error::OntologyError;

/// Wrapper marking a non-owning association
pub const LINKED_TO_PREFIX: &str = "linked_to(";

// =============================================================================
// Cardinality
// =============================================================================

/// Upper bound of a cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaxOccurs {
    One,
    Many,
}

/// Occurrence constraint encoded as `min.max` (`0.1`, `0.N`, `1.1`, `1.N`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u8,
    pub max: MaxOccurs,
}

impl Cardinality {
    pub const OPTIONAL: Cardinality = Cardinality { min: 0, max: MaxOccurs::One };
    pub const REQUIRED: Cardinality = Cardinality { min: 1, max: MaxOccurs::One };
    pub const MANY: Cardinality = Cardinality { min: 0, max: MaxOccurs::Many };
    pub const AT_LEAST_ONE: Cardinality = Cardinality { min: 1, max: MaxOccurs::Many };

    /// The four accepted encodings
    pub const ENCODINGS: [&'static str; 4] = ["0.1", "0.N", "1.1", "1.N"];

    pub fn is_required(&self) -> bool {
        self.min != 0
    }

    pub fn is_iterative(&self) -> bool {
        self.max == MaxOccurs::Many
    }
}

impl FromStr for Cardinality {
    type Err = OntologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0.1" => Ok(Self::OPTIONAL),
            "0.N" => Ok(Self::MANY),
            "1.1" => Ok(Self::REQUIRED),
            "1.N" => Ok(Self::AT_LEAST_ONE),
            other => Err(OntologyError::InvalidCardinality(other.to_string())),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max = match self.max {
            MaxOccurs::One => "1",
            MaxOccurs::Many => "N",
        };
        write!(f, "{}.{}", self.min, max)
    }
}

// =============================================================================
// Scalars
// =============================================================================

/// Built-in scalar value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Bool,
    Date,
    Datetime,
    Float,
    Int,
    Str,
    Uri,
    Uuid,
    Unicode,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 9] = [
        ScalarKind::Bool,
        ScalarKind::Date,
        ScalarKind::Datetime,
        ScalarKind::Float,
        ScalarKind::Int,
        ScalarKind::Str,
        ScalarKind::Uri,
        ScalarKind::Uuid,
        ScalarKind::Unicode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Date => "date",
            ScalarKind::Datetime => "datetime",
            ScalarKind::Float => "float",
            ScalarKind::Int => "int",
            ScalarKind::Str => "str",
            ScalarKind::Uri => "uri",
            ScalarKind::Uuid => "uuid",
            ScalarKind::Unicode => "unicode",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == keyword)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Type references
// =============================================================================

/// A resolved complex type target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Class(ClassId),
    Enum(EnumId),
}

/// Where a type points
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// Built-in scalar
    Scalar(ScalarKind),
    /// Dotted reference not found in the registry (or not resolved yet)
    Unresolved(String),
    /// Dotted reference bound to a class or enum
    Resolved(EntityId),
}

/// The value type of a property (or a decoding override)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Type {
    /// Primary type name as written, without the `linked_to` wrapper
    pub name: String,
    /// Declared as `linked_to(...)`: an association, not a contained value
    pub is_linked: bool,
    /// Extra `linked_to` targets, only meaningful to decoders
    pub alternates: Vec<String>,
    /// Current target
    pub target: TypeRef,
}

impl Type {
    /// Parse a raw type string.
    ///
    /// Unknown bare keywords are kept as unresolved names; the validator is
    /// responsible for rejecting them before a build.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (is_linked, names): (bool, Vec<String>) = match raw
            .strip_prefix(LINKED_TO_PREFIX)
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(inner) => (
                true,
                inner
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            None => (false, vec![raw.to_string()]),
        };

        let mut names = names.into_iter();
        let name = names.next().unwrap_or_default();
        let alternates = names.collect();

        let target = match ScalarKind::from_keyword(&name) {
            Some(kind) if !name.contains('.') => TypeRef::Scalar(kind),
            _ => TypeRef::Unresolved(name.clone()),
        };

        Self {
            name,
            is_linked,
            alternates,
            target,
        }
    }

    /// Syntactic: no package qualifier
    pub fn is_simple(&self) -> bool {
        !self.is_complex()
    }

    /// Syntactic: `package.name`
    pub fn is_complex(&self) -> bool {
        self.name.contains('.')
    }

    /// Semantic: resolved to a class
    pub fn is_class(&self) -> bool {
        matches!(self.target, TypeRef::Resolved(EntityId::Class(_)))
    }

    /// Semantic: resolved to an enum
    pub fn is_enum(&self) -> bool {
        matches!(self.target, TypeRef::Resolved(EntityId::Enum(_)))
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.target, TypeRef::Unresolved(_))
    }

    pub fn scalar(&self) -> Option<ScalarKind> {
        match self.target {
            TypeRef::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn class_id(&self) -> Option<ClassId> {
        match self.target {
            TypeRef::Resolved(EntityId::Class(id)) => Some(id),
            _ => None,
        }
    }

    pub fn entity(&self) -> Option<EntityId> {
        match self.target {
            TypeRef::Resolved(id) => Some(id),
            _ => None,
        }
    }

    /// Split a complex name into `(package, type_name)`
    pub fn qualified_parts(&self) -> Option<(&str, &str)> {
        split_qualified(&self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_linked {
            let mut all = vec![self.name.as_str()];
            all.extend(self.alternates.iter().map(String::as_str));
            write!(f, "linked_to({})", all.join(", "))
        } else {
            f.write_str(&self.name)
        }
    }
}

/// Split `package.name` into its two parts
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let (package, type_name) = name.split_once('.')?;
    if package.is_empty() || type_name.is_empty() || type_name.contains('.') {
        return None;
    }
    Some((package, type_name))
}
