//! Diagnostics
//!
//! Collects the soft failures found while resolving an ontology. Nothing in
//! here stops a build: an ontology in the middle of an edit may carry
//! dangling references and still be generated.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// Base class name not found in any package
    UnresolvedBase,
    /// Complex property or decoding type not found in any package
    UnresolvedType,
    /// Base chain loops back on itself; the base was cut
    InheritanceCycle,
    /// A mutual class reference was deferred on one side
    CircularImport,
    /// Packages depend on each other through required properties or bases
    PackageCycle,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedBase => "W001",
            Self::UnresolvedType => "W002",
            Self::InheritanceCycle => "W003",
            Self::CircularImport => "I001",
            Self::PackageCycle => "I002",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnresolvedBase | Self::UnresolvedType | Self::InheritanceCycle => {
                Severity::Warning
            }
            Self::CircularImport | Self::PackageCycle => Severity::Info,
        }
    }

    /// Codes that mark a reference the builder could not bind
    pub fn is_unresolved_reference(&self) -> bool {
        matches!(self, Self::UnresolvedBase | Self::UnresolvedType)
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single diagnostic item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// Qualified name of the entity that caused this diagnostic
    pub entity: String,
    /// Diagnostic code
    pub code: DiagnosticCode,
    /// Human-readable message
    pub message: String,
}

impl DiagnosticItem {
    pub fn new(entity: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            code,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code,
            self.code.severity(),
            self.message,
            self.entity
        )
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of diagnostics from the resolution passes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic item
    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    /// Record a base class that could not be found
    pub fn unresolved_base(&mut self, class: &str, base: &str) {
        self.push(DiagnosticItem::new(
            class,
            DiagnosticCode::UnresolvedBase,
            format!("base class '{}' not found in ontology", base),
        ));
    }

    /// Record a complex type that could not be found
    pub fn unresolved_type(&mut self, owner: &str, type_name: &str) {
        self.push(DiagnosticItem::new(
            owner,
            DiagnosticCode::UnresolvedType,
            format!("type '{}' not found in ontology", type_name),
        ));
    }

    /// Record an inheritance cycle that was cut at `class`
    pub fn inheritance_cycle(&mut self, class: &str, chain: &[String]) {
        self.push(DiagnosticItem::new(
            class,
            DiagnosticCode::InheritanceCycle,
            format!("inheritance cycle {}; base removed", chain.join(" -> ")),
        ));
    }

    /// Record a deferred import
    pub fn circular_import(&mut self, class: &str, target: &str) {
        self.push(DiagnosticItem::new(
            class,
            DiagnosticCode::CircularImport,
            format!("import of '{}' deferred to break a cycle", target),
        ));
    }

    /// Record a package dependency cycle
    pub fn package_cycle(&mut self, members: &[String]) {
        let first = members.first().cloned().unwrap_or_default();
        self.push(DiagnosticItem::new(
            first,
            DiagnosticCode::PackageCycle,
            format!("packages depend on each other: {}", members.join(", ")),
        ));
    }

    /// Number of references the builder could not bind
    pub fn unresolved_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.code.is_unresolved_reference())
            .count()
    }

    /// Items with a given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    /// Get all warnings
    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(|i| i.severity() == Severity::Warning)
    }

    /// Get all items
    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} warning(s), {} unresolved reference(s)\n",
                self.warning_count(),
                self.unresolved_count()
            ));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
