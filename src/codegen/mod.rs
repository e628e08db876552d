//! Code Generation
//!
//! Walks a resolved [`Ontology`] and dispatches events to backends.
//!
//! Architecture:
//! - Generator: a backend, a visitor with optional callbacks
//! - GeneratorContext: read-only view of the ontology plus the current cursor
//! - Emission: `(content, directory, filename)` produced by a callback
//! - Writer: where emissions go (filesystem, memory)
//!
//! The engine owns the traversal order. Backends never iterate the ontology
//! to decide what to visit, so two runs over the same ontology always see the
//! same sequence of events.

pub mod names;
pub mod python;
pub mod writer;

pub use writer::{FsWriter, MemoryWriter, Writer};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{OntologyError, Result};
use crate::ontology::{Class, Enum, Ontology, Package};

// =============================================================================
// Options
// =============================================================================

/// How to treat references the builder could not bind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Generate anyway; dangling references are only diagnostics
    #[default]
    Lenient,
    /// Refuse to generate while any reference dangles
    Strict,
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown strictness '{}'", other)),
        }
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Options shared by every backend in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Target language (e.g., "python")
    pub language: String,
    /// Root directory handed to the filesystem writer
    pub output_dir: PathBuf,
    pub strictness: Strictness,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            language: "python".to_string(),
            output_dir: PathBuf::from("generated"),
            strictness: Strictness::Lenient,
        }
    }
}

// =============================================================================
// Emission
// =============================================================================

/// A unit of generated output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emission {
    pub content: String,
    /// Directory relative to the writer root
    pub directory: PathBuf,
    pub filename: String,
}

impl Emission {
    pub fn new(
        content: impl Into<String>,
        directory: impl Into<PathBuf>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            directory: directory.into(),
            filename: filename.into(),
        }
    }

    /// Path relative to the writer root
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

// =============================================================================
// Context
// =============================================================================

/// What a callback can see: the whole ontology, the options, and the
/// entity currently being visited
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub ontology: &'a Ontology,
    pub options: &'a GenerationOptions,
    pub package: Option<&'a Package>,
    pub class: Option<&'a Class>,
    pub enumeration: Option<&'a Enum>,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(ontology: &'a Ontology, options: &'a GenerationOptions) -> Self {
        Self {
            ontology,
            options,
            package: None,
            class: None,
            enumeration: None,
        }
    }

    fn at_package(self, package: &'a Package) -> Self {
        Self {
            package: Some(package),
            class: None,
            enumeration: None,
            ..self
        }
    }

    fn at_class(self, class: &'a Class) -> Self {
        Self {
            package: Some(self.ontology.package(class.package)),
            class: Some(class),
            enumeration: None,
            ..self
        }
    }

    fn at_enum(self, enumeration: &'a Enum) -> Self {
        Self {
            package: Some(self.ontology.package(enumeration.package)),
            class: None,
            enumeration: Some(enumeration),
            ..self
        }
    }
}

// =============================================================================
// Generator
// =============================================================================

/// A backend. Every callback is optional.
pub trait Generator {
    /// Name used in logs and reports
    fn name(&self) -> &str;

    /// Whether this backend has anything to do for the ontology
    fn is_required(&self, _ontology: &Ontology) -> bool {
        true
    }

    fn on_start(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        Vec::new()
    }

    fn on_ontology_parse(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        Vec::new()
    }

    fn on_package_parse(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        Vec::new()
    }

    fn on_class_parse(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        Vec::new()
    }

    fn on_enum_parse(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        Vec::new()
    }

    fn on_end(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        Vec::new()
    }
}

/// Backends available for a target language
pub fn backends_for(language: &str) -> Result<Vec<Box<dyn Generator + Send>>> {
    match language.to_ascii_lowercase().as_str() {
        "python" => Ok(python::backends()),
        other => Err(OntologyError::UnsupportedLanguage(other.to_string())),
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Number of times each callback fired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackCounts {
    pub start: usize,
    pub ontology: usize,
    pub packages: usize,
    pub classes: usize,
    pub enums: usize,
    pub end: usize,
}

/// Summary of one backend run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub backend: String,
    pub skipped: bool,
    pub callbacks: CallbackCounts,
    /// Paths written, relative to the writer root, in emission order
    pub files: Vec<PathBuf>,
    pub generated_at: DateTime<Utc>,
}

impl ExecutionReport {
    fn new(backend: &str) -> Self {
        Self {
            backend: backend.to_string(),
            skipped: false,
            callbacks: CallbackCounts::default(),
            files: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    /// Number of emissions forwarded to the writer
    pub fn emissions(&self) -> usize {
        self.files.len()
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped {
            return write!(f, "{}: skipped", self.backend);
        }
        write!(
            f,
            "{}: {} file(s) from {} package(s), {} class(es), {} enum(s)",
            self.backend,
            self.emissions(),
            self.callbacks.packages,
            self.callbacks.classes,
            self.callbacks.enums
        )
    }
}

/// Run one backend over the ontology.
///
/// Callback order: `on_start`, `on_ontology_parse`, one `on_package_parse`
/// per package by name, one `on_class_parse` per class by (name, package),
/// one `on_enum_parse` per enum by (name, package), `on_end`.
pub fn execute(
    ontology: &Ontology,
    generator: &mut dyn Generator,
    options: &GenerationOptions,
    writer: &dyn Writer,
) -> Result<ExecutionReport> {
    if options.strictness == Strictness::Strict {
        let count = ontology.diagnostics().unresolved_count();
        if count > 0 {
            return Err(OntologyError::UnresolvedReferences { count });
        }
    }

    let mut report = ExecutionReport::new(generator.name());
    if !generator.is_required(ontology) {
        debug!("{}: not required, skipping", report.backend);
        report.skipped = true;
        return Ok(report);
    }

    let root = GeneratorContext::new(ontology, options);

    let emissions = generator.on_start(&root);
    report.callbacks.start += 1;
    forward(writer, emissions, &mut report)?;

    let emissions = generator.on_ontology_parse(&root);
    report.callbacks.ontology += 1;
    forward(writer, emissions, &mut report)?;

    for package in ontology.sorted_packages() {
        let emissions = generator.on_package_parse(&root.at_package(package));
        report.callbacks.packages += 1;
        forward(writer, emissions, &mut report)?;
    }

    for class in ontology.sorted_classes() {
        let emissions = generator.on_class_parse(&root.at_class(class));
        report.callbacks.classes += 1;
        forward(writer, emissions, &mut report)?;
    }

    for enumeration in ontology.sorted_enums() {
        let emissions = generator.on_enum_parse(&root.at_enum(enumeration));
        report.callbacks.enums += 1;
        forward(writer, emissions, &mut report)?;
    }

    let emissions = generator.on_end(&root);
    report.callbacks.end += 1;
    forward(writer, emissions, &mut report)?;

    info!("{}", report);
    Ok(report)
}

fn forward(writer: &dyn Writer, emissions: Vec<Emission>, report: &mut ExecutionReport) -> Result<()> {
    for emission in emissions {
        writer.write(&emission)?;
        report.files.push(emission.path());
    }
    Ok(())
}

/// Run several backends in parallel over the same ontology.
///
/// Reports come back in the order the backends were given. The first
/// failing backend's error is returned.
pub fn execute_all(
    ontology: &Ontology,
    generators: &mut [Box<dyn Generator + Send>],
    options: &GenerationOptions,
    writer: &dyn Writer,
) -> Result<Vec<ExecutionReport>> {
    generators
        .par_iter_mut()
        .map(|generator| execute(ontology, generator.as_mut(), options, writer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::build;
    use crate::schema::{RawPackage, RawSchema};
    use serde_json::json;

    /// Records every callback as a line
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Generator for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_start(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            self.events.push("start".into());
            Vec::new()
        }

        fn on_ontology_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            self.events.push(format!("ontology {}", ctx.ontology.name));
            Vec::new()
        }

        fn on_package_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            let package = ctx.package.map(|p| p.name.as_str()).unwrap_or("?");
            self.events.push(format!("package {}", package));
            vec![Emission::new(package, "out", format!("{}.txt", package))]
        }

        fn on_class_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            let class = ctx.class.map(|c| c.qualified_name.as_str()).unwrap_or("?");
            self.events.push(format!("class {}", class));
            Vec::new()
        }

        fn on_enum_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            let enumeration = ctx.enumeration.map(|e| e.qualified_name.as_str()).unwrap_or("?");
            self.events.push(format!("enum {}", enumeration));
            Vec::new()
        }

        fn on_end(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            self.events.push("end".into());
            Vec::new()
        }
    }

    struct NeverRequired;

    impl Generator for NeverRequired {
        fn name(&self) -> &str {
            "never"
        }

        fn is_required(&self, _ontology: &Ontology) -> bool {
            false
        }

        fn on_start(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
            panic!("callbacks must not run for a skipped backend");
        }
    }

    fn ontology() -> Ontology {
        let raw = RawSchema::new("test", "1", "")
            .with_package(
                RawPackage::new("zoo", "Zoo")
                    .with_class("animal", json!({"base": null, "is_abstract": true}))
                    .with_enum("diet", json!({"is_open": false, "members": ["meat"]})),
            )
            .with_package(
                RawPackage::new("farm", "Farm")
                    .with_class("animal", json!({"base": null, "is_abstract": false}))
                    .with_class("barn", json!({"base": null, "is_abstract": false})),
            );
        build(&raw).unwrap()
    }

    #[test]
    fn test_traversal_order() {
        let ontology = ontology();
        let mut recorder = Recorder::default();
        let writer = MemoryWriter::new();

        let report = execute(&ontology, &mut recorder, &GenerationOptions::default(), &writer).unwrap();

        assert_eq!(
            recorder.events,
            vec![
                "start",
                "ontology test",
                "package farm",
                "package zoo",
                "class farm.animal",
                "class zoo.animal",
                "class farm.barn",
                "enum zoo.diet",
                "end",
            ]
        );
        assert_eq!(report.callbacks.classes, 3);
        assert_eq!(report.emissions(), 2);
        assert_eq!(writer.emissions()[0].filename, "farm.txt");
    }

    #[test]
    fn test_traversal_is_deterministic() {
        let ontology = ontology();
        let mut first = Recorder::default();
        let mut second = Recorder::default();
        let options = GenerationOptions::default();

        execute(&ontology, &mut first, &options, &MemoryWriter::new()).unwrap();
        execute(&ontology, &mut second, &options, &MemoryWriter::new()).unwrap();
        assert_eq!(first.events, second.events);
    }

    #[test]
    fn test_not_required_is_skipped() {
        let report = execute(
            &ontology(),
            &mut NeverRequired,
            &GenerationOptions::default(),
            &MemoryWriter::new(),
        )
        .unwrap();

        assert!(report.skipped);
        assert_eq!(report.callbacks, CallbackCounts::default());
    }

    #[test]
    fn test_strict_refuses_dangling_references() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit")
                .with_class("kiwi", json!({"base": "xxx.yyy", "is_abstract": false})),
        );
        let ontology = build(&raw).unwrap();
        let mut recorder = Recorder::default();
        let options = GenerationOptions {
            strictness: Strictness::Strict,
            ..Default::default()
        };

        let err = execute(&ontology, &mut recorder, &options, &MemoryWriter::new()).unwrap_err();
        assert!(matches!(err, OntologyError::UnresolvedReferences { count: 1 }));
        assert!(recorder.events.is_empty());

        // Lenient runs the same ontology
        execute(&ontology, &mut recorder, &GenerationOptions::default(), &MemoryWriter::new()).unwrap();
        assert_eq!(recorder.events.first().map(String::as_str), Some("start"));
    }

    #[test]
    fn test_unsupported_language() {
        assert!(matches!(
            backends_for("cobol"),
            Err(OntologyError::UnsupportedLanguage(_))
        ));
        assert!(!backends_for("python").unwrap().is_empty());
    }

    #[test]
    fn test_strictness_parse() {
        assert_eq!("Strict".parse::<Strictness>().unwrap(), Strictness::Strict);
        assert!("loose".parse::<Strictness>().is_err());
    }
}
