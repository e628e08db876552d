//! Ontogen
//!
//! A schema-driven code generator for scientific metadata ontologies.
//!
//! An ontology is declared as packages of classes (single inheritance) and
//! enumerations with typed, cardinality-constrained properties. The compiler
//! validates the declaration, resolves it into a typed entity graph, and walks
//! that graph to drive pluggable backends.
//!
//! ## Pipeline
//!
//! ```text
//! RawSchema ──validate──▶ Vec<String> (empty = proceed)
//!     │
//!     └──build──▶ Ontology (+ Diagnostics) ──execute──▶ Generator callbacks ──▶ Writer
//! ```
//!
//! ## Layout on disk
//!
//! ```text
//! schemas/
//! └── cim/
//!     ├── 1/
//!     └── 2/
//!         ├── ontology.json
//!         ├── shared.json
//!         └── software.json
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod ontology;
pub mod schema;
pub mod validator;
pub mod version;

pub use codegen::{
    backends_for, execute, execute_all, Emission, ExecutionReport, FsWriter, GenerationOptions,
    Generator, GeneratorContext, MemoryWriter, Strictness, Writer,
};
pub use config::CompilerConfig;
pub use error::{OntologyError, Result};
pub use ontology::{build, Diagnostics, Ontology};
pub use schema::{load_schema, RawPackage, RawSchema, SchemaSource};
pub use validator::validate;
pub use version::SchemaVersion;
