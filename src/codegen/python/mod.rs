//! Python backends
//!
//! Four generators share the helpers in this module:
//!
//! | backend     | output                                 |
//! |-------------|----------------------------------------|
//! | `root`      | `__init__.py`                          |
//! | `typeset`   | `<package>_typeset.py` per package     |
//! | `decoder`   | `<package>_decoder.py` per package     |
//! | `validator` | `<package>_validator.py` per package   |
//!
//! Package modules are assembled in memory while the engine walks the
//! ontology and emitted from `on_end`, so a module's content does not depend
//! on which callback saw which class first.

mod decoder;
mod root;
mod typeset;
mod validator;

pub use decoder::DecoderGenerator;
pub use root::RootGenerator;
pub use typeset::TypesetGenerator;
pub use validator::ValidatorGenerator;

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::names;
use super::{Emission, Generator, GeneratorContext};
use crate::ontology::{Ontology, Package, ScalarKind, Type, TypeRef};

/// Module suffixes
pub const TYPESET: &str = "typeset";
pub const DECODER: &str = "decoder";
pub const VALIDATOR: &str = "validator";

/// All Python backends, root package last
pub fn backends() -> Vec<Box<dyn Generator + Send>> {
    vec![
        Box::new(TypesetGenerator::default()),
        Box::new(DecoderGenerator::default()),
        Box::new(ValidatorGenerator::default()),
        Box::new(RootGenerator::default()),
    ]
}

// =============================================================================
// Module assembly
// =============================================================================

/// A package module under construction
#[derive(Debug, Default)]
struct Module {
    header: Vec<String>,
    /// Sibling modules needed at class definition time (bases)
    eager: BTreeSet<String>,
    /// Sibling modules imported at the top unless also deferred
    imports: BTreeSet<String>,
    /// Sibling modules imported at the bottom to break a cycle
    deferred: BTreeSet<String>,
    /// Blocks ordered by `(rank, depth)`, then arrival
    blocks: Vec<((u8, usize), String)>,
}

impl Module {
    fn push(&mut self, key: (u8, usize), block: String) {
        self.blocks.push((key, block));
    }

    /// Modules imported at the top: every eager one plus the non-deferred rest
    fn top_imports(&self) -> BTreeSet<&String> {
        self.eager
            .iter()
            .chain(self.imports.difference(&self.deferred))
            .collect()
    }

    fn render(mut self) -> String {
        self.blocks.sort_by_key(|(key, _)| *key);

        let top: BTreeSet<String> = self.top_imports().into_iter().cloned().collect();
        let deferred: Vec<&String> = self.deferred.difference(&top).collect();

        let mut out = self.header.join("\n");
        out.push('\n');
        if !top.is_empty() {
            out.push('\n');
            for module in &top {
                out.push_str(&format!("from . import {}\n", module));
            }
        }
        for (_, block) in &self.blocks {
            out.push_str("\n\n");
            out.push_str(block);
        }

        if !deferred.is_empty() {
            out.push_str("\n\n# Circular imports\n");
            for module in deferred {
                out.push_str(&format!("from . import {}  # noqa: E402\n", module));
            }
        }
        out
    }
}

/// Package modules keyed by package name
#[derive(Debug, Default)]
struct Modules {
    modules: BTreeMap<String, Module>,
}

impl Modules {
    fn open(&mut self, package: &Package, header: Vec<String>) {
        self.modules.insert(
            package.name.clone(),
            Module {
                header,
                ..Default::default()
            },
        );
    }

    fn get(&mut self, package: &str) -> &mut Module {
        self.modules.entry(package.to_string()).or_default()
    }

    /// One emission per module, in package name order
    fn emit(&mut self, ctx: &GeneratorContext<'_>, suffix: &str) -> Vec<Emission> {
        let directory = names::ontology_dir(ctx.ontology);
        std::mem::take(&mut self.modules)
            .into_iter()
            .map(|(package, module)| {
                Emission::new(module.render(), directory.clone(), names::package_file(&package, suffix))
            })
            .collect()
    }
}

// =============================================================================
// Shared rendering
// =============================================================================

/// Standard module docstring
fn module_header(ontology: &Ontology, title: &str) -> Vec<String> {
    vec![
        "\"\"\"".to_string(),
        format!(".. module:: {}", title),
        format!("   :synopsis: {} v{}.", ontology.name, ontology.version),
        "".to_string(),
        "   Auto-generated, do not edit.".to_string(),
        "\"\"\"".to_string(),
    ]
}

/// Docstring lines for a block, indented
fn docstring(doc: &str, indent: &str) -> String {
    let doc = doc.trim();
    let doc = if doc.is_empty() { "No documentation." } else { doc };
    format!("{indent}\"\"\"{}\n{indent}\"\"\"", doc.replace("\"\"\"", "'''"), indent = indent)
}

/// Python type for a scalar keyword
fn scalar_type(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::Bool => "bool",
        ScalarKind::Date => "datetime.date",
        ScalarKind::Datetime => "datetime.datetime",
        ScalarKind::Float => "float",
        ScalarKind::Int => "int",
        ScalarKind::Str | ScalarKind::Unicode | ScalarKind::Uri => "str",
        ScalarKind::Uuid => "uuid.UUID",
    }
}

/// Python type of a property as seen from `package`
fn python_type(ontology: &Ontology, ty: &Type, package: &str) -> String {
    match &ty.target {
        TypeRef::Scalar(kind) => scalar_type(*kind).to_string(),
        TypeRef::Resolved(entity) => {
            let owner = ontology.package(ontology.entity_package(*entity));
            let name = match ty.qualified_parts() {
                Some((_, type_name)) => names::class_name(type_name),
                None => names::class_name(&ty.name),
            };
            if owner.name == package {
                name
            } else {
                format!("{}.{}", names::package_module(&owner.name, TYPESET), name)
            }
        }
        TypeRef::Unresolved(name) => format!("'{}'", name),
    }
}

/// Python literal for a JSON value
fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => Value::String(s.clone()).to_string(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(python_literal).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), python_literal(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
