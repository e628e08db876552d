//! Data model backend: one `<package>_typeset.py` per package
//!
//! A module imports its siblings at the top, except those reached through a
//! class's circular imports, which go to the tail. Python needs a base class
//! defined before any subclass, so base packages are always imported at the
//! top, and a package whose classes derive from this one is pushed to the
//! tail.

use std::collections::BTreeSet;

use super::{docstring, module_header, python_literal, python_type, Modules, TYPESET};
use crate::codegen::names;
use crate::codegen::{Emission, Generator, GeneratorContext};
use crate::ontology::{Class, ConstraintKind, Ontology, PackageId, Property};

/// Emits classes and enums
#[derive(Debug, Default)]
pub struct TypesetGenerator {
    modules: Modules,
}

impl Generator for TypesetGenerator {
    fn name(&self) -> &str {
        "python-typeset"
    }

    fn on_package_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let Some(package) = ctx.package else {
            return Vec::new();
        };

        let mut header = module_header(ctx.ontology, &names::package_module(&package.name, TYPESET));
        header.extend(
            ["", "import abc", "import datetime", "import enum", "import uuid"]
                .into_iter()
                .map(str::to_string),
        );
        self.modules.open(package, header);

        let module = self.modules.get(&package.name);
        module.eager = base_packages(ctx.ontology, package.id)
            .into_iter()
            .map(|name| names::package_module(&name, TYPESET))
            .collect();
        Vec::new()
    }

    fn on_class_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let (Some(package), Some(class)) = (ctx.package, ctx.class) else {
            return Vec::new();
        };

        let module = self.modules.get(&package.name);
        for edge in &class.imports {
            if edge.package == package.name {
                continue;
            }
            let sibling = names::package_module(&edge.package, TYPESET);
            if derives_from(ctx.ontology, &edge.package, &package.name) {
                module.deferred.insert(sibling);
            } else {
                module.imports.insert(sibling);
            }
        }
        for edge in &class.circular_imports {
            if edge.package != package.name {
                module.deferred.insert(names::package_module(&edge.package, TYPESET));
            }
        }

        let depth = ctx.ontology.ancestors(class.id).len();
        module.push((0, depth), render_class(ctx.ontology, class, &package.name));
        Vec::new()
    }

    fn on_enum_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let (Some(package), Some(enumeration)) = (ctx.package, ctx.enumeration) else {
            return Vec::new();
        };

        let name = names::class_name(&enumeration.name);
        let mut lines = vec![
            format!("class {}(enum.Enum):", name),
            docstring(&enumeration.doc, "    "),
        ];
        if enumeration.members.is_empty() {
            lines.push("    pass".to_string());
        }
        let constants = names::unique_constants(enumeration.members.iter().map(|m| m.name.as_str()));
        for (member, constant) in enumeration.members.iter().zip(&constants) {
            let mut line = format!(
                "    {} = {}",
                constant,
                python_literal(&serde_json::Value::String(member.name.clone()))
            );
            if !member.doc.trim().is_empty() {
                line.push_str(&format!("  # {}", member.doc.trim()));
            }
            lines.push(line);
        }
        lines.push(String::new());
        lines.push(String::new());
        lines.push(format!(
            "{}.is_open = {}",
            name,
            if enumeration.is_open { "True" } else { "False" }
        ));

        self.modules.get(&package.name).push((1, 0), lines.join("\n"));
        Vec::new()
    }

    fn on_end(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        self.modules.emit(ctx, TYPESET)
    }
}

/// Packages holding the bases of `package`'s classes, own excluded
fn base_packages(ontology: &Ontology, package: PackageId) -> BTreeSet<String> {
    ontology
        .package(package)
        .classes
        .iter()
        .filter_map(|id| ontology.class(*id).base)
        .map(|base| ontology.class(base).package)
        .filter(|owner| *owner != package)
        .map(|owner| ontology.package(owner).name.clone())
        .collect()
}

/// True if some class in `package` has its base in `other`
fn derives_from(ontology: &Ontology, package: &str, other: &str) -> bool {
    ontology
        .find_package(package)
        .map(|p| base_packages(ontology, p.id).contains(other))
        .unwrap_or(false)
}

fn render_class(ontology: &Ontology, class: &Class, package: &str) -> String {
    let name = names::class_name(&class.name);
    let base = match class.base {
        Some(id) => {
            let base = ontology.class(id);
            let base_package = &ontology.package(base.package).name;
            if base_package == package {
                names::class_name(&base.name)
            } else {
                format!(
                    "{}.{}",
                    names::package_module(base_package, TYPESET),
                    names::class_name(&base.name)
                )
            }
        }
        None if class.is_abstract => "abc.ABC".to_string(),
        None => "object".to_string(),
    };

    let mut lines = vec![
        format!("class {}({}):", name, base),
        docstring(&class.doc, "    "),
        String::new(),
        "    def __init__(self):".to_string(),
        "        \"\"\"Instance constructor.\"\"\"".to_string(),
    ];

    let mut visible = 0;
    for property in ontology.all_properties(class.id) {
        if ontology
            .constraint_for(class.id, &property.name, &ConstraintKind::Hidden)
            .is_some()
        {
            continue;
        }
        lines.push(format!(
            "        self.{} = {}  # {} ({})",
            names::python_identifier(&property.name),
            default_value(ontology, class, property),
            python_type(ontology, &property.ty, package),
            property.cardinality
        ));
        visible += 1;
    }
    if visible == 0 {
        lines.push("        pass".to_string());
    }

    lines.join("\n")
}

/// Initial attribute value: a `constant` constraint wins, then the
/// cardinality decides between an empty list and `None`
fn default_value(ontology: &Ontology, class: &Class, property: &Property) -> String {
    if let Some(constant) = ontology.constraint_for(class.id, &property.name, &ConstraintKind::Constant) {
        return python_literal(&constant.value);
    }
    if property.cardinality.is_iterative() {
        "[]".to_string()
    } else {
        "None".to_string()
    }
}
