//! Root package backend: the ontology's `__init__.py`

use super::{module_header, TYPESET};
use crate::codegen::names;
use crate::codegen::{Emission, Generator, GeneratorContext};

/// Imports every package module, dependencies first, and lists the
/// standalone document classes
#[derive(Debug, Default)]
pub struct RootGenerator {
    entities: Vec<String>,
}

impl Generator for RootGenerator {
    fn name(&self) -> &str {
        "python-root"
    }

    fn on_start(&mut self, _ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        self.entities.clear();
        Vec::new()
    }

    fn on_class_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let (Some(package), Some(class)) = (ctx.package, ctx.class) else {
            return Vec::new();
        };
        if !class.is_abstract && ctx.ontology.is_entity(class.id) {
            self.entities.push(format!(
                "{}.{}",
                names::package_module(&package.name, TYPESET),
                names::class_name(&class.name)
            ));
        }
        Vec::new()
    }

    fn on_end(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let ontology = ctx.ontology;

        let mut lines = module_header(ontology, &names::to_snake_case(&ontology.name));
        lines.push(String::new());
        for id in ontology.package_order() {
            let package = ontology.package(id);
            lines.push(format!(
                "from . import {}",
                names::package_module(&package.name, TYPESET)
            ));
        }

        lines.push(String::new());
        lines.push(String::new());
        lines.push(format!("NAME = {}", serde_json::Value::String(ontology.name.clone())));
        lines.push(format!("VERSION = {}", serde_json::Value::String(ontology.version.clone())));
        lines.push(String::new());
        lines.push("ENTITIES = (".to_string());
        for entity in &self.entities {
            lines.push(format!("    {},", entity));
        }
        lines.push(")".to_string());
        lines.push(String::new());

        vec![Emission::new(
            lines.join("\n"),
            names::ontology_dir(ontology),
            "__init__.py",
        )]
    }
}
