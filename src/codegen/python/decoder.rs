//! Decoder backend: one `<package>_decoder.py` per package with decodings
//!
//! Each class carrying decodings (own or inherited) gets a `decode_<class>`
//! function returning the target type together with its decoding rules.
//! Rules are data; walking the external document is left to the runtime.

use super::{module_header, python_literal, python_type, Modules, DECODER, TYPESET};
use crate::codegen::names;
use crate::codegen::{Emission, Generator, GeneratorContext};
use crate::ontology::Ontology;

#[derive(Debug, Default)]
pub struct DecoderGenerator {
    modules: Modules,
}

impl Generator for DecoderGenerator {
    fn name(&self) -> &str {
        "python-decoder"
    }

    fn is_required(&self, ontology: &Ontology) -> bool {
        ontology.decoding_count() > 0
    }

    fn on_package_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let Some(package) = ctx.package else {
            return Vec::new();
        };
        let decodes = package
            .classes
            .iter()
            .any(|id| !ctx.ontology.all_decodings(*id).is_empty());
        if !decodes {
            return Vec::new();
        }

        let mut header = module_header(ctx.ontology, &names::package_module(&package.name, DECODER));
        header.push(String::new());
        header.push(format!(
            "from . import {} as typeset",
            names::package_module(&package.name, TYPESET)
        ));
        self.modules.open(package, header);
        Vec::new()
    }

    fn on_class_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let (Some(package), Some(class)) = (ctx.package, ctx.class) else {
            return Vec::new();
        };

        let decodings = ctx.ontology.all_decodings(class.id);
        if decodings.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![
            format!("def decode_{}():", names::python_identifier(&class.name)),
            format!("    \"\"\"Decoding rules of {}.\"\"\"", class.qualified_name),
            "    rules = [".to_string(),
        ];
        for decoding in decodings {
            let target = match &decoding.override_type {
                Some(ty) => python_literal(&serde_json::Value::String(python_type(
                    ctx.ontology,
                    ty,
                    &package.name,
                ))),
                None => "None".to_string(),
            };
            lines.push(format!(
                "        ({}, {}, {}),",
                python_literal(&serde_json::Value::String(decoding.property.clone())),
                python_literal(&serde_json::Value::String(decoding.rule.clone())),
                target
            ));
        }
        lines.push("    ]".to_string());
        lines.push(format!(
            "    return typeset.{}, rules",
            names::class_name(&class.name)
        ));

        self.modules.get(&package.name).push((0, 0), lines.join("\n"));
        Vec::new()
    }

    fn on_end(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        self.modules.emit(ctx, DECODER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::python::tests::{file, fruit_ontology, run};
    use crate::codegen::{execute, GenerationOptions, MemoryWriter};
    use crate::ontology::build;
    use crate::schema::{RawPackage, RawSchema};
    use serde_json::json;

    #[test]
    fn test_decoder_functions() {
        let emissions = run(&mut DecoderGenerator::default(), &fruit_ontology());
        let fruit = file(&emissions, "fruit_decoder.py");

        assert!(fruit.contains("def decode_mango():"));
        assert!(fruit.contains("(\"tags\", \"child::tag\", None),"));
        assert!(fruit.contains("return typeset.Mango, rules"));
        assert!(!fruit.contains("def decode_fruit():"));
    }

    #[test]
    fn test_no_module_for_package_without_decodings() {
        let emissions = run(&mut DecoderGenerator::default(), &fruit_ontology());
        let files: Vec<_> = emissions.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(files, vec!["fruit_decoder.py"]);
    }

    #[test]
    fn test_skipped_without_decodings() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit").with_class("kiwi", json!({"base": null, "is_abstract": false})),
        );
        let ontology = build(&raw).unwrap();
        let writer = MemoryWriter::new();

        let report = execute(
            &ontology,
            &mut DecoderGenerator::default(),
            &GenerationOptions::default(),
            &writer,
        )
        .unwrap();
        assert!(report.skipped);
        assert!(writer.is_empty());
    }
}
