//! Validator backend: one `<package>_validator.py` per package with
//! concrete classes

use super::{module_header, Modules, TYPESET, VALIDATOR};
use crate::codegen::names;
use crate::codegen::{Emission, Generator, GeneratorContext};
use crate::ontology::ConstraintKind;

/// Emits a `validate_<class>` function per concrete class
#[derive(Debug, Default)]
pub struct ValidatorGenerator {
    modules: Modules,
}

impl Generator for ValidatorGenerator {
    fn name(&self) -> &str {
        "python-validator"
    }

    fn on_package_parse(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        let Some(package) = ctx.package else {
            return Vec::new();
        };
        if ctx.ontology.concrete_classes(package.id).is_empty() {
            return Vec::new();
        }

        let mut header = module_header(ctx.ontology, &names::package_module(&package.name, VALIDATOR));
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
        if class.is_abstract {
            return Vec::new();
        }

        let ontology = ctx.ontology;
        let mut lines = vec![
            format!("def validate_{}(instance):", names::python_identifier(&class.name)),
            format!("    \"\"\"Validates an instance of {}.\"\"\"", class.qualified_name),
            "    errors = []".to_string(),
            format!(
                "    if not isinstance(instance, typeset.{}):",
                names::class_name(&class.name)
            ),
            format!(
                "        return [\"expected an instance of {}\"]",
                class.qualified_name
            ),
        ];

        for property in ontology.all_properties(class.id) {
            if ontology
                .constraint_for(class.id, &property.name, &ConstraintKind::Hidden)
                .is_some()
            {
                continue;
            }

            let attr = format!("instance.{}", names::python_identifier(&property.name));
            let entity = format!("{}.{}", class.qualified_name, property.name);
            let cardinality = property.cardinality;

            if cardinality.is_iterative() {
                lines.push(format!("    if not isinstance({}, list):", attr));
                lines.push(format!("        errors.append(\"{} must be a list\")", entity));
                if cardinality.is_required() {
                    lines.push(format!("    elif not {}:", attr));
                    lines.push(format!(
                        "        errors.append(\"{} requires at least one value\")",
                        entity
                    ));
                }
            } else if cardinality.is_required() {
                lines.push(format!("    if {} is None:", attr));
                lines.push(format!("        errors.append(\"{} is required\")", entity));
            }
        }
        lines.push("    return errors".to_string());

        self.modules.get(&package.name).push((0, 0), lines.join("\n"));
        Vec::new()
    }

    fn on_end(&mut self, ctx: &GeneratorContext<'_>) -> Vec<Emission> {
        self.modules.emit(ctx, VALIDATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::python::tests::{file, fruit_ontology, run};
    use crate::ontology::build;
    use crate::schema::{RawPackage, RawSchema};
    use serde_json::json;

    #[test]
    fn test_concrete_classes_only() {
        let emissions = run(&mut ValidatorGenerator::default(), &fruit_ontology());
        let fruit = file(&emissions, "fruit_validator.py");

        assert!(fruit.contains("def validate_mango(instance):"));
        assert!(!fruit.contains("def validate_fruit("));
        assert!(file(&emissions, "farm_validator.py").contains("def validate_farmer(instance):"));
    }

    #[test]
    fn test_required_and_iterative_checks() {
        let emissions = run(&mut ValidatorGenerator::default(), &fruit_ontology());
        let fruit = file(&emissions, "fruit_validator.py");

        assert!(fruit.contains("errors.append(\"fruit.mango.sweetness is required\")"));
        assert!(fruit.contains("errors.append(\"fruit.mango.tags must be a list\")"));
        assert!(!fruit.contains("fruit.mango.grower is required"));
    }

    #[test]
    fn test_no_module_for_abstract_only_package() {
        let raw = RawSchema::new("test", "1", "")
            .with_package(RawPackage::new("core", "Abstract roots").with_class(
                "thing",
                json!({"base": null, "is_abstract": true, "properties": [["name", "str", "1.1"]]}),
            ))
            .with_package(
                RawPackage::new("shop", "Shops")
                    .with_class("shop", json!({"base": "core.thing", "is_abstract": false})),
            );
        let emissions = run(&mut ValidatorGenerator::default(), &build(&raw).unwrap());

        let files: Vec<_> = emissions.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(files, vec!["shop_validator.py"]);
        assert!(file(&emissions, "shop_validator.py").contains("shop.shop.name is required"));
    }
}
