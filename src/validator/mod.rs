//! Schema Validation
//!
//! The gate in front of the builder. Every check is local and syntactic:
//! whether a referenced base or type actually exists is left to the builder,
//! which treats a dangling reference as a diagnostic instead of an error.
//!
//! Each error is one line naming the offending entity by its qualified name
//! (`schema`, `schema.package`, `package.type`, `package.type.property`).

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::ontology::types::{ScalarKind, LINKED_TO_PREFIX};
use crate::ontology::Cardinality;
use crate::schema::{FactoryKind, RawPackage, RawSchema};

/// Validate a raw schema. An empty list means the schema may be built.
pub fn validate(raw: &RawSchema) -> Vec<String> {
    match SchemaValidator::new() {
        Ok(validator) => validator.validate(raw),
        Err(e) => vec![format!("{}: validator unavailable: {}", raw.name, e)],
    }
}

/// Compiled naming and type patterns
pub struct SchemaValidator {
    /// Schema, package and type names
    name: Regex,
    /// Property names
    property: Regex,
    /// `package.name` references
    qualified: Regex,
    /// Bare keyword types
    bare_type: Regex,
    /// `linked_to(package.name, ...)` wrappers
    linked_to: Regex,
}

impl SchemaValidator {
    pub fn new() -> Result<Self> {
        let qualified = r"[a-z][a-z0-9_]*\.[a-z][a-z0-9_]*";
        Ok(Self {
            name: Regex::new(r"^[a-z][a-z0-9_]*$")?,
            property: Regex::new(r"^[a-z_]+$")?,
            qualified: Regex::new(&format!("^{}$", qualified))?,
            bare_type: Regex::new(r"^[a-z]+$")?,
            linked_to: Regex::new(&format!(
                r"^linked_to\(\s*{q}(\s*,\s*{q})*\s*\)$",
                q = qualified
            ))?,
        })
    }

    /// Run every check and collect the errors in schema order
    pub fn validate(&self, raw: &RawSchema) -> Vec<String> {
        let mut errors = Vec::new();
        self.check_schema(raw, &mut errors);

        for package in &raw.packages {
            self.check_package(package, &mut errors);
        }

        debug!("Validated {}: {} error(s)", raw.name, errors.len());
        errors
    }

    // =========================================================================
    // Schema / package
    // =========================================================================

    fn check_schema(&self, raw: &RawSchema, errors: &mut Vec<String>) {
        let entity = if raw.name.is_empty() { "schema" } else { raw.name.as_str() };

        if raw.name.is_empty() {
            errors.push(format!("{}: name is missing", entity));
        } else if !self.name.is_match(&raw.name) {
            errors.push(format!("{}: name must be lower case with underscores", entity));
        }
        if raw.version.trim().is_empty() {
            errors.push(format!("{}: version is missing", entity));
        }
        if raw.packages.is_empty() {
            errors.push(format!("{}: no packages defined", entity));
        }
    }

    fn check_package(&self, package: &RawPackage, errors: &mut Vec<String>) {
        let entity = package.name.as_str();

        if !self.name.is_match(entity) {
            errors.push(format!("{}: package name must be lower case with underscores", entity));
        }
        if package.doc.as_deref().map_or(true, |d| d.trim().is_empty()) {
            errors.push(format!("{}: package doc string is missing", entity));
        }
        if package.classes.is_none() && package.enums.is_none() {
            errors.push(format!("{}: package defines neither classes nor enums", entity));
        }

        for (kind, name, body) in package.factories() {
            let qualified = format!("{}.{}", entity, name);
            if !self.name.is_match(name) {
                errors.push(format!("{}: type name must be lower case with underscores", qualified));
            }

            let Some(body) = body.as_object() else {
                errors.push(format!("{}: {} definition is not an object", qualified, kind.as_str()));
                continue;
            };

            if let Some(declared) = body.get("type") {
                if declared.as_str() != Some(kind.as_str()) {
                    errors.push(format!(
                        "{}: factory type {} does not match {}",
                        qualified,
                        declared,
                        kind.as_str()
                    ));
                }
            }

            match kind {
                FactoryKind::Class => self.check_class(&qualified, body, errors),
                FactoryKind::Enum => check_enum(&qualified, body, errors),
            }
        }
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn check_class(&self, entity: &str, body: &Map<String, Value>, errors: &mut Vec<String>) {
        match body.get("base") {
            None => errors.push(format!("{}: base is missing", entity)),
            Some(Value::Null) => {}
            Some(Value::String(base)) if self.qualified.is_match(base) => {}
            Some(other) => errors.push(format!(
                "{}: base {} is not a package.name reference",
                entity, other
            )),
        }

        match body.get("is_abstract") {
            None => errors.push(format!("{}: is_abstract is missing", entity)),
            Some(Value::Bool(_)) => {}
            Some(_) => errors.push(format!("{}: is_abstract must be a boolean", entity)),
        }

        if let Some(properties) = optional_list(body, "properties", entity, errors) {
            let mut seen = HashSet::new();
            for entry in properties {
                self.check_property(entity, entry, &mut seen, errors);
            }
        }

        if let Some(constraints) = optional_list(body, "constraints", entity, errors) {
            for entry in constraints {
                match entry.as_array() {
                    Some(fields) if fields.len() == 3 && fields[0].is_string() && fields[1].is_string() => {}
                    _ => errors.push(format!(
                        "{}: constraint {} must be a (property, kind, value) tuple",
                        entity, entry
                    )),
                }
            }
        }

        if let Some(decodings) = optional_list(body, "decodings", entity, errors) {
            for entry in decodings {
                let ok = match entry.as_array() {
                    Some(fields) if (2..=3).contains(&fields.len()) => fields
                        .iter()
                        .enumerate()
                        .all(|(i, f)| f.is_string() || (i == 2 && f.is_null())),
                    _ => false,
                };
                if !ok {
                    errors.push(format!(
                        "{}: decoding {} must be a (property, rule[, type]) tuple",
                        entity, entry
                    ));
                }
            }
        }

        if let Some(doc_strings) = body.get("doc_strings") {
            if !doc_strings.is_object() && !doc_strings.is_null() {
                errors.push(format!("{}: doc_strings must be an object", entity));
            }
        }
    }

    fn check_property(
        &self,
        class: &str,
        entry: &Value,
        seen: &mut HashSet<String>,
        errors: &mut Vec<String>,
    ) {
        let Some(fields) = entry.as_array().filter(|f| (3..=4).contains(&f.len())) else {
            errors.push(format!(
                "{}: property {} must be a (name, type, cardinality[, doc]) tuple",
                class, entry
            ));
            return;
        };

        let Some(name) = fields[0].as_str() else {
            errors.push(format!("{}: property name {} is not a string", class, fields[0]));
            return;
        };
        let entity = format!("{}.{}", class, name);

        if !self.property.is_match(name) {
            errors.push(format!("{}: property name must be lower case with underscores", entity));
        }
        if !seen.insert(name.to_string()) {
            errors.push(format!("{}: property declared twice", entity));
        }

        match fields[1].as_str() {
            Some(ty) => {
                if let Some(problem) = self.check_type(ty) {
                    errors.push(format!("{}: {}", entity, problem));
                }
            }
            None => errors.push(format!("{}: type {} is not a string", entity, fields[1])),
        }

        match fields[2].as_str() {
            Some(c) if Cardinality::ENCODINGS.contains(&c) => {}
            _ => errors.push(format!(
                "{}: cardinality {} is not one of {}",
                entity,
                fields[2],
                Cardinality::ENCODINGS.join(", ")
            )),
        }

        if let Some(doc) = fields.get(3) {
            if !doc.is_string() && !doc.is_null() {
                errors.push(format!("{}: doc {} is not a string", entity, doc));
            }
        }
    }

    /// Describe what is wrong with a type string, if anything
    fn check_type(&self, ty: &str) -> Option<String> {
        if ty.starts_with(LINKED_TO_PREFIX) {
            return (!self.linked_to.is_match(ty))
                .then(|| format!("linked type '{}' must wrap package.name references", ty));
        }
        if self.qualified.is_match(ty) {
            return None;
        }
        if self.bare_type.is_match(ty) {
            return ScalarKind::from_keyword(ty)
                .is_none()
                .then(|| format!("'{}' is not a known scalar type", ty));
        }
        Some(format!("type '{}' is neither a scalar nor a package.name reference", ty))
    }
}

// =============================================================================
// Enums
// =============================================================================

fn check_enum(entity: &str, body: &Map<String, Value>, errors: &mut Vec<String>) {
    match body.get("is_open") {
        None => errors.push(format!("{}: is_open is missing", entity)),
        Some(Value::Bool(_)) => {}
        Some(_) => errors.push(format!("{}: is_open must be a boolean", entity)),
    }

    let Some(members) = body.get("members") else {
        errors.push(format!("{}: members are missing", entity));
        return;
    };
    let Some(members) = members.as_array() else {
        errors.push(format!("{}: members must be a list", entity));
        return;
    };

    let mut seen = HashSet::new();
    for member in members {
        let name = match member {
            Value::String(name) => Some(name.as_str()),
            Value::Array(fields) if (1..=2).contains(&fields.len()) => fields[0].as_str(),
            _ => None,
        };
        match name {
            Some(name) if !seen.insert(name) => {
                errors.push(format!("{}.{}: enum member declared twice", entity, name))
            }
            Some(_) => {}
            None => errors.push(format!(
                "{}: member {} must be a name or a (name, doc) tuple",
                entity, member
            )),
        }
    }
}

/// A list-valued key that may be absent or null
fn optional_list<'a>(
    body: &'a Map<String, Value>,
    key: &str,
    entity: &str,
    errors: &mut Vec<String>,
) -> Option<&'a Vec<Value>> {
    match body.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items),
        Some(_) => {
            errors.push(format!("{}: {} must be a list", entity, key));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn fruit_package() -> RawPackage {
        RawPackage::new("fruit", "Fruit package")
            .with_class(
                "fruit",
                json!({
                    "type": "class", "base": null, "is_abstract": true,
                    "properties": [
                        ["sweetness", "fruit.sweetness", "1.1"],
                        ["weight", "float", "1.1", "Weight in grams"]
                    ]
                }),
            )
            .with_class(
                "mango",
                json!({"type": "class", "base": "fruit.fruit", "is_abstract": false}),
            )
            .with_enum(
                "sweetness",
                json!({"type": "enum", "is_open": false, "members": [["low", ""], "high"]}),
            )
    }

    fn schema_with(package: RawPackage) -> RawSchema {
        RawSchema::new("test", "1", "Test ontology").with_package(package)
    }

    #[test]
    fn test_valid_schema_has_no_errors() {
        assert!(validate(&schema_with(fruit_package())).is_empty());
    }

    #[test]
    fn test_upper_case_property_name() {
        let package = fruit_package().with_class(
            "kiwi",
            json!({"base": null, "is_abstract": false, "properties": [["Sweetness", "fruit.sweetness", "1.1"]]}),
        );
        let errors = validate(&schema_with(package));

        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("Sweetness"));
        assert!(errors[0].starts_with("fruit.kiwi.Sweetness"));
    }

    #[rstest]
    #[case::bad_base(json!({"base": "Fruit", "is_abstract": false}), "fruit.kiwi")]
    #[case::missing_base(json!({"is_abstract": false}), "fruit.kiwi")]
    #[case::missing_abstract(json!({"base": null}), "fruit.kiwi")]
    #[case::abstract_not_bool(json!({"base": null, "is_abstract": "no"}), "fruit.kiwi")]
    #[case::properties_not_list(json!({"base": null, "is_abstract": false, "properties": {}}), "fruit.kiwi")]
    #[case::short_tuple(json!({"base": null, "is_abstract": false, "properties": [["colour", "str"]]}), "fruit.kiwi")]
    #[case::unknown_scalar(json!({"base": null, "is_abstract": false, "properties": [["colour", "string", "0.1"]]}), "fruit.kiwi.colour")]
    #[case::bad_cardinality(json!({"base": null, "is_abstract": false, "properties": [["colour", "str", "2.N"]]}), "fruit.kiwi.colour")]
    #[case::bad_linked(json!({"base": null, "is_abstract": false, "properties": [["owner", "linked_to(party)", "0.1"]]}), "fruit.kiwi.owner")]
    #[case::duplicate_property(json!({"base": null, "is_abstract": false, "properties": [["a", "str", "0.1"], ["a", "int", "0.1"]]}), "fruit.kiwi.a")]
    #[case::wrong_factory_type(json!({"type": "enum", "base": null, "is_abstract": false}), "fruit.kiwi")]
    #[case::bad_decoding(json!({"base": null, "is_abstract": false, "decodings": [["colour"]]}), "fruit.kiwi")]
    fn test_single_class_rule(#[case] body: Value, #[case] entity: &str) {
        let errors = validate(&schema_with(fruit_package().with_class("kiwi", body)));

        assert!(!errors.is_empty());
        assert!(
            errors.iter().all(|e| e.starts_with(entity)),
            "expected errors on {}, got {:?}",
            entity,
            errors
        );
    }

    #[rstest]
    #[case::missing_open(json!({"members": ["a"]}))]
    #[case::members_not_list(json!({"is_open": true, "members": "a"}))]
    #[case::duplicate_member(json!({"is_open": true, "members": ["a", ["a", "again"]]}))]
    #[case::bad_member(json!({"is_open": true, "members": [1]}))]
    fn test_single_enum_rule(#[case] body: Value) {
        let errors = validate(&schema_with(fruit_package().with_enum("colour", body)));
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].starts_with("fruit.colour"));
    }

    #[test]
    fn test_linked_to_accepted() {
        let package = fruit_package().with_class(
            "kiwi",
            json!({"base": null, "is_abstract": false,
                   "properties": [["grower", "linked_to(fruit.fruit, fruit.mango)", "0.N"]]}),
        );
        assert!(validate(&schema_with(package)).is_empty());
    }

    #[test]
    fn test_schema_and_package_level() {
        let errors = validate(&RawSchema::new("Bad Name", "", ""));
        assert_eq!(errors.len(), 3, "{:?}", errors);

        let mut package = RawPackage::new("fruit", "");
        package.doc = None;
        let errors = validate(&schema_with(package));
        assert!(errors.iter().any(|e| e.contains("doc string")));
        assert!(errors.iter().any(|e| e.contains("neither classes nor enums")));
    }

    #[test]
    fn test_dangling_references_are_not_validation_errors() {
        let package = fruit_package().with_class(
            "kiwi",
            json!({"base": "xxx.yyy", "is_abstract": false, "properties": [["origin", "geo.place", "0.1"]]}),
        );
        assert!(validate(&schema_with(package)).is_empty());
    }
}
