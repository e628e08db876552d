//! Ontology Builder
//!
//! Turns a validated [`RawSchema`] into a resolved [`Ontology`] in two stages.
//!
//! Stage A instantiates every package, class, enum and property. Bases are
//! still names and complex property types are still unresolved, because a
//! class may reference a sibling that is created later.
//!
//! Stage B runs the resolution passes, in order, each over the whole graph:
//!
//! 1. wire containment (package -> classes/enums, class -> properties)
//! 2. resolve base classes, then cut inheritance cycles
//! 3. resolve property and decoding types
//! 4. compute class imports
//! 5. break circular imports
//! 6. compute package associations
//! 7. compute external type references
//!
//! Stage A fails hard on structurally illegal input. Stage B never fails:
//! dangling references are logged and recorded as diagnostics.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::analysis;
use super::types::{Cardinality, EntityId, Type, TypeRef};
use super::{
    Class, ClassId, Constraint, ConstraintKind, Decoding, Enum, EnumId, EnumMember, Ontology,
    Package, PackageId, Property, PropertyId, RESERVED_PROPERTY,
};
use crate::error::{OntologyError, Result};
use crate::schema::{FactoryKind, RawPackage, RawSchema};

/// Fully-qualified name -> entity, alive only for the duration of a build
type Registry = HashMap<String, EntityId>;

/// Build and resolve an ontology from a validated raw schema
pub fn build(raw: &RawSchema) -> Result<Ontology> {
    let mut ontology = Ontology::empty(&raw.name, &raw.version, &raw.doc);
    let mut registry = Registry::new();

    // Stage A
    for package in &raw.packages {
        instantiate_package(&mut ontology, &mut registry, package)?;
    }
    debug!(
        "Instantiated {}: {} packages, {} classes, {} enums, {} properties",
        ontology.name,
        ontology.packages.len(),
        ontology.classes.len(),
        ontology.enums.len(),
        ontology.properties.len()
    );

    // Stage B
    wire_containment(&mut ontology);
    resolve_bases(&mut ontology, &registry);
    break_inheritance_cycles(&mut ontology);
    resolve_types(&mut ontology, &registry);
    analysis::compute_imports(&mut ontology);
    analysis::break_circular_imports(&mut ontology);
    analysis::compute_associations(&mut ontology);
    analysis::compute_external_types(&mut ontology);
    analysis::report_package_cycles(&mut ontology);

    ontology.index = registry.into_iter().collect();

    debug!(
        "Resolved {} with {} diagnostic(s)",
        ontology.name,
        ontology.diagnostics.len()
    );
    Ok(ontology)
}

// =============================================================================
// Stage A: entity instantiation
// =============================================================================

fn instantiate_package(
    ontology: &mut Ontology,
    registry: &mut Registry,
    raw: &RawPackage,
) -> Result<()> {
    let package_id = PackageId(ontology.packages.len());
    ontology.packages.push(Package {
        id: package_id,
        name: raw.name.clone(),
        doc: raw.doc.clone().unwrap_or_default(),
        classes: Vec::new(),
        enums: Vec::new(),
        associated_packages: Default::default(),
        external_types: Default::default(),
    });

    for (kind, name, body) in raw.factories() {
        let qualified_name = format!("{}.{}", raw.name, name);
        if registry.contains_key(&qualified_name) {
            return Err(OntologyError::structure(&qualified_name, "type defined twice"));
        }

        let body = body
            .as_object()
            .ok_or_else(|| OntologyError::structure(&qualified_name, "factory body is not an object"))?;

        let entity = match kind {
            FactoryKind::Class => EntityId::Class(instantiate_class(
                ontology,
                package_id,
                name,
                &qualified_name,
                body,
            )?),
            FactoryKind::Enum => EntityId::Enum(instantiate_enum(
                ontology,
                package_id,
                name,
                &qualified_name,
                body,
            )?),
        };
        registry.insert(qualified_name, entity);
    }

    Ok(())
}

fn instantiate_class(
    ontology: &mut Ontology,
    package: PackageId,
    name: &str,
    qualified_name: &str,
    body: &Map<String, Value>,
) -> Result<ClassId> {
    let class_id = ClassId(ontology.classes.len());

    let doc_strings = body.get("doc_strings").and_then(Value::as_object);

    let mut seen = HashSet::new();
    let mut properties = Vec::new();
    for entry in list_field(body, "properties", qualified_name)? {
        let property = instantiate_property(
            PropertyId(ontology.properties.len() + properties.len()),
            class_id,
            package,
            qualified_name,
            entry,
            doc_strings,
        )?;
        if !seen.insert(property.name.clone()) {
            return Err(OntologyError::structure(
                format!("{}.{}", qualified_name, property.name),
                "property declared twice",
            ));
        }
        properties.push(property);
    }

    let constraints = list_field(body, "constraints", qualified_name)?
        .iter()
        .map(|entry| instantiate_constraint(qualified_name, entry))
        .collect::<Result<Vec<_>>>()?;

    let decodings = list_field(body, "decodings", qualified_name)?
        .iter()
        .map(|entry| instantiate_decoding(qualified_name, entry))
        .collect::<Result<Vec<_>>>()?;

    ontology.properties.extend(properties);
    ontology.classes.push(Class {
        id: class_id,
        name: name.to_string(),
        qualified_name: qualified_name.to_string(),
        package,
        declared_base: body.get("base").and_then(Value::as_str).map(str::to_string),
        base: None,
        is_abstract: body.get("is_abstract").and_then(Value::as_bool).unwrap_or(false),
        doc: string_field(body, "doc"),
        properties: Vec::new(),
        constraints,
        decodings,
        imports: Default::default(),
        circular_imports: Default::default(),
    });

    Ok(class_id)
}

fn instantiate_property(
    id: PropertyId,
    class: ClassId,
    package: PackageId,
    owner: &str,
    entry: &Value,
    doc_strings: Option<&Map<String, Value>>,
) -> Result<Property> {
    let fields = tuple(entry, owner, "property", 3, 4)?;

    let name = tuple_str(fields, 0, owner, "property name")?;
    let entity = format!("{}.{}", owner, name);
    if name == RESERVED_PROPERTY {
        return Err(OntologyError::structure(
            &entity,
            format!("'{}' is a reserved property name", RESERVED_PROPERTY),
        ));
    }

    let ty = Type::parse(tuple_str(fields, 1, &entity, "property type")?);
    let cardinality: Cardinality = tuple_str(fields, 2, &entity, "cardinality")?
        .parse()
        .map_err(|e: OntologyError| OntologyError::structure(&entity, e.to_string()))?;

    let doc = fields
        .get(3)
        .and_then(Value::as_str)
        .or_else(|| doc_strings.and_then(|d| d.get(name)).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    Ok(Property {
        id,
        name: name.to_string(),
        class,
        package,
        ty,
        cardinality,
        doc,
    })
}

fn instantiate_constraint(owner: &str, entry: &Value) -> Result<Constraint> {
    let fields = tuple(entry, owner, "constraint", 3, 3)?;
    Ok(Constraint {
        property: tuple_str(fields, 0, owner, "constraint property")?.to_string(),
        kind: ConstraintKind::parse(tuple_str(fields, 1, owner, "constraint kind")?),
        value: fields[2].clone(),
    })
}

fn instantiate_decoding(owner: &str, entry: &Value) -> Result<Decoding> {
    let fields = tuple(entry, owner, "decoding", 2, 3)?;
    let override_type = match fields.get(2) {
        None | Some(Value::Null) => None,
        Some(_) => Some(Type::parse(tuple_str(fields, 2, owner, "decoding type")?)),
    };
    Ok(Decoding {
        property: tuple_str(fields, 0, owner, "decoding property")?.to_string(),
        rule: tuple_str(fields, 1, owner, "decoding rule")?.to_string(),
        override_type,
    })
}

fn instantiate_enum(
    ontology: &mut Ontology,
    package: PackageId,
    name: &str,
    qualified_name: &str,
    body: &Map<String, Value>,
) -> Result<EnumId> {
    let enum_id = EnumId(ontology.enums.len());

    let mut members = Vec::new();
    let mut seen = HashSet::new();
    for entry in list_field(body, "members", qualified_name)? {
        let member = match entry {
            Value::String(value) => EnumMember {
                name: value.clone(),
                doc: String::new(),
            },
            Value::Array(_) => {
                let fields = tuple(entry, qualified_name, "member", 1, 2)?;
                EnumMember {
                    name: tuple_str(fields, 0, qualified_name, "member name")?.to_string(),
                    doc: fields
                        .get(1)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                }
            }
            _ => {
                return Err(OntologyError::structure(
                    qualified_name,
                    "enum member is neither a string nor a tuple",
                ))
            }
        };
        if !seen.insert(member.name.clone()) {
            return Err(OntologyError::structure(
                format!("{}.{}", qualified_name, member.name),
                "enum member declared twice",
            ));
        }
        members.push(member);
    }
    members.sort_by(|a, b| a.name.cmp(&b.name));

    ontology.enums.push(Enum {
        id: enum_id,
        name: name.to_string(),
        qualified_name: qualified_name.to_string(),
        package,
        is_open: body.get("is_open").and_then(Value::as_bool).unwrap_or(false),
        doc: string_field(body, "doc"),
        members,
    });

    Ok(enum_id)
}

// --- raw field helpers ---

fn string_field(body: &Map<String, Value>, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Optional list field; absent or null reads as empty
fn list_field<'a>(body: &'a Map<String, Value>, key: &str, owner: &str) -> Result<&'a [Value]> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(OntologyError::structure(owner, format!("'{}' is not a list", key))),
    }
}

/// A tuple entry with an arity between `min` and `max`
fn tuple<'a>(entry: &'a Value, owner: &str, what: &str, min: usize, max: usize) -> Result<&'a [Value]> {
    let fields = entry
        .as_array()
        .ok_or_else(|| OntologyError::structure(owner, format!("{} entry is not a tuple", what)))?;
    if fields.len() < min || fields.len() > max {
        return Err(OntologyError::structure(
            owner,
            format!(
                "{} entry has {} element(s), expected {}",
                what,
                fields.len(),
                if min == max { min.to_string() } else { format!("{}-{}", min, max) }
            ),
        ));
    }
    Ok(fields)
}

fn tuple_str<'a>(fields: &'a [Value], index: usize, owner: &str, what: &str) -> Result<&'a str> {
    fields
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| OntologyError::structure(owner, format!("{} is not a string", what)))
}

// =============================================================================
// Stage B: passes 1-3
// =============================================================================

/// Pass 1: containment lists from owner pointers
fn wire_containment(ontology: &mut Ontology) {
    let Ontology {
        packages,
        classes,
        enums,
        properties,
        ..
    } = ontology;

    for property in properties.iter() {
        classes[property.class.0].properties.push(property.id);
    }
    for class in classes.iter_mut() {
        class
            .properties
            .sort_by(|a, b| properties[a.0].name.cmp(&properties[b.0].name));
        packages[class.package.0].classes.push(class.id);
    }
    for enumeration in enums.iter() {
        packages[enumeration.package.0].enums.push(enumeration.id);
    }
}

/// Pass 2: bind declared bases
fn resolve_bases(ontology: &mut Ontology, registry: &Registry) {
    let Ontology {
        classes,
        diagnostics,
        ..
    } = ontology;

    for class in classes.iter_mut() {
        let Some(declared) = class.declared_base.as_deref() else {
            continue;
        };
        match registry.get(declared) {
            Some(EntityId::Class(base)) => class.base = Some(*base),
            _ => {
                warn!("{}: base class '{}' not found", class.qualified_name, declared);
                diagnostics.unresolved_base(&class.qualified_name, declared);
                class.base = None;
            }
        }
    }
}

/// Pass 2 (cont.): cut any base chain that loops back to its start
fn break_inheritance_cycles(ontology: &mut Ontology) {
    let mut order: Vec<ClassId> = ontology.classes.iter().map(|c| c.id).collect();
    order.sort_by(|a, b| {
        ontology.classes[a.0]
            .qualified_name
            .cmp(&ontology.classes[b.0].qualified_name)
    });

    for id in order {
        let mut chain = vec![ontology.classes[id.0].qualified_name.clone()];
        let mut seen = HashSet::from([id]);
        let mut current = ontology.classes[id.0].base;
        let mut cyclic = false;

        while let Some(next) = current {
            chain.push(ontology.classes[next.0].qualified_name.clone());
            if next == id {
                cyclic = true;
                break;
            }
            if !seen.insert(next) {
                break;
            }
            current = ontology.classes[next.0].base;
        }

        if cyclic {
            let class = &mut ontology.classes[id.0];
            warn!("{}: inheritance cycle {}", class.qualified_name, chain.join(" -> "));
            class.base = None;
            ontology
                .diagnostics
                .inheritance_cycle(&ontology.classes[id.0].qualified_name, &chain);
        }
    }
}

/// Pass 3: bind complex property and decoding types
fn resolve_types(ontology: &mut Ontology, registry: &Registry) {
    let Ontology {
        classes,
        properties,
        diagnostics,
        ..
    } = ontology;

    for property in properties.iter_mut() {
        let owner = format!("{}.{}", classes[property.class.0].qualified_name, property.name);
        resolve_type(&mut property.ty, &owner, registry, diagnostics);
    }

    for class in classes.iter_mut() {
        for decoding in &mut class.decodings {
            if let Some(ty) = decoding.override_type.as_mut() {
                let owner = format!("{}.{}", class.qualified_name, decoding.property);
                resolve_type(ty, &owner, registry, diagnostics);
            }
        }
    }
}

fn resolve_type(
    ty: &mut Type,
    owner: &str,
    registry: &Registry,
    diagnostics: &mut super::Diagnostics,
) {
    if ty.is_resolved() {
        return;
    }
    match registry.get(&ty.name) {
        Some(entity) => ty.target = TypeRef::Resolved(*entity),
        None => {
            warn!("{}: type '{}' not found", owner, ty.name);
            diagnostics.unresolved_type(owner, &ty.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::DiagnosticCode;
    use serde_json::json;

    fn fruit_schema() -> RawSchema {
        RawSchema::new("test", "1", "Test ontology").with_package(
            RawPackage::new("fruit", "Fruit package")
                .with_class(
                    "fruit",
                    json!({
                        "type": "class", "base": null, "is_abstract": true,
                        "properties": [
                            ["sweetness", "fruit.sweetness", "1.1"],
                            ["weight", "float", "1.1"]
                        ]
                    }),
                )
                .with_class(
                    "mango",
                    json!({"type": "class", "base": "fruit.fruit", "is_abstract": false}),
                )
                .with_enum(
                    "sweetness",
                    json!({"type": "enum", "is_open": false, "members": [["very", ""], ["low", ""], ["medium", ""]]}),
                ),
        )
    }

    #[test]
    fn test_inheritance_flattening() {
        let ontology = build(&fruit_schema()).unwrap();
        let mango = ontology.find_class("fruit.mango").unwrap();

        assert!(!mango.is_abstract);
        assert!(mango.properties.is_empty());
        let names: Vec<_> = ontology
            .all_properties(mango.id)
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["sweetness", "weight"]);
    }

    #[test]
    fn test_type_resolution() {
        let ontology = build(&fruit_schema()).unwrap();
        let fruit = ontology.find_class("fruit.fruit").unwrap();
        let sweetness = ontology.find_property(fruit.id, "sweetness").unwrap();

        assert!(sweetness.ty.is_enum());
        assert!(!sweetness.ty.is_class());
        assert!(ontology.diagnostics().is_empty());
    }

    #[test]
    fn test_enum_members_sorted() {
        let ontology = build(&fruit_schema()).unwrap();
        let sweetness = ontology.find_enum("fruit.sweetness").unwrap();
        let members: Vec<_> = sweetness.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["low", "medium", "very"]);
        assert!(!sweetness.is_open);
    }

    #[test]
    fn test_missing_base_is_soft() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit").with_class(
                "kiwi",
                json!({"type": "class", "base": "xxx.yyy", "is_abstract": false}),
            ),
        );
        let ontology = build(&raw).unwrap();
        let kiwi = ontology.find_class("fruit.kiwi").unwrap();

        assert_eq!(kiwi.base, None);
        assert_eq!(kiwi.declared_base.as_deref(), Some("xxx.yyy"));
        assert_eq!(
            ontology.diagnostics().with_code(DiagnosticCode::UnresolvedBase).count(),
            1
        );
    }

    #[test]
    fn test_reserved_property_is_hard_failure() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit").with_class(
                "kiwi",
                json!({"base": null, "is_abstract": false, "properties": [["ext", "str", "0.1"]]}),
            ),
        );
        let err = build(&raw).unwrap_err();
        assert!(matches!(err, OntologyError::InvalidSchemaStructure { .. }));
        assert!(err.to_string().contains("fruit.kiwi.ext"));
    }

    #[test]
    fn test_wrong_arity_is_hard_failure() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit").with_class(
                "kiwi",
                json!({"base": null, "is_abstract": false, "properties": [["colour", "str"]]}),
            ),
        );
        assert!(matches!(
            build(&raw),
            Err(OntologyError::InvalidSchemaStructure { .. })
        ));

        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit").with_class(
                "kiwi",
                json!({"base": null, "is_abstract": false, "properties": ["colour"]}),
            ),
        );
        assert!(matches!(
            build(&raw),
            Err(OntologyError::InvalidSchemaStructure { .. })
        ));
    }

    #[test]
    fn test_inheritance_cycle_is_cut() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("loop", "Loop")
                .with_class("a", json!({"base": "loop.b", "is_abstract": false}))
                .with_class("b", json!({"base": "loop.a", "is_abstract": false})),
        );
        let ontology = build(&raw).unwrap();
        let a = ontology.find_class("loop.a").unwrap();
        let b = ontology.find_class("loop.b").unwrap();

        assert_eq!(a.base, None);
        assert_eq!(b.base, Some(a.id));
        assert_eq!(ontology.ancestors(b.id), vec![a.id]);
        assert_eq!(
            ontology.diagnostics().with_code(DiagnosticCode::InheritanceCycle).count(),
            1
        );
    }

    #[test]
    fn test_property_doc_from_doc_strings() {
        let raw = RawSchema::new("test", "1", "").with_package(
            RawPackage::new("fruit", "Fruit").with_class(
                "kiwi",
                json!({
                    "base": null, "is_abstract": false,
                    "properties": [["colour", "str", "0.1"], ["size", "int", "0.1", "Tuple doc"]],
                    "doc_strings": {"colour": "Skin colour", "size": "Ignored"}
                }),
            ),
        );
        let ontology = build(&raw).unwrap();
        let kiwi = ontology.find_class("fruit.kiwi").unwrap();
        assert_eq!(ontology.find_property(kiwi.id, "colour").unwrap().doc, "Skin colour");
        assert_eq!(ontology.find_property(kiwi.id, "size").unwrap().doc, "Tuple doc");
    }
}
