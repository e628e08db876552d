//! Ontology Graph Analysis
//!
//! Resolution passes 4-7 (imports, circular imports, package associations,
//! external type references) plus package-level dependency analysis.
//!
//! Every pass walks classes in a fixed order so that two builds of the same
//! schema produce identical derived sets.

use petgraph::algo::{kosaraju_scc, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::{ClassId, ImportEdge, Ontology, PackageId};

// =============================================================================
// Pass 4: imports
// =============================================================================

/// Record an import edge for each class's base and complex property types
pub fn compute_imports(ontology: &mut Ontology) {
    for index in 0..ontology.classes.len() {
        let class = &ontology.classes[index];
        let own_edge = class.as_import(&ontology.packages[class.package.0].name);
        let mut imports = BTreeSet::new();

        if let Some(base) = class.base {
            let base_class = &ontology.classes[base.0];
            imports.insert(base_class.as_import(&ontology.packages[base_class.package.0].name));
        }

        for property in &class.properties {
            let ty = &ontology.properties[property.0].ty;
            if let Some((package, type_name)) = ty.qualified_parts() {
                imports.insert(ImportEdge::new(package, type_name));
            }
        }

        imports.remove(&own_edge);

        let class = &mut ontology.classes[index];
        class.imports = imports;
        class.circular_imports.clear();
    }
}

// =============================================================================
// Pass 5: circular imports
// =============================================================================

/// Break mutual class references.
///
/// Classes are visited in qualified-name order. For a class `C` whose
/// property points at class `D`, when both `C -> D` and `D -> C` are still
/// ordinary imports, `D`'s edge back to `C` becomes circular and `C`'s edge
/// to `D` is left alone. This holds even when `C` is `D`'s base; backends
/// that need bases loaded eagerly hoist them themselves.
pub fn break_circular_imports(ontology: &mut Ontology) {
    for c in classes_by_qualified_name(ontology) {
        let targets: Vec<ClassId> = ontology.classes[c.0]
            .properties
            .iter()
            .filter_map(|p| ontology.properties[p.0].ty.class_id())
            .filter(|d| *d != c)
            .collect();

        for d in targets {
            let to_d = import_of(ontology, d);
            let to_c = import_of(ontology, c);

            if !ontology.classes[c.0].imports.contains(&to_d)
                || !ontology.classes[d.0].imports.contains(&to_c)
            {
                continue;
            }

            let class = &mut ontology.classes[d.0];
            class.imports.remove(&to_c);
            debug!("{}: deferring import of {}", class.qualified_name, to_c);
            ontology
                .diagnostics
                .circular_import(&ontology.classes[d.0].qualified_name, &to_c.to_string());
            ontology.classes[d.0].circular_imports.insert(to_c);
        }
    }
}

fn import_of(ontology: &Ontology, class: ClassId) -> ImportEdge {
    let class = &ontology.classes[class.0];
    class.as_import(&ontology.packages[class.package.0].name)
}

fn classes_by_qualified_name(ontology: &Ontology) -> Vec<ClassId> {
    let mut order: Vec<&super::Class> = ontology.classes.iter().collect();
    order.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
    order.into_iter().map(|c| c.id).collect()
}

// =============================================================================
// Pass 6: package associations
// =============================================================================

/// Packages reached through class bases and required complex properties
pub fn compute_associations(ontology: &mut Ontology) {
    for index in 0..ontology.packages.len() {
        let package_id = PackageId(index);
        let mut associated = BTreeSet::new();

        for class_id in &ontology.packages[index].classes {
            let class = &ontology.classes[class_id.0];

            if let Some(base) = class.base {
                associated.insert(ontology.classes[base.0].package);
            }

            for property in &class.properties {
                let property = &ontology.properties[property.0];
                if !property.cardinality.is_required() {
                    continue;
                }
                if let Some(entity) = property.ty.entity() {
                    associated.insert(ontology.entity_package(entity));
                }
            }
        }

        associated.remove(&package_id);
        ontology.packages[index].associated_packages = associated;
    }
}

// =============================================================================
// Pass 7: external type references
// =============================================================================

/// Resolved complex property types owned by another package
pub fn compute_external_types(ontology: &mut Ontology) {
    for index in 0..ontology.packages.len() {
        let package_id = PackageId(index);
        let mut external = BTreeSet::new();

        for class_id in &ontology.packages[index].classes {
            for property in &ontology.classes[class_id.0].properties {
                let Some(entity) = ontology.properties[property.0].ty.entity() else {
                    continue;
                };
                let owner = ontology.entity_package(entity);
                if owner == package_id {
                    continue;
                }
                if let Some((package, type_name)) =
                    super::types::split_qualified(ontology.entity_name(entity))
                {
                    external.insert(ImportEdge::new(package, type_name));
                }
            }
        }

        ontology.packages[index].external_types = external;
    }
}

// =============================================================================
// Package dependency graph
// =============================================================================

/// Dependency graph over packages: an edge `a -> b` means `a` needs `b`
pub fn package_graph(ontology: &Ontology) -> DiGraph<PackageId, ()> {
    let mut graph = DiGraph::with_capacity(ontology.packages.len(), ontology.packages.len() * 2);
    let mut nodes: HashMap<PackageId, NodeIndex> = HashMap::with_capacity(ontology.packages.len());

    for package in ontology.sorted_packages() {
        nodes.insert(package.id, graph.add_node(package.id));
    }
    for package in ontology.sorted_packages() {
        for dep in &package.associated_packages {
            graph.add_edge(nodes[&package.id], nodes[dep], ());
        }
    }

    graph
}

/// Record an informational diagnostic for each group of mutually dependent packages
pub fn report_package_cycles(ontology: &mut Ontology) {
    let graph = package_graph(ontology);

    let mut cycles: Vec<Vec<String>> = kosaraju_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            let mut names: Vec<String> = scc
                .into_iter()
                .map(|idx| ontology.packages[graph[idx].0].name.clone())
                .collect();
            names.sort();
            names
        })
        .collect();
    cycles.sort();

    for members in cycles {
        debug!("Package cycle: {}", members.join(", "));
        ontology.diagnostics.package_cycle(&members);
    }
}

impl Ontology {
    /// Packages ordered so that dependencies come first. Members of a
    /// dependency cycle are grouped together in name order.
    pub fn package_order(&self) -> Vec<PackageId> {
        let graph = package_graph(self);

        // tarjan_scc yields components in reverse topological order, which
        // with `needs` edges puts dependencies first.
        tarjan_scc(&graph)
            .into_iter()
            .flat_map(|scc| {
                let mut members: Vec<PackageId> = scc.into_iter().map(|idx| graph[idx]).collect();
                members.sort_by(|a, b| self.package(*a).name.cmp(&self.package(*b).name));
                members
            })
            .collect()
    }
}
