//! Naming
//!
//! Maps ontology names onto generated identifiers and file locations.
//! Backends never build a path or an identifier by hand; they come here so
//! that every backend agrees on where a package module lives and what its
//! classes are called.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::ontology::Ontology;

/// Python reserved words that cannot be used as identifiers
const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

pub fn is_python_keyword(s: &str) -> bool {
    PYTHON_KEYWORDS.contains(&s)
}

/// `cim_party` -> `CimParty`
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' || c == '.' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// `CimParty` -> `cim_party`
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' || c == ' ' || c == '.' {
            result.push('_');
            prev_lower = false;
        } else {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }

    result
}

/// Enum member identifier: upper snake case, always a legal identifier
pub fn to_constant_case(s: &str) -> String {
    let mut result: String = to_snake_case(s)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if result.is_empty() || result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    result
}

/// Constant-case names for a list of members, in order. A name already
/// taken gets the first free `_<n>` suffix, starting at 2.
pub fn unique_constants<'a>(members: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    members
        .into_iter()
        .map(|member| {
            let base = to_constant_case(member);
            let mut name = base.clone();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{}_{}", base, n);
                n += 1;
            }
            name
        })
        .collect()
}

/// Attribute name safe to emit in Python
pub fn python_identifier(s: &str) -> String {
    let mut name = to_snake_case(s);
    if is_python_keyword(&name) {
        name.push('_');
    }
    name
}

/// Class name as emitted
pub fn class_name(name: &str) -> String {
    to_pascal_case(name)
}

/// `1.2` -> `v1_2`
pub fn version_dir(version: &str) -> String {
    format!("v{}", version.replace('.', "_"))
}

/// Output directory of an ontology, relative to the writer root
pub fn ontology_dir(ontology: &Ontology) -> PathBuf {
    PathBuf::from(to_snake_case(&ontology.name)).join(version_dir(&ontology.version))
}

/// Module name of a package for a given backend (`fruit_typeset`)
pub fn package_module(package: &str, suffix: &str) -> String {
    format!("{}_{}", to_snake_case(package), suffix)
}

/// File name of a package module (`fruit_typeset.py`)
pub fn package_file(package: &str, suffix: &str) -> String {
    format!("{}.py", package_module(package, suffix))
}
