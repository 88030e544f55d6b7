//! Canonical YAML output.
//!
//! Dumped metadata must be stable and diffable: mapping keys are sorted
//! alphabetically at every level, except inside the parameter table,
//! where declared order is meaningful and preserved. Multi-line strings
//! take the emitter's literal block style.

use serde_yaml::{Mapping, Value};

use crate::error::{MetadataError, Result};

fn sort_key(key: &Value) -> String {
    match key.as_str() {
        Some(s) => s.to_string(),
        None => format!("{key:?}"),
    }
}

fn sorted(mapping: &Mapping, canonical: impl Fn(&Value) -> Value) -> Mapping {
    let mut entries: Vec<(&Value, &Value)> = mapping.iter().collect();
    entries.sort_by_key(|(key, _)| sort_key(key));
    entries
        .into_iter()
        .map(|(key, value)| (key.clone(), canonical(value)))
        .collect()
}

/// Recursively sort every mapping in a value by key.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(sorted(mapping, canonicalize)),
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Like [`canonicalize`], but keep the top-level key order of `value`
/// itself (used for the parameter table, where declaration order is
/// meaningful).
fn canonicalize_preserving_order(value: &Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(
            mapping
                .iter()
                .map(|(key, value)| (key.clone(), canonicalize(value)))
                .collect(),
        ),
        other => canonicalize(other),
    }
}

/// Serialize a value as canonical YAML.
pub fn dump_document(value: &Value) -> Result<String> {
    to_yaml(&canonicalize(value))
}

/// Serialize a metadata tree as canonical YAML, preserving the declared
/// order of entries in any top-level `parameters` section.
pub fn dump_metadata(meta: &Mapping) -> Result<String> {
    let mut entries: Vec<(&Value, &Value)> = meta.iter().collect();
    entries.sort_by_key(|(key, _)| sort_key(key));
    let canonical: Mapping = entries
        .into_iter()
        .map(|(key, value)| {
            let value = if key.as_str() == Some("parameters") {
                canonicalize_preserving_order(value)
            } else {
                canonicalize(value)
            };
            (key.clone(), value)
        })
        .collect();
    to_yaml(&Value::Mapping(canonical))
}

fn to_yaml(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).map_err(|source| MetadataError::Yaml { path: None, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_sorted_at_every_level() {
        let value: Value = serde_yaml::from_str("b:\n  z: 1\n  a: 2\na: 3\n").unwrap();
        assert_eq!(dump_document(&value).unwrap(), "a: 3\nb:\n  a: 2\n  z: 1\n");
    }

    #[test]
    fn parameter_order_is_preserved() {
        let meta: Mapping = serde_yaml::from_str(
            "parameters:\n  z_first:\n    value: 1\n  a_second:\n    value: 2\napi:\n  name: Child\n",
        )
        .unwrap();
        let dumped = dump_metadata(&meta).unwrap();
        let api = dumped.find("api:").unwrap();
        let z = dumped.find("z_first").unwrap();
        let a = dumped.find("a_second").unwrap();
        assert!(api < z, "sections are sorted: {dumped}");
        assert!(z < a, "parameter order preserved: {dumped}");
    }

    #[test]
    fn dumping_is_idempotent() {
        let value: Value = serde_yaml::from_str("b: 1\na:\n  d: 2\n  c: 3\n").unwrap();
        let once = dump_document(&value).unwrap();
        let reparsed: Value = serde_yaml::from_str(&once).unwrap();
        assert_eq!(dump_document(&reparsed).unwrap(), once);
    }
}
