//! Loading metadata sections from YAML documents.
//!
//! A section may live in a combined `meta.yaml` under its own top-level
//! key, or in a file of its own (`api.yaml`, `info.yaml`, ...). Sections
//! are optional: a missing file or key yields an empty mapping, never an
//! error. Malformed YAML does error.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{MetadataError, Result};

/// Read a YAML file, merging multiple documents with later-document-wins
/// key overwrite. Returns `None` if the file does not exist or is empty.
pub fn load_yaml_file(path: &Path) -> Result<Option<Mapping>> {
    if !path.is_file() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .map_err(|err| MetadataError::io("failed to read metadata file", path, err))?;
    if contents.trim().is_empty() {
        return Ok(None);
    }

    let mut merged = Mapping::new();
    for document in serde_yaml::Deserializer::from_str(&contents) {
        let value = Value::deserialize(document).map_err(|source| MetadataError::Yaml {
            path: Some(path.to_path_buf()),
            source,
        })?;
        match value {
            Value::Mapping(mapping) => {
                for (key, value) in mapping {
                    merged.insert(key, value);
                }
            }
            Value::Null => {}
            _ => {
                return Err(MetadataError::BadDocument {
                    path: path.to_path_buf(),
                    message: "top-level document is not a mapping".to_string(),
                })
            }
        }
    }

    Ok(Some(merged))
}

/// Load one named section from a metadata directory.
///
/// A combined `meta.yaml` (or `meta.yml`) that defines the section key
/// wins; otherwise `{section}.yaml`/`{section}.yml` is read whole. A
/// section found in neither place is an empty mapping.
pub fn load_section(dir: &Path, section: &str) -> Result<Mapping> {
    for fname in ["meta.yaml", "meta.yml"] {
        if let Some(meta) = load_yaml_file(&dir.join(fname))? {
            if let Some(value) = meta.get(section) {
                return match value {
                    Value::Mapping(mapping) => Ok(mapping.clone()),
                    Value::Null => Ok(Mapping::new()),
                    _ => Err(MetadataError::BadDocument {
                        path: dir.join(fname),
                        message: format!("'{section}' section is not a mapping"),
                    }),
                };
            }
        }
    }

    for fname in [format!("{section}.yaml"), format!("{section}.yml")] {
        if let Some(mapping) = load_yaml_file(&dir.join(fname))? {
            return Ok(mapping);
        }
    }

    Ok(Mapping::new())
}
