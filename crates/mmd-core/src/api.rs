//! The public operations: find, query, and stage.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::{MetadataError, Result};
use crate::metadata::ModelMetadata;
use crate::param::Scalar;
use crate::registry::ModelRef;
use crate::stage::FileSystemLoader;

/// Attempt to find a model's metadata directory.
pub fn find(model: &ModelRef) -> Result<PathBuf> {
    ModelMetadata::find(model)
}

/// Query metadata for a particular variable (or whole section).
///
/// `var` is given in dotted notation: `"info.url"` for the *url* value
/// of the *info* section, or just `"info"` for the whole section.
pub fn query(model: &ModelRef, var: &str) -> Result<Value> {
    let path = ModelMetadata::find(model)?;
    Ok(ModelMetadata::from_path(path)?.get(var)?.clone())
}

/// Stage a model by setting up its input files in `dest`.
///
/// Template placeholders are filled with each parameter's default,
/// overridden by `parameters` where given. Override keys that are not
/// declared parameters fail before anything is written.
///
/// Returns the manifest of relative paths staged.
pub fn stage(
    model: &ModelRef,
    dest: impl AsRef<std::path::Path>,
    parameters: Option<&IndexMap<String, Scalar>>,
) -> Result<Vec<PathBuf>> {
    let path = ModelMetadata::find(model)?;
    let meta = ModelMetadata::from_path(&path)?;

    let mut defaults = meta.default_parameters();
    if let Some(parameters) = parameters {
        check_for_unknown_keys(&defaults, parameters)?;
        for (name, value) in parameters {
            defaults.insert(name.clone(), value.clone());
        }
    }

    FileSystemLoader::new(&path)?.stage_all(dest, &defaults)
}

fn check_for_unknown_keys(
    allowed: &IndexMap<String, Scalar>,
    user: &IndexMap<String, Scalar>,
) -> Result<()> {
    let mut unknown: Vec<String> = user
        .keys()
        .filter(|key| !allowed.contains_key(*key))
        .cloned()
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    unknown.sort();

    let mut valid: Vec<String> = allowed.keys().cloned().collect();
    valid.sort();

    Err(MetadataError::UnknownKeys {
        keys: unknown,
        valid,
    })
}
