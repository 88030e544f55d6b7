//! Locating a model's metadata on disk.
//!
//! Covers both halves of resolution: which files inside a directory are
//! metadata files, and which directories to try for a given model
//! reference.

use std::env;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::{MetadataError, Result};
use crate::registry::ModelRef;

/// File names recognized as model metadata.
const METADATA_FILES: &[&str] = &[
    "api.yaml",
    "api.yml",
    "parameters.yaml",
    "parameters.yml",
    "info.yaml",
    "info.yml",
    "wmt.yaml",
    "wmt.yml",
    "run.yaml",
    "run.yml",
    "meta.yaml",
    "meta.yml",
];

/// Check if a file is a model metadata file.
pub fn is_metadata_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| METADATA_FILES.contains(&name))
}

/// Find all metadata files within a directory.
///
/// Fails with a not-found error if the directory holds none of the
/// recognized file names.
pub fn find_metadata_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let found: Vec<PathBuf> = METADATA_FILES
        .iter()
        .map(|fname| dir.join(fname))
        .filter(|path| path.is_file())
        .collect();

    if found.is_empty() {
        Err(MetadataError::NotFound {
            model: dir.display().to_string(),
        })
    } else {
        Ok(found)
    }
}

/// Find a model's data files: every non-metadata file under the
/// directory, as paths relative to it, in a stable order.
pub fn find_model_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| MetadataError::Io {
            message: format!("failed to walk {}", dir.display()),
            path: Some(dir.to_path_buf()),
            source: err.into_io_error(),
        })?;
        if !entry.file_type().is_file() || is_metadata_file(entry.path()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .expect("walked path is under its root")
            .to_path_buf();
        files.push(relative);
    }
    Ok(files)
}

/// The lowest-priority search location, `<prefix>/share/csdms`.
///
/// The prefix is `$MMD_PREFIX` if set, else `$CONDA_PREFIX`, else
/// `/usr/local`.
pub fn share_dir() -> PathBuf {
    let prefix = env::var_os("MMD_PREFIX")
        .or_else(|| env::var_os("CONDA_PREFIX"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local"));
    prefix.join("share").join("csdms")
}

/// Candidate directories to search for a model's metadata, highest
/// priority first.
///
/// A resolved component contributes its metadata path first (absolute
/// paths verbatim, relative ones anchored at the component's install
/// directory). The reference's literal name is next, and
/// `share_dir()/<name>` is the final fallback.
pub fn search_paths(model: &ModelRef) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let ModelRef::Component(handle) = model {
        if let Some(metadata) = handle.metadata() {
            if metadata.is_absolute() {
                paths.push(metadata.to_path_buf());
            } else if let Some(install_dir) = handle.install_dir() {
                paths.push(install_dir.join(metadata));
            } else {
                warn!(
                    "{}: component has a relative metadata path but no install directory",
                    handle.entry_point()
                );
            }
        }
    }

    let name = model.name();
    paths.push(name.clone());
    paths.push(share_dir().join(name));

    paths
}

/// Attempt to find a model's metadata directory: the first search
/// candidate that is an existing directory.
pub fn find_metadata(model: &ModelRef) -> Result<PathBuf> {
    search_paths(model)
        .into_iter()
        .find(|path| path.is_dir())
        .ok_or_else(|| MetadataError::NotFound {
            model: model.to_string(),
        })
}
