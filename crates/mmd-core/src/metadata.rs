//! The metadata aggregate for one model.
//!
//! A [`ModelMetadata`] is built once from a metadata directory and is
//! read-only afterward: the four sections are loaded, normalized, and
//! validated up front, and construction either yields a fully valid
//! aggregate or fails.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::codec;
use crate::error::{MetadataError, Result};
use crate::find::{find_metadata, find_metadata_files};
use crate::info::ModelInfo;
use crate::load::load_section;
use crate::param::{Parameter, Scalar};
use crate::registry::ModelRef;

/// The fixed, ordered set of metadata sections.
pub const SECTIONS: [&str; 4] = ["api", "info", "parameters", "run"];

/// All metadata for one model, aggregated from its metadata directory.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    path: PathBuf,
    info: ModelInfo,
    params: IndexMap<String, Parameter>,
    meta: Mapping,
}

impl ModelMetadata {
    /// Load and validate the metadata found in `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<ModelMetadata> {
        let path = std::path::absolute(path.as_ref())
            .map_err(|err| MetadataError::io("failed to resolve metadata directory", path.as_ref(), err))?;
        find_metadata_files(&path)?;

        let api = load_section(&path, "api")?;
        let mut info_doc = load_section(&path, "info")?;
        let params_doc = load_section(&path, "parameters")?;
        let run_doc = load_section(&path, "run")?;

        if !info_doc.contains_key("name") {
            let name = api.get("name").cloned().ok_or(MetadataError::MissingValue {
                name: "api.name".to_string(),
            })?;
            info_doc.insert("name".into(), name);
        }
        let info = ModelInfo::from_document(&Value::Mapping(info_doc))?;
        let run = normalize_run_section(&run_doc);

        let mut params = IndexMap::new();
        for (key, doc) in &params_doc {
            let name = key.as_str().ok_or_else(|| MetadataError::BadDocument {
                path: path.clone(),
                message: format!("parameter names must be strings ({key:?})"),
            })?;
            if name.starts_with('_') {
                warn!("{name}: ignoring private attribute in parameters section");
                continue;
            }
            let param = Parameter::from_document(doc).map_err(|source| {
                MetadataError::BadParameter {
                    name: name.to_string(),
                    source,
                }
            })?;
            params.insert(name.to_string(), param);
        }

        let mut meta = Mapping::new();
        meta.insert("api".into(), Value::Mapping(api));
        meta.insert("info".into(), info.as_document());
        meta.insert(
            "parameters".into(),
            Value::Mapping(
                params
                    .iter()
                    .map(|(name, param)| (name.as_str().into(), param.as_document()))
                    .collect(),
            ),
        );
        meta.insert("run".into(), Value::Mapping(run));

        Ok(ModelMetadata {
            path,
            info,
            params,
            meta,
        })
    }

    /// Find a model's metadata directory and load it.
    pub fn from_ref(model: &ModelRef) -> Result<ModelMetadata> {
        ModelMetadata::from_path(ModelMetadata::find(model)?)
    }

    /// Attempt to find a model's metadata directory.
    pub fn find(model: &ModelRef) -> Result<PathBuf> {
        find_metadata(model)
    }

    /// Get a metadata value with dotted notation, e.g.
    /// `"run.config_file.path"`.
    ///
    /// A key absent at its final segment is a missing value; absent
    /// earlier, a missing section. Descending into a non-mapping is a
    /// missing value. Either error names the dotted path walked so far.
    pub fn get(&self, key: &str) -> Result<&Value> {
        let names: Vec<&str> = key.split('.').collect();
        let mut walked = String::new();
        let mut value: Option<&Value> = None;

        for (i, name) in names.iter().enumerate() {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(name);

            let container = match value {
                None => &self.meta,
                Some(Value::Mapping(mapping)) => mapping,
                Some(_) => return Err(MetadataError::MissingValue { name: walked }),
            };
            match container.get(*name) {
                Some(next) => value = Some(next),
                None if i + 1 == names.len() => {
                    return Err(MetadataError::MissingValue { name: walked })
                }
                None => return Err(MetadataError::MissingSection { name: walked }),
            }
        }

        Ok(value.expect("dotted key has at least one segment"))
    }

    /// The metadata directory this aggregate was loaded from.
    pub fn base(&self) -> &Path {
        &self.path
    }

    /// The model's name, from the normalized info section.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// The freeform `api` section.
    pub fn api(&self) -> &Mapping {
        match self.meta.get("api") {
            Some(Value::Mapping(mapping)) => mapping,
            _ => unreachable!("api section is always a mapping"),
        }
    }

    /// The normalized info section.
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// The validated parameter table, in declared order.
    pub fn parameters(&self) -> &IndexMap<String, Parameter> {
        &self.params
    }

    /// The normalized `run` section.
    pub fn run(&self) -> &Mapping {
        match self.meta.get("run") {
            Some(Value::Mapping(mapping)) => mapping,
            _ => unreachable!("run section is always a mapping"),
        }
    }

    /// The whole aggregated tree.
    pub fn meta(&self) -> &Mapping {
        &self.meta
    }

    /// Default values for every declared parameter, in declared order.
    pub fn default_parameters(&self) -> IndexMap<String, Scalar> {
        self.params
            .iter()
            .map(|(name, param)| (name.clone(), param.default()))
            .collect()
    }

    /// Serialize the whole tree as canonical YAML.
    pub fn dump(&self) -> Result<String> {
        codec::dump_metadata(&self.meta)
    }

    /// Serialize one section (wrapped under its name) as canonical YAML;
    /// an unknown section dumps as empty.
    pub fn dump_section(&self, section: &str) -> Result<String> {
        let mut wrapped = Mapping::new();
        wrapped.insert(
            section.into(),
            self.meta
                .get(section)
                .cloned()
                .unwrap_or(Value::Mapping(Mapping::new())),
        );
        codec::dump_metadata(&wrapped)
    }
}

/// Normalize the raw `run` section to
/// `{config_file: {path: ..., contents: ...}}` with unset fields null.
///
/// The raw `config_file` may be a bare string (taken as the path) or a
/// mapping with `path` and/or `contents` keys.
pub fn normalize_run_section(run: &Mapping) -> Mapping {
    let mut path = Value::Null;
    let mut contents = Value::Null;

    match run.get("config_file") {
        Some(Value::String(s)) => path = Value::String(s.clone()),
        Some(Value::Mapping(mapping)) => {
            path = mapping.get("path").cloned().unwrap_or(Value::Null);
            contents = mapping.get("contents").cloned().unwrap_or(Value::Null);
        }
        _ => {}
    }

    let mut config_file = Mapping::new();
    config_file.insert("path".into(), path);
    config_file.insert("contents".into(), contents);

    let mut normed = Mapping::new();
    normed.insert("config_file".into(), Value::Mapping(config_file));
    normed
}
