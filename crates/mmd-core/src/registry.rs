//! Model references and the component registry.
//!
//! A model can be referred to by a filesystem path, a plain name, or an
//! entry point of the form `"module:ClassName"`. Entry points resolve
//! against a process-wide registry of [`ComponentHandle`]s; resolution
//! failure is recoverable and falls back to treating the reference as a
//! plain name.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{MetadataError, Result};

/// A registered model component: the capability handle an entry point
/// resolves to.
#[derive(Debug, Clone)]
pub struct ComponentHandle {
    module: String,
    name: String,
    metadata: Option<PathBuf>,
    install_dir: Option<PathBuf>,
}

impl ComponentHandle {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        ComponentHandle {
            module: module.into(),
            name: name.into(),
            metadata: None,
            install_dir: None,
        }
    }

    /// Where the component's metadata lives: either absolute, or
    /// relative to the component's install directory.
    pub fn with_metadata(mut self, metadata: impl Into<PathBuf>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    /// The directory the component's module is installed under.
    pub fn with_install_dir(mut self, install_dir: impl Into<PathBuf>) -> Self {
        self.install_dir = Some(install_dir.into());
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> Option<&Path> {
        self.metadata.as_deref()
    }

    pub fn install_dir(&self) -> Option<&Path> {
        self.install_dir.as_deref()
    }

    /// The `"module:Name"` form this handle is registered under.
    pub fn entry_point(&self) -> String {
        format!("{}:{}", self.module, self.name)
    }
}

fn registry() -> &'static RwLock<HashMap<String, Arc<ComponentHandle>>> {
    static REGISTRY: OnceLock<RwLock<HashMap<String, Arc<ComponentHandle>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a component, making its entry point resolvable. The last
/// registration under an entry point wins.
pub fn register(handle: ComponentHandle) -> Arc<ComponentHandle> {
    let handle = Arc::new(handle);
    registry()
        .write()
        .expect("component registry lock poisoned")
        .insert(handle.entry_point(), handle.clone());
    handle
}

/// Look up a component by module and name.
pub fn load_component(module: &str, name: &str) -> Result<Arc<ComponentHandle>> {
    let entry_point = format!("{module}:{name}");
    registry()
        .read()
        .expect("component registry lock poisoned")
        .get(&entry_point)
        .cloned()
        .ok_or(MetadataError::UnknownComponent { entry_point })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Split and validate a `"module:ClassName"` entry point.
///
/// The module part is one or more dot-separated identifiers; the class
/// part is a single identifier.
pub fn parse_entry_point(entry_point: &str) -> Result<(String, String)> {
    let bad = |reason: &str| MetadataError::BadEntryPoint {
        entry_point: entry_point.to_string(),
        reason: reason.to_string(),
    };

    let mut parts = entry_point.splitn(2, ':');
    let module = parts.next().unwrap_or_default();
    let name = parts.next().ok_or_else(|| bad("expected 'module:Name'"))?;

    if name.contains(':') {
        return Err(bad("expected a single ':'"));
    }
    if module.is_empty() || module.split('.').any(|part| !is_identifier(part)) {
        return Err(bad(&format!("invalid module name ({module})")));
    }
    if !is_identifier(name) {
        return Err(bad(&format!("invalid class name ({name})")));
    }

    Ok((module.to_string(), name.to_string()))
}

/// A reference to a model: a path, a plain name, or a resolved component.
#[derive(Debug, Clone)]
pub enum ModelRef {
    Path(PathBuf),
    Name(String),
    Component(Arc<ComponentHandle>),
}

impl ModelRef {
    /// Normalize a string reference. A string containing a colon is
    /// tried as an entry point first; if it does not parse or nothing
    /// is registered under it, the literal string is kept as a name.
    pub fn resolve(model: &str) -> ModelRef {
        if model.contains(':') {
            if let Ok((module, name)) = parse_entry_point(model) {
                if let Ok(handle) = load_component(&module, &name) {
                    return ModelRef::Component(handle);
                }
            }
        }
        ModelRef::Name(model.to_string())
    }

    /// The name used for name-based search candidates.
    pub fn name(&self) -> PathBuf {
        match self {
            ModelRef::Path(path) => path.clone(),
            ModelRef::Name(name) => PathBuf::from(name),
            ModelRef::Component(handle) => PathBuf::from(handle.name()),
        }
    }
}

impl From<&str> for ModelRef {
    fn from(model: &str) -> Self {
        ModelRef::resolve(model)
    }
}

impl From<&Path> for ModelRef {
    fn from(path: &Path) -> Self {
        ModelRef::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for ModelRef {
    fn from(path: PathBuf) -> Self {
        ModelRef::Path(path)
    }
}

impl From<Arc<ComponentHandle>> for ModelRef {
    fn from(handle: Arc<ComponentHandle>) -> Self {
        ModelRef::Component(handle)
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelRef::Path(path) => write!(f, "{}", path.display()),
            ModelRef::Name(name) => f.write_str(name),
            ModelRef::Component(handle) => f.write_str(&handle.entry_point()),
        }
    }
}
