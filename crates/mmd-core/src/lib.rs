//! model-metadata - Typed metadata for simulation model components.
//!
//! A model's metadata lives in a directory of YAML documents describing
//! its API surface, descriptive info (authors, license, version), a
//! typed parameter schema with defaults, ranges, and choices, and its
//! run configuration. This crate locates those directories, validates
//! and normalizes their contents, answers dotted-path queries against
//! the aggregated tree, and stages a model's input files with parameter
//! values substituted into its templates.
//!
//! # Example
//!
//! ```rust,no_run
//! use model_metadata::{ModelMetadata, ModelRef, Result};
//!
//! fn main() -> Result<()> {
//!     let path = ModelMetadata::find(&ModelRef::resolve("Child"))?;
//!     let meta = ModelMetadata::from_path(path)?;
//!
//!     println!("{} v{}", meta.name(), meta.info().version().unwrap_or("?"));
//!     for (name, parameter) in meta.parameters() {
//!         println!("{name} = {}", parameter.default());
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod codec;
pub mod error;
pub mod find;
pub mod info;
pub mod install;
pub mod load;
pub mod metadata;
pub mod param;
pub mod registry;
pub mod stage;

// Re-export commonly used types
pub use api::{find, query, stage};
pub use error::{MetadataError, Result};
pub use info::ModelInfo;
pub use install::{install, InstallOptions};
pub use metadata::{ModelMetadata, SECTIONS};
pub use param::{Bounds, Parameter, ParameterError, ParameterValue, Scalar};
pub use registry::{register, ComponentHandle, ModelRef};
pub use stage::FileSystemLoader;
