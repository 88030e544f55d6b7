//! Descriptive metadata for a model.
//!
//! The `info` section of a model's metadata carries who wrote it, how to
//! cite it, and where it lives. Author names are normalized to
//! `"First Last"`, contact and reference fields are validated against
//! email/URL/DOI patterns, and version strings that do not parse as a
//! semantic version produce a warning but never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::error::{MetadataError, Result};
use crate::param::Scalar;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").unwrap());

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\(\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .unwrap()
});

static DOI_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^10\.[0-9]{4,}(?:\.[0-9]+)*/[^\s"&'<>]+"#).unwrap());

/// Keys that older metadata carried in the info section but that are no
/// longer supported.
const DEPRECATED_KEYS: &[&str] = &["initialize_args", "class", "id"];

/// Normalize a list of author names to `"First Last"`.
///
/// A single string is first split on `" and "`. Each resulting name that
/// looks like `"Last, First"` (exactly one comma) is flipped; anything
/// else is left unchanged.
///
/// # Examples
///
/// ```
/// use model_metadata::info::norm_authors;
///
/// assert_eq!(norm_authors(&["Darwin, Charles".to_string()]), ["Charles Darwin"]);
/// assert_eq!(
///     norm_authors(&["Mary Anning".to_string(), "Lyell, Charles".to_string()]),
///     ["Mary Anning", "Charles Lyell"]
/// );
/// ```
pub fn norm_authors(authors: &[String]) -> Vec<String> {
    authors
        .iter()
        .flat_map(|author| author.split(" and "))
        .map(|author| {
            let parts: Vec<&str> = author.split(',').collect();
            if parts.len() == 2 {
                format!("{} {}", parts[1].trim(), parts[0].trim())
            } else {
                author.to_string()
            }
        })
        .collect()
}

fn validate_email(email: &str) -> Result<()> {
    if EMAIL_REGEX.is_match(email) {
        Ok(())
    } else {
        Err(MetadataError::InvalidInfo {
            field: "email".to_string(),
            message: format!("{email}: invalid email address"),
        })
    }
}

fn validate_url(url: &str) -> Result<()> {
    if URL_REGEX.is_match(url) {
        Ok(())
    } else {
        Err(MetadataError::InvalidInfo {
            field: "url".to_string(),
            message: format!("{url}: invalid URL"),
        })
    }
}

fn validate_doi(doi: &str) -> Result<()> {
    if DOI_REGEX.is_match(doi) {
        Ok(())
    } else {
        Err(MetadataError::InvalidInfo {
            field: "doi".to_string(),
            message: format!("{doi}: invalid DOI"),
        })
    }
}

/// Warn (never fail) if a version string is not a semantic version.
fn validate_version(version: &str) {
    if semver::Version::parse(version).is_err() {
        warn!("{version}: version string is not a semantic version");
    }
}

/// Information about a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelInfo {
    name: String,
    authors: Vec<String>,
    email: Option<String>,
    version: Option<String>,
    license: Option<String>,
    doi: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    cite_as: Vec<String>,
}

impl ModelInfo {
    /// Build info from the raw `info` section of a metadata document.
    ///
    /// Deprecated keys are discarded with a warning; a missing `name`
    /// defaults to `"?"`; email/URL/DOI values must match their
    /// patterns; a version that is not a semantic version only warns.
    pub fn from_document(doc: &Value) -> Result<ModelInfo> {
        let empty = Mapping::new();
        let doc = match doc {
            Value::Mapping(m) => m,
            Value::Null => &empty,
            other => {
                return Err(MetadataError::InvalidInfo {
                    field: "info".to_string(),
                    message: format!("not a mapping ({other:?})"),
                })
            }
        };

        let mut info = ModelInfo {
            name: "?".to_string(),
            ..ModelInfo::default()
        };

        for (key, value) in doc {
            let Some(key) = key.as_str() else {
                return Err(MetadataError::InvalidInfo {
                    field: format!("{key:?}"),
                    message: "info keys must be strings".to_string(),
                });
            };
            if DEPRECATED_KEYS.contains(&key) {
                warn!("ignoring '{key}' in info section");
                continue;
            }
            match key {
                "name" => info.name = string_field(key, value)?,
                "author" | "authors" => info.authors = norm_authors(&string_list(key, value)?),
                "email" => {
                    let email = string_field(key, value)?;
                    if !email.is_empty() {
                        validate_email(&email)?;
                        info.email = Some(email);
                    }
                }
                "version" => {
                    let version = scalar_field(key, value)?;
                    if !version.is_empty() {
                        validate_version(&version);
                        info.version = Some(version);
                    }
                }
                "license" => info.license = Some(string_field(key, value)?),
                "doi" => {
                    let doi = string_field(key, value)?;
                    if !doi.is_empty() {
                        validate_doi(&doi)?;
                        info.doi = Some(doi);
                    }
                }
                "url" => {
                    let url = string_field(key, value)?;
                    if !url.is_empty() {
                        validate_url(&url)?;
                        info.url = Some(url);
                    }
                }
                "summary" => info.summary = Some(string_field(key, value)?),
                "cite_as" => info.cite_as = string_list(key, value)?,
                _ => {
                    return Err(MetadataError::InvalidInfo {
                        field: key.to_string(),
                        message: "unrecognized info key".to_string(),
                    })
                }
            }
        }

        Ok(info)
    }

    /// Normalize a raw info section to its canonical document form.
    pub fn norm(doc: &Value) -> Result<Value> {
        Ok(ModelInfo::from_document(doc)?.as_document())
    }

    /// The canonical document form: every field present, unset ones null.
    pub fn as_document(&self) -> Value {
        let mut doc = Mapping::new();
        doc.insert(
            "authors".into(),
            Value::Sequence(self.authors.iter().map(|a| a.as_str().into()).collect()),
        );
        doc.insert(
            "cite_as".into(),
            Value::Sequence(self.cite_as.iter().map(|c| c.as_str().into()).collect()),
        );
        doc.insert("doi".into(), optional(&self.doi));
        doc.insert("email".into(), optional(&self.email));
        doc.insert("license".into(), optional(&self.license));
        doc.insert("name".into(), self.name.as_str().into());
        doc.insert("summary".into(), optional(&self.summary));
        doc.insert("url".into(), optional(&self.url));
        doc.insert("version".into(), optional(&self.version));
        Value::Mapping(doc)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn license(&self) -> Option<&str> {
        self.license.as_deref()
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn cite_as(&self) -> &[String] {
        &self.cite_as
    }
}

fn optional(value: &Option<String>) -> Value {
    match value {
        Some(s) => s.as_str().into(),
        None => Value::Null,
    }
}

fn string_field(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MetadataError::InvalidInfo {
            field: key.to_string(),
            message: "not a string".to_string(),
        })
}

/// A scalar coerced to its string form (versions may be bare numbers).
fn scalar_field(key: &str, value: &Value) -> Result<String> {
    Scalar::from_value(value)
        .map(|s| s.to_string())
        .ok_or_else(|| MetadataError::InvalidInfo {
            field: key.to_string(),
            message: "not a scalar".to_string(),
        })
}

/// A string (coerced to a one-element list) or a sequence of strings.
fn string_list(key: &str, value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| string_field(key, v))
            .collect(),
        _ => Err(MetadataError::InvalidInfo {
            field: key.to_string(),
            message: "not a string or list of strings".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(yaml: &str) -> Result<ModelInfo> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        ModelInfo::from_document(&doc)
    }

    #[test]
    fn authors_flip_last_first() {
        assert_eq!(norm_authors(&["Darwin, Charles".to_string()]), ["Charles Darwin"]);
    }

    #[test]
    fn authors_split_on_and() {
        assert_eq!(
            norm_authors(&["Mary Anning and Lyell, Charles".to_string()]),
            ["Mary Anning", "Charles Lyell"]
        );
    }

    #[test]
    fn authors_already_normalized_pass_through() {
        let authors = vec![
            "Mary Anning".to_string(),
            "Charles Lyell".to_string(),
            "Darwin, Charles".to_string(),
        ];
        assert_eq!(
            norm_authors(&authors),
            ["Mary Anning", "Charles Lyell", "Charles Darwin"]
        );
    }

    #[test]
    fn two_commas_left_unchanged() {
        assert_eq!(
            norm_authors(&["Darwin, Charles, FRS".to_string()]),
            ["Darwin, Charles, FRS"]
        );
    }

    #[test]
    fn name_defaults_to_question_mark() {
        let info = info("version: '1.0.0'").unwrap();
        assert_eq!(info.name(), "?");
    }

    #[test]
    fn bad_email_is_rejected() {
        let err = info("email: eric.hutton@colorado").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidInfo { .. }));
        assert!(info("email: eric.hutton@colorado.edu").is_ok());
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(info("url: not-a-url").is_err());
        assert!(info("url: https://csdms.colorado.edu").is_ok());
    }

    #[test]
    fn bad_doi_is_rejected() {
        assert!(info("doi: not-a-doi").is_err());
        assert!(info("doi: 10.1594/IEDA/100161").is_ok());
    }

    #[test]
    fn odd_version_warns_but_loads() {
        let info = info("version: '10.6'").unwrap();
        assert_eq!(info.version(), Some("10.6"));
    }

    #[test]
    fn numeric_version_is_coerced_to_a_string() {
        let info = info("version: 10.6").unwrap();
        assert_eq!(info.version(), Some("10.6"));
    }

    #[test]
    fn deprecated_keys_are_dropped() {
        let doc: Value = serde_yaml::from_str("name: Child\nclass: Child\nid: child").unwrap();
        let normed = ModelInfo::norm(&doc).unwrap();
        assert!(normed.get("class").is_none());
        assert!(normed.get("id").is_none());
        assert_eq!(normed.get("name").and_then(Value::as_str), Some("Child"));
    }

    #[test]
    fn unrecognized_keys_are_errors() {
        assert!(info("favorite_color: blue").is_err());
    }

    #[test]
    fn cite_as_string_becomes_one_element_list() {
        let info = info("cite_as: 'Hutton et al., 2014'").unwrap();
        assert_eq!(info.cite_as(), ["Hutton et al., 2014"]);
    }

    #[test]
    fn non_string_license_is_rejected() {
        assert!(info("license: 2014").is_err());
    }
}
