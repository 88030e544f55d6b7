//! Typed model parameters.
//!
//! A parameter is a named, typed, configurable input with a default value.
//! Parameters are loaded from untyped YAML documents (either a bare scalar
//! default or a `value:` mapping with declared type and constraints),
//! validated at construction, and serialized back to the same document
//! shape. The variant set is closed: string, int, float, choice, file,
//! and boolean.

use std::fmt;

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::warn;

/// Errors raised while constructing a parameter from a document.
#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("{dtype}: unknown parameter type")]
    UnknownType { dtype: String },

    #[error("value is missing a default")]
    MissingDefault,

    #[error("value is not a scalar ({value})")]
    NotAScalar { value: String },

    #[error("value is not a number ({value})")]
    NotANumber { value: String },

    #[error("value must be either an int or a string that can be converted to an int ({value})")]
    NotAnInt { value: String },

    #[error("value is below lower bound ({value} < {bound})")]
    BelowLowerBound { value: String, bound: String },

    #[error("value is above upper bound ({value} > {bound})")]
    AboveUpperBound { value: String, bound: String },

    #[error("value is not contained in choices ({value})")]
    NotAChoice { value: String },

    #[error("range must be (min, max)")]
    BadRange,
}

/// A typed scalar value as found in a parameter document.
#[derive(Debug, Clone)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Convert a YAML value to a scalar, if it is one.
    pub fn from_value(value: &Value) -> Option<Scalar> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Scalar::Int(i))
                } else {
                    n.as_f64().map(Scalar::Float)
                }
            }
            Value::String(s) => Some(Scalar::Str(s.clone())),
            _ => None,
        }
    }

    /// Convert back to a YAML value.
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => Value::from(*f),
            Scalar::Str(s) => Value::String(s.clone()),
        }
    }

    /// Coerce to an integer. Floats are truncated with a warning; strings
    /// must parse as an integer.
    fn as_int(&self) -> Result<i64, ParameterError> {
        match self {
            Scalar::Int(i) => Ok(*i),
            Scalar::Float(f) => {
                let truncated = *f as i64;
                warn!(
                    "{f}: floating point number passed as an integer parameter, \
                     value will be truncated to {truncated}"
                );
                Ok(truncated)
            }
            Scalar::Str(s) => s.trim().parse::<i64>().map_err(|_| ParameterError::NotAnInt {
                value: s.clone(),
            }),
            Scalar::Bool(_) => Err(ParameterError::NotAnInt {
                value: self.to_string(),
            }),
        }
    }

    /// Coerce to a float. Integers widen; strings must parse as a number.
    fn as_float(&self) -> Result<f64, ParameterError> {
        match self {
            Scalar::Float(f) => Ok(*f),
            Scalar::Int(i) => Ok(*i as f64),
            Scalar::Str(s) => s.trim().parse::<f64>().map_err(|_| ParameterError::NotANumber {
                value: s.clone(),
            }),
            Scalar::Bool(_) => Err(ParameterError::NotANumber {
                value: self.to_string(),
            }),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a == b,
            // Numeric cross-type comparison: 1 == 1.0
            (Scalar::Int(a), Scalar::Float(b)) | (Scalar::Float(b), Scalar::Int(a)) => {
                *a as f64 == *b
            }
            (Scalar::Str(a), Scalar::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// Infer the type token of a scalar that carries no declared type.
///
/// Strings are tried as an int, then a float; the exact literals `"True"`
/// and `"False"` are booleans; everything else is a string.
pub fn infer_type(value: &Scalar) -> &'static str {
    match value {
        Scalar::Bool(_) => "bool",
        Scalar::Int(_) => "int",
        Scalar::Float(_) => "float",
        Scalar::Str(s) => {
            if s.trim().parse::<i64>().is_ok() {
                "int"
            } else if s.trim().parse::<f64>().is_ok() {
                "float"
            } else if s == "True" || s == "False" {
                "bool"
            } else {
                "str"
            }
        }
    }
}

/// Inclusive bounds on a numeric parameter; either side may be unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Bounds {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Copy + fmt::Display> Bounds<T> {
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Check that `value` lies within the bounds.
    pub fn check(&self, value: T) -> Result<(), ParameterError> {
        if let Some(min) = self.min {
            if value < min {
                return Err(ParameterError::BelowLowerBound {
                    value: value.to_string(),
                    bound: min.to_string(),
                });
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ParameterError::AboveUpperBound {
                    value: value.to_string(),
                    bound: max.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// The typed value of a parameter, one variant per declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Str {
        default: String,
    },
    Int {
        default: i64,
        units: Option<String>,
        range: Bounds<i64>,
    },
    Float {
        default: f64,
        units: Option<String>,
        range: Bounds<f64>,
    },
    Choice {
        default: Scalar,
        choices: Vec<Scalar>,
    },
    File {
        default: String,
        files: Vec<String>,
    },
    Bool {
        default: Scalar,
        true_value: Scalar,
        false_value: Scalar,
    },
}

impl ParameterValue {
    /// The canonical type token for this variant.
    pub fn type_token(&self) -> &'static str {
        match self {
            ParameterValue::Str { .. } => "str",
            ParameterValue::Int { .. } => "int",
            ParameterValue::Float { .. } => "float",
            ParameterValue::Choice { .. } => "choice",
            ParameterValue::File { .. } => "file",
            ParameterValue::Bool { .. } => "bool",
        }
    }

    /// The default value as a scalar.
    pub fn default(&self) -> Scalar {
        match self {
            ParameterValue::Str { default } => Scalar::Str(default.clone()),
            ParameterValue::Int { default, .. } => Scalar::Int(*default),
            ParameterValue::Float { default, .. } => Scalar::Float(*default),
            ParameterValue::Choice { default, .. } => default.clone(),
            ParameterValue::File { default, .. } => Scalar::Str(default.clone()),
            ParameterValue::Bool { default, .. } => default.clone(),
        }
    }
}

/// A single named, typed, configurable model input.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    description: Option<String>,
    value: ParameterValue,
}

impl Parameter {
    /// Build a parameter from its YAML document.
    ///
    /// Two shapes are accepted: `value` as a mapping with a required
    /// `default` plus optional `type`, `units`, `range`, `choices`,
    /// `files`, and `true_value`/`false_value`; or `value` as a bare
    /// scalar default with the type inferred.
    pub fn from_document(doc: &Value) -> Result<Parameter, ParameterError> {
        let description = doc
            .get("description")
            .or_else(|| doc.get("desc"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let value = doc.get("value").ok_or(ParameterError::MissingDefault)?;

        let (default, attrs) = match value {
            Value::Mapping(attrs) => {
                let default = value.get("default").ok_or(ParameterError::MissingDefault)?;
                (default, Some(attrs))
            }
            _ => (value, None),
        };
        let default = Scalar::from_value(default).ok_or_else(|| ParameterError::NotAScalar {
            value: format!("{default:?}"),
        })?;

        let declared = attrs
            .and_then(|m| m.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let dtype = match declared {
            Some(dtype) => dtype,
            None => match attrs {
                Some(m) if m.contains_key("choices") => "choice".to_string(),
                Some(m) if m.contains_key("files") => "file".to_string(),
                Some(m) if m.contains_key("true_value") || m.contains_key("false_value") => {
                    "bool".to_string()
                }
                _ => infer_type(&default).to_string(),
            },
        };

        let value = match dtype.as_str() {
            "float" | "double" => {
                let default = default.as_float()?;
                let range = parse_bounds(attrs, Scalar::as_float)?;
                range.check(default)?;
                ParameterValue::Float {
                    default,
                    units: attr_str(attrs, "units"),
                    range,
                }
            }
            "int" | "integer" | "long" => {
                let default = default.as_int()?;
                let range = parse_bounds(attrs, Scalar::as_int)?;
                range.check(default)?;
                ParameterValue::Int {
                    default,
                    units: attr_str(attrs, "units"),
                    range,
                }
            }
            "str" | "string" => {
                if let Some(attrs) = attrs {
                    let ignored: Vec<&str> = ["units", "range", "choices", "files"]
                        .into_iter()
                        .filter(|key| attrs.contains_key(*key))
                        .collect();
                    if !ignored.is_empty() {
                        warn!(
                            "ignoring unrecognized keywords for a string parameter ({})",
                            ignored.join(", ")
                        );
                    }
                }
                ParameterValue::Str {
                    default: default.to_string(),
                }
            }
            "choice" => {
                let choices = attr_scalars(attrs, "choices")?;
                if !choices.contains(&default) {
                    return Err(ParameterError::NotAChoice {
                        value: default.to_string(),
                    });
                }
                ParameterValue::Choice { default, choices }
            }
            "file" => {
                let default = default.to_string();
                let files = match attrs.and_then(|m| m.get("files")) {
                    Some(_) => attr_scalars(attrs, "files")?
                        .iter()
                        .map(Scalar::to_string)
                        .collect(),
                    None => vec![default.clone()],
                };
                if !files.contains(&default) {
                    return Err(ParameterError::NotAChoice { value: default });
                }
                ParameterValue::File { default, files }
            }
            "bool" | "boolean" => {
                let true_value = attr_scalar(attrs, "true_value")?.unwrap_or(Scalar::Bool(true));
                let false_value = attr_scalar(attrs, "false_value")?.unwrap_or(Scalar::Bool(false));
                // Inference turns the bare literals "True"/"False" into booleans.
                let default = match default {
                    Scalar::Str(s) if s == "True" => Scalar::Bool(true),
                    Scalar::Str(s) if s == "False" => Scalar::Bool(false),
                    other => other,
                };
                if default != true_value && default != false_value {
                    return Err(ParameterError::NotAChoice {
                        value: default.to_string(),
                    });
                }
                ParameterValue::Bool {
                    default,
                    true_value,
                    false_value,
                }
            }
            _ => return Err(ParameterError::UnknownType { dtype }),
        };

        Ok(Parameter { description, value })
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    /// The default value as a scalar.
    pub fn default(&self) -> Scalar {
        self.value.default()
    }

    /// The canonical type token (`str`, `int`, `float`, `choice`, `file`,
    /// or `bool`).
    pub fn type_token(&self) -> &'static str {
        self.value.type_token()
    }

    /// For boolean parameters, whether the default equals the true value.
    pub fn is_true(&self) -> Option<bool> {
        match &self.value {
            ParameterValue::Bool {
                default,
                true_value,
                ..
            } => Some(default == true_value),
            _ => None,
        }
    }

    /// Serialize back to the document shape accepted by
    /// [`Parameter::from_document`]. Keys with no content are omitted.
    pub fn as_document(&self) -> Value {
        let mut value = Mapping::new();
        value.insert("default".into(), self.default().to_value());
        value.insert("type".into(), self.type_token().into());

        match &self.value {
            ParameterValue::Str { .. } => {}
            ParameterValue::Int { units, range, .. } => {
                number_attrs(&mut value, units, range, Value::from);
            }
            ParameterValue::Float { units, range, .. } => {
                number_attrs(&mut value, units, range, Value::from);
            }
            ParameterValue::Choice { choices, .. } => {
                if !choices.is_empty() {
                    value.insert(
                        "choices".into(),
                        Value::Sequence(choices.iter().map(Scalar::to_value).collect()),
                    );
                }
            }
            ParameterValue::File { files, .. } => {
                if !files.is_empty() {
                    value.insert(
                        "files".into(),
                        Value::Sequence(files.iter().map(|f| Value::String(f.clone())).collect()),
                    );
                }
            }
            ParameterValue::Bool {
                true_value,
                false_value,
                ..
            } => {
                if *true_value != Scalar::Bool(true) {
                    value.insert("true_value".into(), true_value.to_value());
                }
                if *false_value != Scalar::Bool(false) {
                    value.insert("false_value".into(), false_value.to_value());
                }
            }
        }

        let mut doc = Mapping::new();
        if let Some(desc) = &self.description {
            doc.insert("description".into(), Value::String(desc.clone()));
        }
        doc.insert("value".into(), Value::Mapping(value));
        Value::Mapping(doc)
    }
}

fn attr_str(attrs: Option<&Mapping>, key: &str) -> Option<String> {
    attrs
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn attr_scalar(attrs: Option<&Mapping>, key: &str) -> Result<Option<Scalar>, ParameterError> {
    match attrs.and_then(|m| m.get(key)) {
        None => Ok(None),
        Some(value) => Scalar::from_value(value)
            .map(Some)
            .ok_or_else(|| ParameterError::NotAScalar {
                value: format!("{value:?}"),
            }),
    }
}

fn attr_scalars(attrs: Option<&Mapping>, key: &str) -> Result<Vec<Scalar>, ParameterError> {
    match attrs.and_then(|m| m.get(key)) {
        None => Ok(Vec::new()),
        Some(Value::Sequence(seq)) => seq
            .iter()
            .map(|v| {
                Scalar::from_value(v).ok_or_else(|| ParameterError::NotAScalar {
                    value: format!("{v:?}"),
                })
            })
            .collect(),
        Some(other) => Err(ParameterError::NotAScalar {
            value: format!("{other:?}"),
        }),
    }
}

/// Parse a `range` attribute: either a `{min, max}` mapping (each key
/// optional) or a one- or two-element sequence.
fn parse_bounds<T: Copy>(
    attrs: Option<&Mapping>,
    coerce: impl Fn(&Scalar) -> Result<T, ParameterError>,
) -> Result<Bounds<T>, ParameterError> {
    let Some(range) = attrs.and_then(|m| m.get("range")) else {
        return Ok(Bounds::default());
    };

    let bound = |value: Option<&Value>| -> Result<Option<T>, ParameterError> {
        match value {
            None | Some(Value::Null) => Ok(None),
            Some(v) => {
                let scalar = Scalar::from_value(v).ok_or(ParameterError::BadRange)?;
                coerce(&scalar).map(Some)
            }
        }
    };

    match range {
        Value::Mapping(_) => Ok(Bounds {
            min: bound(range.get("min"))?,
            max: bound(range.get("max"))?,
        }),
        Value::Sequence(seq) if seq.len() == 1 => Ok(Bounds {
            min: bound(seq.first())?,
            max: None,
        }),
        Value::Sequence(seq) if seq.len() == 2 => Ok(Bounds {
            min: bound(seq.first())?,
            max: bound(seq.get(1))?,
        }),
        _ => Err(ParameterError::BadRange),
    }
}

fn number_attrs<T: Copy + PartialOrd + fmt::Display>(
    value: &mut Mapping,
    units: &Option<String>,
    range: &Bounds<T>,
    to_value: impl Fn(T) -> Value,
) {
    if let Some(units) = units {
        value.insert("units".into(), Value::String(units.clone()));
    }
    if !range.is_unbounded() {
        let mut bounds = Mapping::new();
        if let Some(min) = range.min {
            bounds.insert("min".into(), to_value(min));
        }
        if let Some(max) = range.max {
            bounds.insert("max".into(), to_value(max));
        }
        value.insert("range".into(), Value::Mapping(bounds));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(yaml: &str) -> Result<Parameter, ParameterError> {
        let doc: Value = serde_yaml::from_str(yaml).unwrap();
        Parameter::from_document(&doc)
    }

    #[test]
    fn bare_scalar_infers_int() {
        let p = param("value: '3'").unwrap();
        assert_eq!(p.type_token(), "int");
        assert_eq!(p.default(), Scalar::Int(3));
    }

    #[test]
    fn bare_scalar_infers_float() {
        let p = param("value: '3.14'").unwrap();
        assert_eq!(p.type_token(), "float");
        assert_eq!(p.default(), Scalar::Float(3.14));
    }

    #[test]
    fn bare_scalar_infers_bool() {
        for (literal, expected) in [("'True'", true), ("'False'", false)] {
            let p = param(&format!("value: {literal}")).unwrap();
            assert_eq!(p.type_token(), "bool");
            assert_eq!(p.default(), Scalar::Bool(expected));
        }
    }

    #[test]
    fn bare_scalar_infers_string() {
        let p = param("value: lorem ipsum").unwrap();
        assert_eq!(p.type_token(), "str");
        assert_eq!(p.default(), Scalar::Str("lorem ipsum".to_string()));
    }

    #[test]
    fn declared_type_wins_over_inference() {
        let p = param("value: {default: '3', type: str}").unwrap();
        assert_eq!(p.type_token(), "str");
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = param("value: {default: 1, type: complex}").unwrap_err();
        assert!(matches!(err, ParameterError::UnknownType { .. }));
        assert_eq!(err.to_string(), "complex: unknown parameter type");
    }

    #[test]
    fn int_from_float_truncates() {
        let p = param("value: {default: 1973.5, type: int}").unwrap();
        assert_eq!(p.default(), Scalar::Int(1973));
    }

    #[test]
    fn int_from_word_fails() {
        let err = param("value: {default: lorem, type: int}").unwrap_err();
        assert!(matches!(err, ParameterError::NotAnInt { .. }));
    }

    #[test]
    fn float_accepts_numeric_strings() {
        let p = param("value: {default: '3.14', type: float}").unwrap();
        assert_eq!(p.default(), Scalar::Float(3.14));
    }

    #[test]
    fn default_below_range_fails() {
        let err = param(
            "value: {default: -1, type: int, range: {min: 0, max: 100}}",
        )
        .unwrap_err();
        assert!(matches!(err, ParameterError::BelowLowerBound { .. }));
    }

    #[test]
    fn default_above_range_fails() {
        let err = param(
            "value: {default: 1.5, type: float, range: {min: 0.0, max: 1.0}}",
        )
        .unwrap_err();
        assert!(matches!(err, ParameterError::AboveUpperBound { .. }));
    }

    #[test]
    fn half_open_range_is_allowed() {
        let p = param("value: {default: 10, type: int, range: {min: 0}}").unwrap();
        match p.value() {
            ParameterValue::Int { range, .. } => {
                assert_eq!(range.min, Some(0));
                assert_eq!(range.max, None);
            }
            other => panic!("not an int parameter: {other:?}"),
        }
    }

    #[test]
    fn range_as_pair_is_accepted() {
        let p = param("value: {default: 0.5, type: float, range: [0.0, 1.0]}").unwrap();
        match p.value() {
            ParameterValue::Float { range, .. } => {
                assert_eq!(range.min, Some(0.0));
                assert_eq!(range.max, Some(1.0));
            }
            other => panic!("not a float parameter: {other:?}"),
        }
    }

    #[test]
    fn choice_membership_is_enforced() {
        assert!(param("value: {default: red, choices: [red, green]}").is_ok());
        let err = param("value: {default: blue, choices: [red, green]}").unwrap_err();
        assert!(matches!(err, ParameterError::NotAChoice { .. }));
    }

    #[test]
    fn choices_imply_the_choice_type() {
        let p = param("value: {default: red, choices: [red, green]}").unwrap();
        assert_eq!(p.type_token(), "choice");
    }

    #[test]
    fn file_choices_default_to_the_value() {
        let p = param("value: {default: input.txt, type: file}").unwrap();
        match p.value() {
            ParameterValue::File { files, .. } => {
                assert_eq!(files, &["input.txt".to_string()]);
            }
            other => panic!("not a file parameter: {other:?}"),
        }
    }

    #[test]
    fn file_outside_files_fails() {
        let err = param("value: {default: c.txt, files: [a.txt, b.txt]}").unwrap_err();
        assert!(matches!(err, ParameterError::NotAChoice { .. }));
    }

    #[test]
    fn bool_defaults_to_true_false_choices() {
        let p = param("value: {default: true, type: bool}").unwrap();
        assert_eq!(p.is_true(), Some(true));
        let p = param("value: {default: false, type: bool}").unwrap();
        assert_eq!(p.is_true(), Some(false));
    }

    #[test]
    fn bool_with_custom_values() {
        let p = param("value: {default: 'on', true_value: 'on', false_value: 'off'}").unwrap();
        assert_eq!(p.type_token(), "bool");
        assert_eq!(p.is_true(), Some(true));

        let err =
            param("value: {default: maybe, true_value: 'on', false_value: 'off'}").unwrap_err();
        assert!(matches!(err, ParameterError::NotAChoice { .. }));
    }

    #[test]
    fn missing_default_is_an_error() {
        assert!(matches!(
            param("description: no value here").unwrap_err(),
            ParameterError::MissingDefault
        ));
        assert!(matches!(
            param("value: {type: int}").unwrap_err(),
            ParameterError::MissingDefault
        ));
    }

    #[test]
    fn desc_is_an_alias_for_description() {
        let p = param("desc: Time step.\nvalue: 1.0").unwrap();
        assert_eq!(p.description(), Some("Time step."));

        let p = param("description: Time step.\ndesc: ignored\nvalue: 1.0").unwrap();
        assert_eq!(p.description(), Some("Time step."));
    }

    #[test]
    fn round_trip_every_variant() {
        let docs = [
            "description: A name.\nvalue: {default: Child, type: str}",
            "value: {default: 10, type: int, units: d, range: {min: 0, max: 100}}",
            "value: {default: 1.5, type: float, range: {min: 0.0}}",
            "value: {default: red, type: choice, choices: [red, green, blue]}",
            "value: {default: a.txt, type: file, files: [a.txt, b.txt]}",
            "value: {default: true, type: bool}",
            "value: {default: 'on', type: bool, true_value: 'on', false_value: 'off'}",
        ];
        for yaml in docs {
            let p = param(yaml).unwrap();
            let once = p.as_document();
            let again = Parameter::from_document(&once).unwrap().as_document();
            assert_eq!(once, again, "round trip failed for: {yaml}");
        }
    }

    #[test]
    fn unset_bounds_are_omitted_from_documents() {
        let p = param("value: {default: 1, type: int}").unwrap();
        let doc = p.as_document();
        assert!(doc.get("value").unwrap().get("range").is_none());
    }

    #[test]
    fn scalar_numeric_equality_crosses_types() {
        assert_eq!(Scalar::Int(1), Scalar::Float(1.0));
        assert_ne!(Scalar::Bool(true), Scalar::Int(1));
        assert_ne!(Scalar::Str("1".to_string()), Scalar::Int(1));
    }
}
