//! Declared configuration shapes and eager validation.
//!
//! A [`ConfigShape`] is the list of fields an agent type accepts. The registry
//! validates raw JSON against it when an agent is created, so a bad graph is
//! rejected while it is being authored rather than when it runs.
//!
//! Validation rules:
//! 1. The configuration must be a JSON object (`null` counts as `{}`).
//! 2. Required fields must be present and non-null; absent optional fields
//!    take their declared default, if any.
//! 3. Present values must match the field kind, numeric bounds, and enum set.
//! 4. Fields not named by the shape are passed through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{ConfigError, ConfigIssue};

/// JSON type (plus constraints) a field accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    Boolean,
    Enum {
        values: Vec<String>,
    },
    Object,
    Array,
}

impl FieldKind {
    pub fn integer() -> Self {
        Self::Integer { min: None, max: None }
    }

    pub fn integer_in(min: i64, max: i64) -> Self {
        Self::Integer { min: Some(min), max: Some(max) }
    }

    pub fn number_at_least(min: f64) -> Self {
        Self::Number { min: Some(min), max: None }
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum { values: values.into_iter().map(Into::into).collect() }
    }

    fn check(&self, field: &str, value: &Value) -> Result<(), ConfigError> {
        let mismatch = |expected: &'static str| {
            ConfigError::new(
                field,
                ConfigIssue::TypeMismatch { expected, found: json_type_name(value) },
            )
        };

        match self {
            Self::String => value.as_str().map(|_| ()).ok_or_else(|| mismatch("string")),
            Self::Boolean => value.as_bool().map(|_| ()).ok_or_else(|| mismatch("boolean")),
            Self::Object => value.as_object().map(|_| ()).ok_or_else(|| mismatch("object")),
            Self::Array => value.as_array().map(|_| ()).ok_or_else(|| mismatch("array")),
            Self::Integer { min, max } => {
                let n = value.as_i64().ok_or_else(|| mismatch("integer"))?;
                let below = min.is_some_and(|lo| n < lo);
                let above = max.is_some_and(|hi| n > hi);
                if below || above {
                    return Err(ConfigError::new(
                        field,
                        ConfigIssue::OutOfRange {
                            value: n.to_string(),
                            min: min.map(|v| v.to_string()),
                            max: max.map(|v| v.to_string()),
                        },
                    ));
                }
                Ok(())
            }
            Self::Number { min, max } => {
                let n = value.as_f64().ok_or_else(|| mismatch("number"))?;
                let below = min.is_some_and(|lo| n < lo);
                let above = max.is_some_and(|hi| n > hi);
                if below || above {
                    return Err(ConfigError::new(
                        field,
                        ConfigIssue::OutOfRange {
                            value: n.to_string(),
                            min: min.map(|v| v.to_string()),
                            max: max.map(|v| v.to_string()),
                        },
                    ));
                }
                Ok(())
            }
            Self::Enum { values } => {
                let s = value.as_str().ok_or_else(|| mismatch("string"))?;
                if values.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(ConfigError::new(
                        field,
                        ConfigIssue::UnknownVariant { value: s.to_owned(), allowed: values.clone() },
                    ))
                }
            }
        }
    }

    fn json_schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        match self {
            Self::String => {
                schema.insert("type".into(), json!("string"));
            }
            Self::Boolean => {
                schema.insert("type".into(), json!("boolean"));
            }
            Self::Object => {
                schema.insert("type".into(), json!("object"));
            }
            Self::Array => {
                schema.insert("type".into(), json!("array"));
            }
            Self::Integer { min, max } => {
                schema.insert("type".into(), json!("integer"));
                if let Some(lo) = min {
                    schema.insert("minimum".into(), json!(lo));
                }
                if let Some(hi) = max {
                    schema.insert("maximum".into(), json!(hi));
                }
            }
            Self::Number { min, max } => {
                schema.insert("type".into(), json!("number"));
                if let Some(lo) = min {
                    schema.insert("minimum".into(), json!(lo));
                }
                if let Some(hi) = max {
                    schema.insert("maximum".into(), json!(hi));
                }
            }
            Self::Enum { values } => {
                schema.insert("type".into(), json!("string"));
                schema.insert("enum".into(), json!(values));
            }
        }
        schema
    }
}

/// One declared configuration field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
            description: String::new(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { required: false, ..Self::required(name, kind) }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }
}

/// The full configuration shape of one agent type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigShape {
    pub fields: Vec<FieldSpec>,
}

impl ConfigShape {
    /// A shape with no declared fields; any object is accepted.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Validate `raw` and return the normalised configuration (defaults filled).
    ///
    /// # Errors
    /// The first [`ConfigError`] encountered, in field declaration order.
    pub fn validate(&self, raw: &Value) -> Result<Map<String, Value>, ConfigError> {
        let mut config = match raw {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(ConfigError::new("<root>", ConfigIssue::NotAnObject)),
        };

        for spec in &self.fields {
            match config.get(&spec.name).filter(|v| !v.is_null()) {
                Some(value) => spec.kind.check(&spec.name, value)?,
                None => match &spec.default {
                    Some(default) => {
                        config.insert(spec.name.clone(), default.clone());
                    }
                    None if spec.required => {
                        return Err(ConfigError::new(&spec.name, ConfigIssue::Missing));
                    }
                    None => {
                        config.remove(&spec.name);
                    }
                },
            }
        }

        Ok(config)
    }

    /// Render the shape as a JSON Schema object for form generators.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in &self.fields {
            let mut prop = spec.kind.json_schema();
            if !spec.description.is_empty() {
                prop.insert("description".into(), json!(spec.description));
            }
            if let Some(default) = &spec.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(spec.name.clone(), Value::Object(prop));
            if spec.required {
                required.push(spec.name.clone());
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": true,
        })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
