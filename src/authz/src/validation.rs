//! Validation of client-submitted models
//!
//! Runs before any mutation reaches persistence. A payload is either
//! accepted whole or rejected; nothing is partially applied.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::InvalidModelError;

/// JSON type a schema field must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Object,
    /// A list whose elements must all be strings
    StringList,
}

impl FieldType {
    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::StringList => value.is_array(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::StringList => "list",
        })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Declared keys and types of a submitted model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    name: &'static str,
    fields: BTreeMap<&'static str, FieldType>,
}

impl ModelSchema {
    /// Schema from `(key, type)` pairs
    pub fn new(name: &'static str, fields: &[(&'static str, FieldType)]) -> Self {
        Self {
            name,
            fields: fields.iter().copied().collect(),
        }
    }

    /// Schema of a submitted user
    pub fn user() -> Self {
        Self::new(
            "user",
            &[
                ("name", FieldType::String),
                ("admin", FieldType::Bool),
                ("groups", FieldType::StringList),
                ("auth_state", FieldType::Object),
            ],
        )
    }

    /// Schema of a submitted group
    pub fn group() -> Self {
        Self::new(
            "group",
            &[("name", FieldType::String), ("users", FieldType::StringList)],
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared type of a key, `None` if undeclared
    pub fn field_type(&self, key: &str) -> Option<FieldType> {
        self.fields.get(key).copied()
    }
}

/// A model that passed its schema
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedModel {
    fields: serde_json::Map<String, Value>,
}

impl ValidatedModel {
    /// Value of a submitted key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The validated JSON object
    pub fn into_inner(self) -> serde_json::Map<String, Value> {
        self.fields
    }

    /// Converts into a typed update
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, InvalidModelError> {
        serde_json::from_value(Value::Object(self.fields)).map_err(|e| {
            debug!("Validated model did not fit target type: {}", e);
            InvalidModelError::InvalidJson
        })
    }
}

/// Checks keys, value types and list element types
pub fn validate(raw: &Value, schema: &ModelSchema) -> Result<ValidatedModel, InvalidModelError> {
    let object = raw.as_object().ok_or_else(|| {
        warn!("Rejected {} model that is not an object", schema.name);
        InvalidModelError::NotAnObject(raw.to_string())
    })?;

    let unknown: Vec<String> = object
        .keys()
        .filter(|key| schema.field_type(key).is_none())
        .cloned()
        .collect();
    if !unknown.is_empty() {
        warn!("Rejected {} model with unknown keys {:?}", schema.name, unknown);
        return Err(InvalidModelError::InvalidKeys { keys: unknown });
    }

    for (key, value) in object {
        // every key is known at this point
        let Some(expected) = schema.field_type(key) else {
            continue;
        };

        if !expected.matches(value) {
            return Err(InvalidModelError::TypeMismatch {
                model: schema.name.to_string(),
                key: key.clone(),
                expected: expected.to_string(),
                found: json_type(value).to_string(),
            });
        }

        if expected == FieldType::StringList {
            if let Some((index, element)) = value
                .as_array()
                .into_iter()
                .flatten()
                .enumerate()
                .find(|(_, element)| !element.is_string())
            {
                return Err(InvalidModelError::ElementType {
                    model: schema.name.to_string(),
                    key: key.clone(),
                    index,
                    found: json_type(element).to_string(),
                });
            }
        }
    }

    Ok(ValidatedModel {
        fields: object.clone(),
    })
}

/// Parses a request body; an empty body is `None`
pub fn parse_json_body(body: &[u8]) -> Result<Option<Value>, InvalidModelError> {
    let text = std::str::from_utf8(body).map_err(|_| InvalidModelError::InvalidJson)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(text).map(Some).map_err(|e| {
        debug!("Bad JSON: {:?}", text);
        warn!("Couldn't parse JSON: {}", e);
        InvalidModelError::InvalidJson
    })
}

/// Typed form of a validated user submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub admin: Option<bool>,
    #[serde(default)]
    pub groups: Option<Vec<String>>,
    #[serde(default)]
    pub auth_state: Option<serde_json::Map<String, Value>>,
}

/// Typed form of a validated group submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub users: Option<Vec<String>>,
}
