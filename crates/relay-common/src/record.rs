//! Employee record model and its JSON wire form
//!
//! A source row arrives as an ordered list of `(column, value)` pairs. The
//! producer cleans it into an [`EmployeeRecord`] and publishes the JSON
//! encoding; the consumer decodes the payload back with
//! [`EmployeeRecord::from_payload`], which applies the same validity rule.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Content type stamped on every published message
pub const CONTENT_TYPE_JSON: &str = "application/json";

pub const FIELD_NAME: &str = "name";
pub const FIELD_AGE: &str = "age";
pub const FIELD_LOCATION: &str = "location";

/// Why a row or payload cannot become a stored employee
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("name is required")]
    MissingName,

    #[error("age '{value}' is not an integer")]
    InvalidAge { value: String },

    #[error("payload is not a valid employee message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One source row, columns in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Value of the first column named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A validated employee: non-empty name, optional age and location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Additional source columns, carried along but never stored
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl EmployeeRecord {
    /// Build a record with no extra columns
    pub fn new(name: impl Into<String>, age: Option<i32>, location: Option<String>) -> Self {
        Self {
            name: name.into(),
            age,
            location,
            extra: BTreeMap::new(),
        }
    }

    /// Clean a source row.
    ///
    /// `name` and `location` are trimmed; an empty `location` becomes absent.
    /// An empty `age` is absent, anything else must parse as an integer.
    pub fn clean(raw: &RawRecord) -> Result<Self, RecordError> {
        let name = raw.get(FIELD_NAME).map(str::trim).unwrap_or_default();
        if name.is_empty() {
            return Err(RecordError::MissingName);
        }

        let age = match raw.get(FIELD_AGE).map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<i32>().map_err(|_| RecordError::InvalidAge {
                value: value.to_string(),
            })?),
        };

        let location = non_empty(raw.get(FIELD_LOCATION));

        let extra = raw
            .fields()
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), FIELD_NAME | FIELD_AGE | FIELD_LOCATION))
            .filter_map(|(k, v)| non_empty(Some(v.as_str())).map(|v| (k.clone(), v)))
            .collect();

        Ok(Self {
            name: name.to_string(),
            age,
            location,
            extra,
        })
    }

    /// JSON bytes for publishing
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode and validate a delivered payload.
    ///
    /// Only `name` decides validity. A numeric-string `age` is accepted; any
    /// other non-integer or out-of-range `age` is stored as absent. A scalar
    /// `location` is kept as text. Unknown keys are ignored and are not kept
    /// in `extra`.
    pub fn from_payload(payload: &[u8]) -> Result<Self, RecordError> {
        let inbound: InboundPayload = serde_json::from_slice(payload)?;

        let name = inbound
            .name
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            return Err(RecordError::MissingName);
        }

        Ok(Self::new(
            name,
            lenient_age(name, inbound.age),
            lenient_text(name, FIELD_LOCATION, inbound.location),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct InboundPayload {
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    age: Option<Value>,
    #[serde(default)]
    location: Option<Value>,
}

fn lenient_age(name: &str, value: Option<Value>) -> Option<i32> {
    let age = match &value {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Some(Value::String(s)) if s.trim().is_empty() => return None,
        Some(Value::String(s)) => s.trim().parse::<i32>().ok(),
        Some(_) => None,
    };

    if age.is_none() {
        warn!(name, age = ?value, "Age is not a 32-bit integer, storing it as absent");
    }
    age
}

fn lenient_text(name: &str, field: &str, value: Option<Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => non_empty(Some(s.as_str())),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            warn!(name, field, value = %other, "Field is not a scalar, storing it as absent");
            None
        },
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
