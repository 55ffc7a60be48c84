//! Dynamic, schema-less attribute values.
//!
//! Configuration blobs and filter queries sent to the stack have no static
//! schema. They are held locally as [`DynamicValue`], a recursive tagged value,
//! so that numeric coercion and round-trip rules live at one boundary:
//!
//! - [`DynamicValue::decode`] turns raw JSON into a typed value. Numbers whose
//!   value is integral (`100.0`) become [`DynamicValue::Int`]; everything else
//!   numeric becomes [`DynamicValue::Float`].
//! - [`DynamicValue::encode`] is the structure-preserving inverse. Integers
//!   never gain a trailing `.0`.
//!
//! The helpers at the bottom of the module ([`extract_keys`], [`sanitize`],
//! [`partition`]) rebuild composite attributes from a flat remote response
//! using the key sets the caller declared.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Name -> value map of a dynamic object.
pub type DynamicMap = BTreeMap<String, DynamicValue>;

/// A JSON-shaped value whose structure is not fixed by a schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<DynamicValue>),
    Map(DynamicMap),
}

/// Shape tag of a [`DynamicValue`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamicKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    List,
    Map,
}

impl fmt::Display for DynamicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DynamicKind::Null => "null",
            DynamicKind::Bool => "bool",
            DynamicKind::Int => "integer",
            DynamicKind::Float => "number",
            DynamicKind::String => "string",
            DynamicKind::List => "list",
            DynamicKind::Map => "object",
        };
        f.write_str(name)
    }
}

/// Errors raised while interpreting dynamic values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The value does not have the expected shape.
    #[error("{field}: expected {expected}, found {found}")]
    UnexpectedShape {
        field: String,
        expected: DynamicKind,
        found: DynamicKind,
    },

    /// A field required by the selected discriminator is absent.
    #[error("{discriminator} '{value}': missing required field '{field}'")]
    MissingField {
        discriminator: String,
        value: String,
        field: String,
    },

    /// The discriminator field is absent.
    #[error("missing discriminator field '{field}'")]
    MissingDiscriminator { field: String },

    /// The discriminator names a shape outside the supported set.
    #[error("unsupported {field} '{value}'")]
    UnknownDiscriminator { field: String, value: String },

    /// The typed shape rejected the value (wrong field type and similar).
    #[error("invalid {context}: {reason}")]
    Invalid { context: String, reason: String },
}

impl DynamicValue {
    /// Decode a raw JSON value.
    pub fn decode(raw: &Value) -> Self {
        match raw {
            Value::Null => DynamicValue::Null,
            Value::Bool(b) => DynamicValue::Bool(*b),
            Value::Number(n) => decode_number(n),
            Value::String(s) => DynamicValue::String(s.clone()),
            Value::Array(items) => DynamicValue::List(items.iter().map(Self::decode).collect()),
            Value::Object(fields) => DynamicValue::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::decode(v)))
                    .collect(),
            ),
        }
    }

    /// Encode back to raw JSON.
    pub fn encode(&self) -> Value {
        match self {
            DynamicValue::Null => Value::Null,
            DynamicValue::Bool(b) => Value::Bool(*b),
            DynamicValue::Int(i) => Value::Number(Number::from(*i)),
            // Non-finite floats have no JSON form.
            DynamicValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            DynamicValue::String(s) => Value::String(s.clone()),
            DynamicValue::List(items) => Value::Array(items.iter().map(Self::encode).collect()),
            DynamicValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.encode()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    /// Decode a JSON document given as text.
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::decode(&value))
    }

    /// Shape of this value.
    pub fn kind(&self) -> DynamicKind {
        match self {
            DynamicValue::Null => DynamicKind::Null,
            DynamicValue::Bool(_) => DynamicKind::Bool,
            DynamicValue::Int(_) => DynamicKind::Int,
            DynamicValue::Float(_) => DynamicKind::Float,
            DynamicValue::String(_) => DynamicKind::String,
            DynamicValue::List(_) => DynamicKind::List,
            DynamicValue::Map(_) => DynamicKind::Map,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    pub fn as_map(&self) -> Option<&DynamicMap> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the value as an object, naming `field` in the error otherwise.
    pub fn expect_map(&self, field: &str) -> Result<&DynamicMap, CodecError> {
        self.as_map().ok_or_else(|| CodecError::UnexpectedShape {
            field: field.to_string(),
            expected: DynamicKind::Map,
            found: self.kind(),
        })
    }

    /// Convert into a typed shape through its serde representation.
    pub fn to_typed<T: serde::de::DeserializeOwned>(&self, context: &str) -> Result<T, CodecError> {
        serde_json::from_value(self.encode()).map_err(|e| CodecError::Invalid {
            context: context.to_string(),
            reason: e.to_string(),
        })
    }

    /// Build a dynamic value from any serializable shape.
    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self, CodecError> {
        serde_json::to_value(value)
            .map(|v| Self::decode(&v))
            .map_err(|e| CodecError::Invalid {
                context: std::any::type_name::<T>().to_string(),
                reason: e.to_string(),
            })
    }

    /// Semantic equality: both sides are compared after a JSON round trip,
    /// so `Float(100.0)` and `Int(100)` are the same value.
    pub fn semantically_eq(&self, other: &DynamicValue) -> bool {
        Self::decode(&self.encode()) == Self::decode(&other.encode())
    }
}

fn decode_number(n: &Number) -> DynamicValue {
    if let Some(i) = n.as_i64() {
        return DynamicValue::Int(i);
    }
    // u64 beyond i64::MAX or a real float.
    let f = n.as_f64().unwrap_or_default();
    if f == f.trunc() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        DynamicValue::Int(f as i64)
    } else {
        DynamicValue::Float(f)
    }
}

impl From<Value> for DynamicValue {
    fn from(value: Value) -> Self {
        DynamicValue::decode(&value)
    }
}

impl From<DynamicValue> for Value {
    fn from(value: DynamicValue) -> Self {
        value.encode()
    }
}

impl From<&str> for DynamicValue {
    fn from(value: &str) -> Self {
        DynamicValue::String(value.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(value: String) -> Self {
        DynamicValue::String(value)
    }
}

impl From<i64> for DynamicValue {
    fn from(value: i64) -> Self {
        DynamicValue::Int(value)
    }
}

impl From<bool> for DynamicValue {
    fn from(value: bool) -> Self {
        DynamicValue::Bool(value)
    }
}

impl From<DynamicMap> for DynamicValue {
    fn from(value: DynamicMap) -> Self {
        DynamicValue::Map(value)
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Top-level keys of a dynamic object, in sorted order.
pub fn extract_keys(map: &DynamicMap) -> Vec<String> {
    map.keys().cloned().collect()
}

/// Keep only the entries of `map` whose key is in `allowed`.
///
/// Keys outside the allow-list are dropped, never replaced by null.
pub fn sanitize(map: &DynamicMap, allowed: &[String]) -> DynamicMap {
    allowed
        .iter()
        .filter_map(|key| map.get(key).map(|v| (key.clone(), v.clone())))
        .collect()
}

/// Split a flat remote object into two groups of declared keys.
///
/// Remote keys present in neither group are discarded.
pub fn partition(
    flat: &DynamicMap,
    first: &[String],
    second: &[String],
) -> (DynamicMap, DynamicMap) {
    (sanitize(flat, first), sanitize(flat, second))
}
