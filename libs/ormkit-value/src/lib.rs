//! The dynamic value type that flows between entity attributes, filter
//! leaves, row hydration and the SQL builder's parameter lists.
//!
//! Every column value, bound filter parameter and row cell is represented
//! as a [`Value`]. It is intentionally a closed, serializable sum type
//! rather than a generic `Any`, so the builder and the pool boundary
//! never need to downcast.

mod error;
mod json_path;

pub use error::ConversionError;
pub use json_path::json_extract;

use chrono::{DateTime, Utc};
use serde::{ser::Serializer, Serialize};
use std::{convert::TryFrom, fmt};
use uuid::Uuid;

pub type ValueResult<T> = std::result::Result<T, ConversionError>;
pub type ValueList = Vec<Value>;

/// A single column value, bound parameter, or JSON leaf value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    #[serde(serialize_with = "serialize_float")]
    Float(f64),
    Int(i64),
    Boolean(bool),
    #[serde(serialize_with = "serialize_datetime")]
    DateTime(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
    Null,
    List(ValueList),
}

fn serialize_float<S: Serializer>(f: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(*f)
}

fn serialize_datetime<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    dt.to_rfc3339().serialize(s)
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Best-effort truthiness, used by the `isnull` filter operator whose
    /// sense flips on a truthy vs. falsy right-hand value.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            Value::Int(i) => *i != 0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => s.fmt(f),
            Value::Float(x) => x.fmt(f),
            Value::Int(x) => x.fmt(f),
            Value::Boolean(x) => x.fmt(f),
            Value::DateTime(x) => x.fmt(f),
            Value::Uuid(x) => x.fmt(f),
            Value::Json(x) => x.fmt(f),
            Value::Null => "null".fmt(f),
            Value::List(x) => write!(f, "{:?}", x),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<ValueList> for Value {
    fn from(v: ValueList) -> Self {
        Value::List(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = ConversionError;

    fn try_from(v: serde_json::Value) -> ValueResult<Self> {
        match v {
            serde_json::Value::String(s) => Ok(Value::String(s)),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Array(items) => {
                let converted: ValueResult<Vec<Value>> = items.into_iter().map(Value::try_from).collect();
                Ok(Value::List(converted?))
            }
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Value::Float(f))
                } else {
                    Err(ConversionError::new("serde_json::Number", "Value"))
                }
            }
            obj @ serde_json::Value::Object(_) => Ok(Value::Json(obj)),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = ConversionError;

    fn try_from(v: Value) -> ValueResult<i64> {
        match v {
            Value::Int(i) => Ok(i),
            _ => Err(ConversionError::new("Value", "i64")),
        }
    }
}
