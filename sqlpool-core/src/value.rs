//! Driver-neutral values, rows and execution results.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A single query parameter or result cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating point number.
    Float(f64),
    /// Text.
    String(String),
    /// Raw bytes that are not valid UTF-8.
    Bytes(Vec<u8>),
    /// JSON document.
    Json(JsonValue),
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as an i64, if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number((*i).into()),
            Self::UInt(u) => JsonValue::Number((*u).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Bytes(b) => JsonValue::String(format!("<binary {} bytes>", b.len())),
            Self::Json(j) => j.clone(),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => UInt,
    u16 => UInt,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => String,
    Vec<u8> => Bytes,
    JsonValue => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

/// Build a parameter list from heterogeneous values.
///
/// ```rust
/// use sqlpool_core::{params, Value};
///
/// let p = params![1, "alice", None::<i32>];
/// assert_eq!(p, vec![Value::Int(1), Value::String("alice".into()), Value::Null]);
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::Value>::new() };
    ($($v:expr),+ $(,)?) => { vec![$($crate::Value::from($v)),+] };
}

/// How fetched rows are shaped when converted to JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowShape {
    /// Each row is a JSON array in column order.
    #[default]
    Tuple,
    /// Each row is a JSON object keyed by column name.
    Mapping,
}

/// A result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row. Columns are shared between rows of the same result set.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Cell values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a cell by column name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Get a cell by index.
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Consume the row into its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Consume the row into an ordered column-to-value map.
    ///
    /// When a column name repeats, the last value wins.
    pub fn into_map(self) -> IndexMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }

    /// Convert to JSON in the requested shape.
    pub fn to_json(&self, shape: RowShape) -> JsonValue {
        match shape {
            RowShape::Tuple => JsonValue::Array(self.values.iter().map(Value::to_json).collect()),
            RowShape::Mapping => {
                let map = self
                    .columns
                    .iter()
                    .zip(&self.values)
                    .map(|(c, v)| (c.clone(), v.to_json()))
                    .collect();
                JsonValue::Object(map)
            }
        }
    }
}

/// Outcome of a modifying statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecResult {
    /// Number of rows changed.
    pub rows_affected: u64,
    /// Last auto-increment id generated, if any.
    pub last_insert_id: Option<u64>,
}

impl ExecResult {
    /// Fold another result into this one, as `executemany` reports it.
    pub fn merge(self, other: ExecResult) -> Self {
        Self {
            rows_affected: self.rows_affected + other.rows_affected,
            last_insert_id: other.last_insert_id.or(self.last_insert_id),
        }
    }
}
