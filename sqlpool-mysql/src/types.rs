//! Conversion between pool values and `mysql_async` values.

use mysql_async::Value as MyValue;
use sqlpool_core::Value;

/// Convert a parameter to a MySQL value.
pub fn to_mysql(value: &Value) -> MyValue {
    match value {
        Value::Null => MyValue::NULL,
        Value::Bool(b) => MyValue::Int(i64::from(*b)),
        Value::Int(i) => MyValue::Int(*i),
        Value::UInt(u) => MyValue::UInt(*u),
        Value::Float(f) => MyValue::Double(*f),
        Value::String(s) => MyValue::Bytes(s.as_bytes().to_vec()),
        Value::Bytes(b) => MyValue::Bytes(b.clone()),
        Value::Json(j) => MyValue::Bytes(j.to_string().into_bytes()),
    }
}

/// Convert a MySQL cell to a pool value.
///
/// Text columns arrive as bytes; valid UTF-8 becomes [`Value::String`], the
/// rest stays [`Value::Bytes`]. Temporal values are rendered as ISO-8601
/// strings.
pub fn from_mysql(value: MyValue) -> Value {
    match value {
        MyValue::NULL => Value::Null,
        MyValue::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        },
        MyValue::Int(i) => Value::Int(i),
        MyValue::UInt(u) => Value::UInt(u),
        MyValue::Float(f) => Value::Float(f64::from(f)),
        MyValue::Double(d) => Value::Float(d),
        MyValue::Date(year, month, day, hour, minute, second, micro) => Value::String(format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}",
            year, month, day, hour, minute, second, micro
        )),
        MyValue::Time(negative, days, hours, minutes, seconds, micro) => Value::String(format!(
            "{}{}:{:02}:{:02}.{:06}",
            if negative { "-" } else { "" },
            days * 24 + u32::from(hours),
            minutes,
            seconds,
            micro
        )),
    }
}
