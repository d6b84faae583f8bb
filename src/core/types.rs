use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};

/// Declared type of a loaded column.
///
/// Delimited text carries no type information so its columns are declared
/// as text. JSON columns are left untyped so native scalars keep their
/// storage class inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// Text affinity.
    Text,

    /// No declared type.
    Any,
}

impl DataType {
    /// The type name used in a column definition, empty for [`DataType::Any`].
    pub fn sql_type(self) -> &'static str {
        match self {
            DataType::Text => "TEXT",
            DataType::Any => "",
        }
    }
}

/// A single cell, either loaded from a source or returned by the engine.
///
/// `Display` gives the rendering used by the table output format.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum Value {
    /// A 64-bit signed integer value.
    Int64(i64),

    /// A 64-bit floating point number.
    Float64(f64),

    /// A UTF-8 text string.
    Text(String),

    /// A boolean value (true/false).
    Bool(bool),

    /// Raw bytes, only produced by the engine.
    Blob(Vec<u8>),

    /// Represents a NULL value (absence of data).
    Null,
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(fl) => write!(f, "{}", format_float(*fl)),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bool(true) => write!(f, "TRUE"),
            Value::Bool(false) => write!(f, "FALSE"),
            Value::Blob(bytes) => write!(f, "\\x{}", hex(bytes)),
            Value::Null => write!(f, "NULL"),
        }
    }
}

impl Value {
    /// Converts a JSON scalar into a cell.
    ///
    /// Nested arrays and objects have no scalar form and are kept as their
    /// compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(i) => Value::Int64(i),
                None => number.as_f64().map_or(Value::Null, Value::Float64),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Value::Text(value.to_string())
            }
        }
    }

    /// Converts this cell into the JSON value emitted by the json output format.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int64(i) => serde_json::Value::from(*i),
            // Non-finite floats have no JSON form and become null.
            Value::Float64(f) => serde_json::Value::from(*f),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Blob(bytes) => serde_json::Value::String(format!("\\x{}", hex(bytes))),
        }
    }

    /// Field text for the csv output format. NULL is an empty field.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Integral floats keep a trailing `.0` so they stay distinguishable from integers.
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Int64(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Float64(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            Value::Bool(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Int64(i),
            ValueRef::Real(f) => Value::Float64(f),
            ValueRef::Text(text) => Value::Text(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        }
    }
}
