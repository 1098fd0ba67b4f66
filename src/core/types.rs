//! Field types and tagged sample values.
//!
//! A measurement point declares one `FieldType` per field. Callers inject
//! `Value`s, which are checked and converted against the declared type before
//! anything is written. Conversions are explicit: integers widen or narrow only
//! within range, text is parsed for numeric fields, integers enter double
//! fields only when exactly representable, and nothing is truncated.

use std::fmt;

use rand::Rng;

/// Largest integer magnitude a double holds without rounding (2^53).
const MAX_EXACT_DOUBLE_INT: i128 = 1 << 53;

/// Scalar types understood by the OML text protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    Blob,
    Bool,
    Guid,
}

impl FieldType {
    /// Resolves a schema type token, accepting the protocol aliases.
    ///
    /// Matching is case-insensitive. Returns `None` for unknown types.
    pub fn from_name(name: &str) -> Option<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "int32" | "int" | "integer" => FieldType::Int32,
            "uint32" => FieldType::UInt32,
            "int64" | "long" => FieldType::Int64,
            "uint64" => FieldType::UInt64,
            "double" | "float" => FieldType::Double,
            "string" | "text" => FieldType::String,
            "blob" => FieldType::Blob,
            "bool" | "boolean" => FieldType::Bool,
            "guid" => FieldType::Guid,
            _ => return None,
        };
        Some(ty)
    }

    /// Canonical name written into `schema:` header lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Int32 => "int32",
            FieldType::UInt32 => "uint32",
            FieldType::Int64 => "int64",
            FieldType::UInt64 => "uint64",
            FieldType::Double => "double",
            FieldType::String => "string",
            FieldType::Blob => "blob",
            FieldType::Bool => "bool",
            FieldType::Guid => "guid",
        }
    }

    fn integer_bounds(&self) -> Option<(i128, i128)> {
        match self {
            FieldType::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            FieldType::UInt32 => Some((0, u32::MAX as i128)),
            FieldType::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            FieldType::UInt64 | FieldType::Guid => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single sample value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    Bool(bool),
    Guid(u64),
}

impl Value {
    /// Wraps a 64-bit identifier as a `guid` value.
    pub fn guid(id: u64) -> Self {
        Value::Guid(id)
    }

    /// Short name of the variant, used in mismatch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Blob(_) => "blob",
            Value::Bool(_) => "bool",
            Value::Guid(_) => "guid",
        }
    }

    fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Int32(v) => Some(*v as i128),
            Value::UInt32(v) => Some(*v as i128),
            Value::Int64(v) => Some(*v as i128),
            Value::UInt64(v) | Value::Guid(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Converts the value to the representation required by `ty`.
    ///
    /// The error string describes why the conversion is impossible; the
    /// session attaches the field name to it.
    pub fn coerce(&self, ty: FieldType) -> Result<Value, String> {
        match ty {
            FieldType::Int32
            | FieldType::UInt32
            | FieldType::Int64
            | FieldType::UInt64
            | FieldType::Guid => self.coerce_integer(ty),
            FieldType::Double => match self {
                Value::Double(v) => Ok(Value::Double(*v)),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|_| format!("cannot parse '{}' as double", s)),
                other => match other.as_integer() {
                    Some(v) if v.abs() <= MAX_EXACT_DOUBLE_INT => Ok(Value::Double(v as f64)),
                    Some(v) => Err(format!("{} cannot be represented exactly as double", v)),
                    None => Err(format!("{} value cannot be stored as double", other.kind())),
                },
            },
            FieldType::String => match self {
                Value::String(s) => Ok(Value::String(s.clone())),
                Value::Blob(_) => Err("blob value cannot be stored as string".to_string()),
                Value::Double(v) => Ok(Value::String(v.to_string())),
                Value::Bool(v) => Ok(Value::String(v.to_string())),
                other => Ok(Value::String(
                    other.as_integer().map(|v| v.to_string()).unwrap_or_default(),
                )),
            },
            FieldType::Blob => match self {
                Value::Blob(bytes) => Ok(Value::Blob(bytes.clone())),
                Value::String(s) => Ok(Value::Blob(s.as_bytes().to_vec())),
                other => Err(format!("{} value cannot be stored as blob", other.kind())),
            },
            FieldType::Bool => match self {
                Value::Bool(v) => Ok(Value::Bool(*v)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(format!("cannot parse '{}' as bool", s)),
                },
                other => match other.as_integer() {
                    Some(0) => Ok(Value::Bool(false)),
                    Some(1) => Ok(Value::Bool(true)),
                    _ => Err(format!("{} value cannot be stored as bool", other.kind())),
                },
            },
        }
    }

    fn coerce_integer(&self, ty: FieldType) -> Result<Value, String> {
        let raw = match self {
            Value::String(s) => s
                .trim()
                .parse::<i128>()
                .map_err(|_| format!("cannot parse '{}' as {}", s, ty))?,
            other => other
                .as_integer()
                .ok_or_else(|| format!("{} value cannot be stored as {}", other.kind(), ty))?,
        };

        let (min, max) = ty
            .integer_bounds()
            .ok_or_else(|| format!("{} is not an integer type", ty))?;
        if raw < min || raw > max {
            return Err(format!("value {} out of range for {}", raw, ty));
        }

        // Bounds were checked above, so the narrowing casts are exact.
        Ok(match ty {
            FieldType::Int32 => Value::Int32(raw as i32),
            FieldType::UInt32 => Value::UInt32(raw as u32),
            FieldType::Int64 => Value::Int64(raw as i64),
            FieldType::UInt64 => Value::UInt64(raw as u64),
            _ => Value::Guid(raw as u64),
        })
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(v as f64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Blob(v.to_vec())
    }
}

/// Returns a random, non-zero 64-bit identifier for `guid` fields.
pub fn generate_guid() -> u64 {
    let mut rng = rand::thread_rng();
    loop {
        let id: u64 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}

/// Builds a `Vec<Value>` from heterogeneous expressions.
///
/// ```ignore
/// session.inject("fft", &oml_values![100i64, 2.5]).await?;
/// ```
#[macro_export]
macro_rules! oml_values {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::core::types::Value::from($value)),*]
    };
}
