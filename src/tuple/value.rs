use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{Buf, BufMut};

use crate::common::{DbError, Result};

use super::DataType;

/// Represents a typed value stored in one field of a tuple.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Text(String),
}

impl Value {
    /// Returns true if this value can be stored in a field of the given type.
    pub fn fits(&self, data_type: &DataType) -> bool {
        match (self, data_type) {
            (Value::Bool(_), DataType::Bool)
            | (Value::Int(_), DataType::Int)
            | (Value::BigInt(_), DataType::BigInt)
            | (Value::Double(_), DataType::Double) => true,
            (Value::Text(s), DataType::Text(n)) => s.len() <= *n as usize,
            _ => false,
        }
    }

    /// Returns the integer content of an `Int` or `BigInt` value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Writes the value in its fixed-width encoding for `data_type`.
    pub fn write_to<B: BufMut>(&self, data_type: &DataType, buf: &mut B) -> Result<()> {
        match (self, data_type) {
            (Value::Bool(b), DataType::Bool) => buf.put_u8(u8::from(*b)),
            (Value::Int(v), DataType::Int) => buf.put_i32(*v),
            (Value::BigInt(v), DataType::BigInt) => buf.put_i64(*v),
            (Value::Double(v), DataType::Double) => buf.put_f64(*v),
            (Value::Text(s), DataType::Text(n)) => {
                let n = *n as usize;
                let bytes = s.as_bytes();
                if bytes.len() > n {
                    return Err(DbError::InvalidField(format!(
                        "string of {} bytes exceeds {}",
                        bytes.len(),
                        data_type
                    )));
                }
                buf.put_u32(bytes.len() as u32);
                buf.put_slice(bytes);
                buf.put_bytes(0, n - bytes.len());
            }
            (value, _) => {
                return Err(DbError::InvalidField(format!(
                    "value {} does not fit {}",
                    value, data_type
                )))
            }
        }
        Ok(())
    }

    /// Reads a value of `data_type`, consuming exactly `data_type.size()` bytes.
    pub fn read_from<B: Buf>(data_type: &DataType, buf: &mut B) -> Result<Self> {
        if buf.remaining() < data_type.size() {
            return Err(DbError::Format(format!(
                "{} bytes left, {} needs {}",
                buf.remaining(),
                data_type,
                data_type.size()
            )));
        }

        let value = match data_type {
            DataType::Bool => Value::Bool(buf.get_u8() != 0),
            DataType::Int => Value::Int(buf.get_i32()),
            DataType::BigInt => Value::BigInt(buf.get_i64()),
            DataType::Double => Value::Double(buf.get_f64()),
            DataType::Text(n) => {
                let n = *n as usize;
                let len = buf.get_u32() as usize;
                if len > n {
                    return Err(DbError::Format(format!(
                        "text length {} exceeds {}",
                        len, data_type
                    )));
                }
                let mut bytes = vec![0u8; n];
                buf.copy_to_slice(&mut bytes);
                bytes.truncate(len);
                let s = String::from_utf8(bytes)
                    .map_err(|e| DbError::Format(format!("invalid utf-8 in text field: {}", e)))?;
                Value::Text(s)
            }
        };
        Ok(value)
    }

    /// Compares two values for ordering.
    /// Returns None if the values are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::BigInt(b)) => Some((*a as i64).cmp(b)),
            (Value::BigInt(a), Value::Int(b)) => Some(a.cmp(&(*b as i64))),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::Text(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_int_encoding() {
        let mut buf = BytesMut::new();
        Value::Int(42).write_to(&DataType::Int, &mut buf).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 42]);

        let recovered = Value::read_from(&DataType::Int, &mut buf.freeze()).unwrap();
        assert_eq!(recovered, Value::Int(42));
    }

    #[test]
    fn test_text_is_padded() {
        let mut buf = BytesMut::new();
        Value::from("hi")
            .write_to(&DataType::Text(6), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 2, b'h', b'i', 0, 0, 0, 0]);

        let recovered = Value::read_from(&DataType::Text(6), &mut &buf[..]).unwrap();
        assert_eq!(recovered, Value::from("hi"));
    }

    #[test]
    fn test_text_too_long() {
        let mut buf = BytesMut::new();
        let err = Value::from("too long")
            .write_to(&DataType::Text(3), &mut buf)
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidField(_)));
    }

    #[test]
    fn test_type_mismatch() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(1).write_to(&DataType::Bool, &mut buf).is_err());
        assert!(!Value::Int(1).fits(&DataType::BigInt));
    }

    #[test]
    fn test_short_buffer() {
        let data = [0u8; 3];
        let err = Value::read_from(&DataType::Int, &mut &data[..]).unwrap_err();
        assert!(matches!(err, DbError::Format(_)));
    }

    #[test]
    fn test_comparison() {
        assert_eq!(Value::Int(10).compare(&Value::Int(20)), Some(Ordering::Less));
        assert_eq!(
            Value::Int(10).compare(&Value::BigInt(5)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Int(1).compare(&Value::from("a")), None);
    }
}
