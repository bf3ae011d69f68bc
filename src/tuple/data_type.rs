use std::fmt;

/// Length prefix of a `Text` field in bytes
pub const TEXT_LEN_PREFIX: usize = 4;

/// Field types a heap tuple can hold.
///
/// Every type has a fixed on-disk width so that a page can be divided into
/// equally sized slots. Integers and floats are stored big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type: 1 byte (0 = false, 1 = true)
    Bool,

    /// 32-bit signed integer: 4 bytes
    Int,

    /// 64-bit signed integer: 8 bytes
    BigInt,

    /// 64-bit floating point: 8 bytes, IEEE 754
    Double,

    /// String of at most n bytes.
    /// Stored as: length (4 bytes) + data, zero-padded to n bytes
    Text(u16),
}

impl DataType {
    /// Returns the number of bytes a value of this type occupies in a slot.
    pub fn size(&self) -> usize {
        match self {
            DataType::Bool => 1,
            DataType::Int => 4,
            DataType::BigInt => 8,
            DataType::Double => 8,
            DataType::Text(n) => TEXT_LEN_PREFIX + *n as usize,
        }
    }

    /// Returns true for the integer types.
    pub fn is_integral(&self) -> bool {
        matches!(self, DataType::Int | DataType::BigInt)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "BOOL"),
            DataType::Int => write!(f, "INT"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Text(n) => write!(f, "TEXT({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(DataType::Bool.size(), 1);
        assert_eq!(DataType::Int.size(), 4);
        assert_eq!(DataType::BigInt.size(), 8);
        assert_eq!(DataType::Double.size(), 8);
        assert_eq!(DataType::Text(128).size(), 132);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Int.to_string(), "INT");
        assert_eq!(DataType::Text(10).to_string(), "TEXT(10)");
    }
}
