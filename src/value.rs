use std::fmt::{self, Display, Formatter};
use std::str::from_utf8;

use crate::error::{Error, Result};

/// The terminal metadata of a completed command: how many rows were
/// touched and the last value generated for an `AUTO_INCREMENT` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub affected_rows: u64,
    pub last_insert_id: u64,
}

/// A calendar date as MySQL understands it (no timezone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

/// A (possibly negative) duration-of-day. MySQL `TIME` values can exceed
/// 24 hours, so `hours` absorbs the day component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlTime {
    pub negative: bool,
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}

/// A date and time-of-day, without timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MySqlDateTime {
    pub date: MySqlDate,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

/// A single column value.
///
/// Text-protocol result sets deliver `Text` (or `Bytes` for binary
/// collations); binary-protocol result sets decode into the variant
/// matching the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum MySqlValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(MySqlDate),
    Time(MySqlTime),
    DateTime(MySqlDateTime),
}

impl MySqlValue {
    /// A short name for the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            MySqlValue::Null => "null",
            MySqlValue::Int(_) => "int",
            MySqlValue::UInt(_) => "uint",
            MySqlValue::Float(_) => "float",
            MySqlValue::Text(_) => "string",
            MySqlValue::Bytes(_) => "bytes",
            MySqlValue::Date(_) => "date",
            MySqlValue::Time(_) => "time",
            MySqlValue::DateTime(_) => "datetime",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MySqlValue::Null)
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::InvalidTypeBound {
            given: self.kind(),
            expected: expected.to_owned(),
        }
    }

    /// Reads the value as a signed integer.
    ///
    /// Unsigned values convert when representable; strings parse
    /// strictly; anything else is a type error.
    pub fn as_i64(&self) -> Result<i64> {
        match self {
            MySqlValue::Int(v) => Ok(*v),

            MySqlValue::UInt(v) => {
                i64::try_from(*v).map_err(|_| self.mismatch("int"))
            }

            MySqlValue::Text(s) => s
                .parse()
                .map_err(|_| Error::Decoding(format!("`{s}` is not an integer"))),

            _ => Err(self.mismatch("int")),
        }
    }

    /// Reads the value as an unsigned integer.
    pub fn as_u64(&self) -> Result<u64> {
        match self {
            MySqlValue::UInt(v) => Ok(*v),

            MySqlValue::Int(v) => {
                u64::try_from(*v).map_err(|_| self.mismatch("uint"))
            }

            MySqlValue::Text(s) => s
                .parse()
                .map_err(|_| Error::Decoding(format!("`{s}` is not an unsigned integer"))),

            _ => Err(self.mismatch("uint")),
        }
    }

    /// Reads the value as a double.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            MySqlValue::Float(v) => Ok(*v),
            MySqlValue::Int(v) => Ok(*v as f64),
            MySqlValue::UInt(v) => Ok(*v as f64),

            MySqlValue::Text(s) => s
                .parse()
                .map_err(|_| Error::Decoding(format!("`{s}` is not a number"))),

            _ => Err(self.mismatch("float")),
        }
    }

    /// Borrows the value as text. Byte values must be valid UTF-8.
    pub fn as_str(&self) -> Result<&str> {
        match self {
            MySqlValue::Text(s) => Ok(s),

            MySqlValue::Bytes(b) => from_utf8(b)
                .map_err(|err| Error::Decoding(format!("bytes are not UTF-8: {err}"))),

            _ => Err(self.mismatch("string")),
        }
    }

    /// Borrows the raw bytes of a text or byte value.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        match self {
            MySqlValue::Text(s) => Ok(s.as_bytes()),
            MySqlValue::Bytes(b) => Ok(b),

            _ => Err(self.mismatch("bytes")),
        }
    }

    /// Converts the value to text; integers and floats format as decimal.
    pub fn to_text(&self) -> Result<String> {
        match self {
            MySqlValue::Text(s) => Ok(s.clone()),
            MySqlValue::Int(v) => Ok(v.to_string()),
            MySqlValue::UInt(v) => Ok(v.to_string()),
            MySqlValue::Float(v) => Ok(v.to_string()),

            _ => Err(self.mismatch("string")),
        }
    }
}

impl Display for MySqlDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl From<i8> for MySqlValue {
    fn from(v: i8) -> Self {
        MySqlValue::Int(v.into())
    }
}

impl From<i16> for MySqlValue {
    fn from(v: i16) -> Self {
        MySqlValue::Int(v.into())
    }
}

impl From<i32> for MySqlValue {
    fn from(v: i32) -> Self {
        MySqlValue::Int(v.into())
    }
}

impl From<i64> for MySqlValue {
    fn from(v: i64) -> Self {
        MySqlValue::Int(v)
    }
}

impl From<u8> for MySqlValue {
    fn from(v: u8) -> Self {
        MySqlValue::UInt(v.into())
    }
}

impl From<u16> for MySqlValue {
    fn from(v: u16) -> Self {
        MySqlValue::UInt(v.into())
    }
}

impl From<u32> for MySqlValue {
    fn from(v: u32) -> Self {
        MySqlValue::UInt(v.into())
    }
}

impl From<u64> for MySqlValue {
    fn from(v: u64) -> Self {
        MySqlValue::UInt(v)
    }
}

impl From<f32> for MySqlValue {
    fn from(v: f32) -> Self {
        MySqlValue::Float(v.into())
    }
}

impl From<f64> for MySqlValue {
    fn from(v: f64) -> Self {
        MySqlValue::Float(v)
    }
}

impl From<bool> for MySqlValue {
    fn from(v: bool) -> Self {
        MySqlValue::Int(v.into())
    }
}

impl From<&str> for MySqlValue {
    fn from(v: &str) -> Self {
        MySqlValue::Text(v.to_owned())
    }
}

impl From<String> for MySqlValue {
    fn from(v: String) -> Self {
        MySqlValue::Text(v)
    }
}

impl From<&[u8]> for MySqlValue {
    fn from(v: &[u8]) -> Self {
        MySqlValue::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for MySqlValue {
    fn from(v: Vec<u8>) -> Self {
        MySqlValue::Bytes(v)
    }
}

impl From<MySqlDate> for MySqlValue {
    fn from(v: MySqlDate) -> Self {
        MySqlValue::Date(v)
    }
}

impl From<MySqlTime> for MySqlValue {
    fn from(v: MySqlTime) -> Self {
        MySqlValue::Time(v)
    }
}

impl From<MySqlDateTime> for MySqlValue {
    fn from(v: MySqlDateTime) -> Self {
        MySqlValue::DateTime(v)
    }
}

impl<T> From<Option<T>> for MySqlValue
where
    T: Into<MySqlValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(MySqlValue::Null, Into::into)
    }
}
