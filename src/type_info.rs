use crate::protocol::column::{ColumnDefinition, ColumnFlags, ColumnType};

/// The character set id of the `binary` pseudo-collation. Columns with
/// this collation hold raw bytes, not text.
const BINARY_COLLATION: u16 = 63;

/// Provides information about a MySQL column or parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlTypeInfo {
    pub(crate) ty: ColumnType,
    pub(crate) flags: ColumnFlags,
    pub(crate) charset: u16,
    pub(crate) max_size: u32,
    pub(crate) decimals: u8,
}

impl MySqlTypeInfo {
    pub(crate) fn new(def: &ColumnDefinition) -> Self {
        Self {
            ty: def.ty,
            flags: def.flags,
            charset: def.charset,
            max_size: def.max_size,
            decimals: def.decimals,
        }
    }

    pub(crate) fn is_unsigned(&self) -> bool {
        self.flags.contains(ColumnFlags::UNSIGNED)
    }

    /// Returns `true` if values of this type are raw bytes rather than
    /// text in the connection character set.
    pub(crate) fn is_binary(&self) -> bool {
        self.charset == BINARY_COLLATION
    }

    /// The display width of the column, `(M)` in types like `TINYINT(M)`.
    pub fn max_size(&self) -> u32 {
        self.max_size
    }

    /// Digits after the decimal point for numeric columns.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Returns the SQL name for this type.
    pub fn name(&self) -> &'static str {
        match (self.ty, self.is_unsigned()) {
            (ColumnType::Null, _) => "NULL",

            // TINYINT(1) is how BOOLEAN comes over the wire
            (ColumnType::Tiny, _) if self.max_size == 1 => "BOOLEAN",

            (ColumnType::Tiny, false) => "TINYINT",
            (ColumnType::Short, false) => "SMALLINT",
            (ColumnType::Int24, false) => "MEDIUMINT",
            (ColumnType::Long, false) => "INT",
            (ColumnType::LongLong, false) => "BIGINT",

            (ColumnType::Tiny, true) => "TINYINT UNSIGNED",
            (ColumnType::Short, true) => "SMALLINT UNSIGNED",
            (ColumnType::Int24, true) => "MEDIUMINT UNSIGNED",
            (ColumnType::Long, true) => "INT UNSIGNED",
            (ColumnType::LongLong, true) => "BIGINT UNSIGNED",

            (ColumnType::Year, _) => "YEAR",
            (ColumnType::Bit, _) => "BIT",

            (ColumnType::Float, _) => "FLOAT",
            (ColumnType::Double, _) => "DOUBLE",
            (ColumnType::Decimal | ColumnType::NewDecimal, _) => "DECIMAL",

            (ColumnType::Date, _) => "DATE",
            (ColumnType::Time, _) => "TIME",
            (ColumnType::Datetime, _) => "DATETIME",
            (ColumnType::Timestamp, _) => "TIMESTAMP",

            (ColumnType::VarChar | ColumnType::VarString, _) if self.is_binary() => "VARBINARY",
            (ColumnType::String, _) if self.is_binary() => "BINARY",
            (ColumnType::VarChar | ColumnType::VarString, _) => "VARCHAR",
            (ColumnType::String, _) => "CHAR",

            (ColumnType::TinyBlob, _) => "TINYBLOB",
            (ColumnType::MediumBlob, _) => "MEDIUMBLOB",
            (ColumnType::LongBlob, _) => "LONGBLOB",
            (ColumnType::Blob, _) => "BLOB",

            (ColumnType::Enum, _) => "ENUM",
            (ColumnType::Set, _) => "SET",
            (ColumnType::Json, _) => "JSON",
            (ColumnType::Geometry, _) => "GEOMETRY",
        }
    }
}
