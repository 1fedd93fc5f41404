use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{BufExt, ProtocolDecode};
use crate::type_info::MySqlTypeInfo;

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/binary__log__types_8h.html
// https://mariadb.com/kb/en/result-set-packets/#field-types

/// The type code carried in a column definition.
///
/// Each code implies the binary-protocol encoding of the value: a
/// fixed-width integer, a fixed-width float, a length-encoded byte string,
/// or one of the length-prefixed temporal layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnType {
    Decimal = 0x00,
    Tiny = 0x01,
    Short = 0x02,
    Long = 0x03,
    Float = 0x04,
    Double = 0x05,
    Null = 0x06,
    Timestamp = 0x07,
    LongLong = 0x08,
    Int24 = 0x09,
    Date = 0x0a,
    Time = 0x0b,
    Datetime = 0x0c,
    Year = 0x0d,
    VarChar = 0x0f,
    Bit = 0x10,
    Json = 0xf5,
    NewDecimal = 0xf6,
    Enum = 0xf7,
    Set = 0xf8,
    TinyBlob = 0xf9,
    MediumBlob = 0xfa,
    LongBlob = 0xfb,
    Blob = 0xfc,
    VarString = 0xfd,
    String = 0xfe,
    Geometry = 0xff,
}

impl ColumnType {
    pub(crate) fn try_from_u8(id: u8) -> Result<Self> {
        Ok(match id {
            0x00 => ColumnType::Decimal,
            0x01 => ColumnType::Tiny,
            0x02 => ColumnType::Short,
            0x03 => ColumnType::Long,
            0x04 => ColumnType::Float,
            0x05 => ColumnType::Double,
            0x06 => ColumnType::Null,
            0x07 => ColumnType::Timestamp,
            0x08 => ColumnType::LongLong,
            0x09 => ColumnType::Int24,
            0x0a => ColumnType::Date,
            0x0b => ColumnType::Time,
            0x0c => ColumnType::Datetime,
            0x0d => ColumnType::Year,
            0x0f => ColumnType::VarChar,
            0x10 => ColumnType::Bit,
            0xf5 => ColumnType::Json,
            0xf6 => ColumnType::NewDecimal,
            0xf7 => ColumnType::Enum,
            0xf8 => ColumnType::Set,
            0xf9 => ColumnType::TinyBlob,
            0xfa => ColumnType::MediumBlob,
            0xfb => ColumnType::LongBlob,
            0xfc => ColumnType::Blob,
            0xfd => ColumnType::VarString,
            0xfe => ColumnType::String,
            0xff => ColumnType::Geometry,

            _ => return Err(err_parse!("unknown column type 0x{id:02x}")),
        })
    }
}

// https://dev.mysql.com/doc/dev/mysql-server/8.0.12/group__group__cs__column__definition__flags.html
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct ColumnFlags: u16 {
        // field cannot be NULL
        const NOT_NULL = 0x0001;

        // field is part of a primary key
        const PRIMARY_KEY = 0x0002;

        // field is part of a unique key
        const UNIQUE_KEY = 0x0004;

        // field is part of a (non-unique) key
        const MULTIPLE_KEY = 0x0008;

        // field is a blob
        const BLOB = 0x0010;

        // field is unsigned
        const UNSIGNED = 0x0020;

        // field is zero-filled
        const ZEROFILL = 0x0040;

        // field has a binary collation
        const BINARY = 0x0080;

        // field is an enum
        const ENUM = 0x0100;

        // field is auto-incremented
        const AUTO_INCREMENT = 0x0200;

        // field is a timestamp
        const TIMESTAMP = 0x0400;

        // field is a set
        const SET = 0x0800;

        // field does not have a default value
        const NO_DEFAULT_VALUE = 0x1000;

        // field is set to NOW on UPDATE
        const ON_UPDATE_NOW = 0x2000;

        // field is numeric
        const NUM = 0x8000;
    }
}

/// Describes one column of a result set.
///
/// <https://mariadb.com/kb/en/result-set-packets/#column-definition-packet>
/// <https://dev.mysql.com/doc/internals/en/com-query-response.html#packet-Protocol::ColumnDefinition>
#[derive(Debug)]
pub(crate) struct ColumnDefinition {
    pub(crate) schema: String,
    pub(crate) table: String,
    pub(crate) org_table: String,
    pub(crate) name: String,
    pub(crate) org_name: String,
    pub(crate) charset: u16,
    pub(crate) max_size: u32,
    pub(crate) ty: ColumnType,
    pub(crate) flags: ColumnFlags,
    pub(crate) decimals: u8,
}

impl ProtocolDecode for ColumnDefinition {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self> {
        // the catalog is always "def"
        let _catalog = buf.get_str_lenenc()?;

        let schema = buf.get_str_lenenc()?;
        let table = buf.get_str_lenenc()?;
        let org_table = buf.get_str_lenenc()?;
        let name = buf.get_str_lenenc()?;
        let org_name = buf.get_str_lenenc()?;

        // the fixed-length fields below are prefixed with their total
        // size, which is always 0x0c
        let fixed_len = buf.get_uint_lenenc()?;
        if fixed_len != 0x0c {
            return Err(err_parse!(
                "column definition fixed-length block is {fixed_len}, expected 12"
            ));
        }

        buf.require(12)?;

        let charset = buf.get_u16_le();
        let max_size = buf.get_u32_le();
        let ty = ColumnType::try_from_u8(buf.get_u8())?;
        let flags = ColumnFlags::from_bits_truncate(buf.get_u16_le());
        let decimals = buf.get_u8();

        Ok(Self {
            schema,
            table,
            org_table,
            name,
            org_name,
            charset,
            max_size,
            ty,
            flags,
            decimals,
        })
    }
}

/// A column of a result set or of a prepared statement's metadata.
#[derive(Debug, Clone)]
pub struct MySqlColumn {
    pub(crate) schema: String,
    pub(crate) table: String,
    pub(crate) org_table: String,
    pub(crate) name: String,
    pub(crate) org_name: String,
    pub(crate) type_info: MySqlTypeInfo,
}

impl MySqlColumn {
    pub(crate) fn new(def: ColumnDefinition) -> Self {
        let type_info = MySqlTypeInfo::new(&def);

        Self {
            schema: def.schema,
            table: def.table,
            org_table: def.org_table,
            name: def.name,
            org_name: def.org_name,
            type_info,
        }
    }

    /// The column name as it appears in the result set (the alias, if the
    /// query used one).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the column in its table, before aliasing.
    pub fn origin_name(&self) -> &str {
        &self.org_name
    }

    /// The table name as used by the query.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The schema the column's table belongs to.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// The original name of the column's table.
    pub fn origin_table(&self) -> &str {
        &self.org_table
    }

    /// Type information for the column.
    pub fn type_info(&self) -> &MySqlTypeInfo {
        &self.type_info
    }
}
