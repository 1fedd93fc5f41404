use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::BufExt;
use crate::protocol::column::{ColumnType, MySqlColumn};
use crate::value::{MySqlDate, MySqlDateTime, MySqlTime, MySqlValue};

// https://dev.mysql.com/doc/internals/en/binary-protocol-resultset-row.html
// https://mariadb.com/kb/en/resultset-row/#binary-resultset-row

/// One row of a binary-protocol result set: a `0x00` header, a NULL
/// bitmap with a 2-bit offset, then each non-null value in the encoding
/// implied by its column type.
#[derive(Debug)]
pub(crate) struct BinaryRow(pub(crate) Vec<MySqlValue>);

impl BinaryRow {
    pub(crate) fn decode(mut buf: Bytes, columns: &[MySqlColumn]) -> Result<Self> {
        buf.require(1)?;

        let header = buf.get_u8();
        if header != 0x00 {
            return Err(err_parse!(
                "expected 0x00 for a binary row, found 0x{header:02x}"
            ));
        }

        // the bitmap has its first two bits reserved
        let bitmap = buf.get_bytes((columns.len() + 2 + 7) / 8)?;

        let mut values = Vec::with_capacity(columns.len());

        for (index, column) in columns.iter().enumerate() {
            let bit = index + 2;

            if bitmap[bit / 8] & (1 << (bit % 8)) != 0 {
                values.push(MySqlValue::Null);
                continue;
            }

            values.push(decode_value(&mut buf, column)?);
        }

        Ok(BinaryRow(values))
    }
}

fn decode_value(buf: &mut Bytes, column: &MySqlColumn) -> Result<MySqlValue> {
    let info = &column.type_info;
    let unsigned = info.is_unsigned();

    Ok(match info.ty {
        ColumnType::Null => MySqlValue::Null,

        ColumnType::Tiny => {
            buf.require(1)?;
            if unsigned {
                MySqlValue::UInt(buf.get_u8().into())
            } else {
                MySqlValue::Int(buf.get_i8().into())
            }
        }

        ColumnType::Short | ColumnType::Year => {
            buf.require(2)?;
            if unsigned {
                MySqlValue::UInt(buf.get_u16_le().into())
            } else {
                MySqlValue::Int(buf.get_i16_le().into())
            }
        }

        ColumnType::Long | ColumnType::Int24 => {
            buf.require(4)?;
            if unsigned {
                MySqlValue::UInt(buf.get_u32_le().into())
            } else {
                MySqlValue::Int(buf.get_i32_le().into())
            }
        }

        ColumnType::LongLong => {
            buf.require(8)?;
            if unsigned {
                MySqlValue::UInt(buf.get_u64_le())
            } else {
                MySqlValue::Int(buf.get_i64_le())
            }
        }

        ColumnType::Float => {
            buf.require(4)?;
            MySqlValue::Float(buf.get_f32_le().into())
        }

        ColumnType::Double => {
            buf.require(8)?;
            MySqlValue::Float(buf.get_f64_le())
        }

        ColumnType::Date => MySqlValue::Date(decode_date(buf)?),
        ColumnType::Time => MySqlValue::Time(decode_time(buf)?),
        ColumnType::Datetime | ColumnType::Timestamp => {
            MySqlValue::DateTime(decode_datetime(buf)?)
        }

        // everything else is length-encoded bytes; whether it is text
        // depends on the column collation
        ColumnType::Decimal
        | ColumnType::NewDecimal
        | ColumnType::Bit
        | ColumnType::Json
        | ColumnType::Enum
        | ColumnType::Set
        | ColumnType::TinyBlob
        | ColumnType::MediumBlob
        | ColumnType::LongBlob
        | ColumnType::Blob
        | ColumnType::VarChar
        | ColumnType::VarString
        | ColumnType::String
        | ColumnType::Geometry => {
            let raw = buf.get_bytes_lenenc()?;

            // BIT and GEOMETRY are bytes no matter the collation
            if info.is_binary()
                || matches!(info.ty, ColumnType::Bit | ColumnType::Geometry)
            {
                MySqlValue::Bytes(raw.to_vec())
            } else {
                MySqlValue::Text(
                    String::from_utf8(raw.to_vec())
                        .map_err(|err| err_parse!("row value is not UTF-8: {err}"))?,
                )
            }
        }
    })
}

fn decode_date(buf: &mut Bytes) -> Result<MySqlDate> {
    buf.require(1)?;
    let len = buf.get_u8();

    match len {
        // zero-dates are sent with no payload at all
        0 => Ok(MySqlDate {
            year: 0,
            month: 0,
            day: 0,
        }),

        4 => {
            buf.require(4)?;

            Ok(MySqlDate {
                year: buf.get_u16_le(),
                month: buf.get_u8(),
                day: buf.get_u8(),
            })
        }

        n => Err(err_parse!("a binary DATE cannot be {n} bytes")),
    }
}

fn decode_time(buf: &mut Bytes) -> Result<MySqlTime> {
    buf.require(1)?;
    let len = buf.get_u8();

    if len == 0 {
        return Ok(MySqlTime {
            negative: false,
            hours: 0,
            minutes: 0,
            seconds: 0,
            microseconds: 0,
        });
    }

    if len != 8 && len != 12 {
        return Err(err_parse!("a binary TIME cannot be {len} bytes"));
    }

    buf.require(len as usize)?;

    let negative = buf.get_u8() != 0;
    let days = buf.get_u32_le();
    let hours = days * 24 + u32::from(buf.get_u8());
    let minutes = buf.get_u8();
    let seconds = buf.get_u8();

    let microseconds = if len == 12 { buf.get_u32_le() } else { 0 };

    Ok(MySqlTime {
        negative,
        hours,
        minutes,
        seconds,
        microseconds,
    })
}

fn decode_datetime(buf: &mut Bytes) -> Result<MySqlDateTime> {
    buf.require(1)?;
    let len = buf.get_u8();

    if len != 0 && len != 4 && len != 7 && len != 11 {
        return Err(err_parse!("a binary DATETIME cannot be {len} bytes"));
    }

    buf.require(len as usize)?;

    let mut dt = MySqlDateTime {
        date: MySqlDate {
            year: 0,
            month: 0,
            day: 0,
        },
        hour: 0,
        minute: 0,
        second: 0,
        microsecond: 0,
    };

    if len >= 4 {
        dt.date.year = buf.get_u16_le();
        dt.date.month = buf.get_u8();
        dt.date.day = buf.get_u8();
    }

    if len >= 7 {
        dt.hour = buf.get_u8();
        dt.minute = buf.get_u8();
        dt.second = buf.get_u8();
    }

    if len == 11 {
        dt.microsecond = buf.get_u32_le();
    }

    Ok(dt)
}
