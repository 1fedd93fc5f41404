use crate::arguments::MySqlArguments;
use crate::error::Result;
use crate::io::{BufMutExt, ProtocolEncode};
use crate::protocol::column::ColumnType;
use crate::protocol::Capabilities;
use crate::value::MySqlValue;

// https://dev.mysql.com/doc/internals/en/com-stmt-execute.html
// https://mariadb.com/kb/en/com_stmt_execute/

const NO_CURSOR: u8 = 0;

/// Flag bit in the high byte of a parameter type marking it unsigned.
const UNSIGNED_FLAG: u8 = 0x80;

/// Asks the server to execute a prepared statement with the bound values,
/// with results in the binary protocol.
#[derive(Debug)]
pub(crate) struct Execute<'a> {
    pub(crate) statement_id: u32,
    pub(crate) arguments: &'a MySqlArguments,
}

impl ProtocolEncode<Capabilities> for Execute<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x17); // COM_STMT_EXECUTE
        buf.extend_from_slice(&self.statement_id.to_le_bytes());
        buf.push(NO_CURSOR);

        // number of times to execute the statement; can only be 1
        buf.extend_from_slice(&1_u32.to_le_bytes());

        let values = self.arguments.values();

        if values.is_empty() {
            return Ok(());
        }

        // NULL bitmap, one bit per parameter
        let mut bitmap = vec![0_u8; (values.len() + 7) / 8];

        for (index, value) in values.iter().enumerate() {
            if value.is_null() {
                bitmap[index / 8] |= 1 << (index % 8);
            }
        }

        buf.extend_from_slice(&bitmap);

        // new-params-bound: the declared types follow
        buf.push(1);

        for value in values {
            let (ty, unsigned) = declared_type(value);

            buf.push(ty as u8);
            buf.push(if unsigned { UNSIGNED_FLAG } else { 0 });
        }

        for value in values {
            encode_value(buf, value);
        }

        Ok(())
    }
}

fn declared_type(value: &MySqlValue) -> (ColumnType, bool) {
    match value {
        MySqlValue::Null => (ColumnType::Null, false),
        MySqlValue::Int(_) => (ColumnType::LongLong, false),
        MySqlValue::UInt(_) => (ColumnType::LongLong, true),
        MySqlValue::Float(_) => (ColumnType::Double, false),
        MySqlValue::Text(_) => (ColumnType::VarString, false),
        MySqlValue::Bytes(_) => (ColumnType::Blob, false),
        MySqlValue::Date(_) => (ColumnType::Date, false),
        MySqlValue::Time(_) => (ColumnType::Time, false),
        MySqlValue::DateTime(_) => (ColumnType::Datetime, false),
    }
}

fn encode_value(buf: &mut Vec<u8>, value: &MySqlValue) {
    match value {
        // NULL is carried entirely by the bitmap
        MySqlValue::Null => {}

        MySqlValue::Int(v) => buf.extend_from_slice(&v.to_le_bytes()),
        MySqlValue::UInt(v) => buf.extend_from_slice(&v.to_le_bytes()),
        MySqlValue::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),

        MySqlValue::Text(v) => buf.put_str_lenenc(v),
        MySqlValue::Bytes(v) => buf.put_bytes_lenenc(v),

        MySqlValue::Date(date) => {
            buf.push(4);
            buf.extend_from_slice(&date.year.to_le_bytes());
            buf.push(date.month);
            buf.push(date.day);
        }

        MySqlValue::Time(time) => {
            buf.push(if time.microseconds > 0 { 12 } else { 8 });
            buf.push(u8::from(time.negative));

            let days = time.hours / 24;
            buf.extend_from_slice(&days.to_le_bytes());
            buf.push((time.hours % 24) as u8);
            buf.push(time.minutes);
            buf.push(time.seconds);

            if time.microseconds > 0 {
                buf.extend_from_slice(&time.microseconds.to_le_bytes());
            }
        }

        MySqlValue::DateTime(dt) => {
            buf.push(if dt.microsecond > 0 { 11 } else { 7 });
            buf.extend_from_slice(&dt.date.year.to_le_bytes());
            buf.push(dt.date.month);
            buf.push(dt.date.day);
            buf.push(dt.hour);
            buf.push(dt.minute);
            buf.push(dt.second);

            if dt.microsecond > 0 {
                buf.extend_from_slice(&dt.microsecond.to_le_bytes());
            }
        }
    }
}
