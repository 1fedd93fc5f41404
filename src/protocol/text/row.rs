use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::BufExt;
use crate::protocol::column::MySqlColumn;
use crate::value::MySqlValue;

// https://dev.mysql.com/doc/internals/en/com-query-response.html#packet-ProtocolText::ResultsetRow

/// One row of a text-protocol result set: a length-encoded string per
/// column, with the single byte `0xfb` marking SQL NULL.
#[derive(Debug)]
pub(crate) struct TextRow(pub(crate) Vec<MySqlValue>);

impl TextRow {
    pub(crate) fn decode(mut buf: Bytes, columns: &[MySqlColumn]) -> Result<Self> {
        let mut values = Vec::with_capacity(columns.len());

        for column in columns {
            buf.require(1)?;

            if buf[0] == 0xfb {
                buf.advance(1);
                values.push(MySqlValue::Null);
                continue;
            }

            let raw = buf.get_bytes_lenenc()?;

            values.push(if column.type_info.is_binary() {
                MySqlValue::Bytes(raw.to_vec())
            } else {
                MySqlValue::Text(
                    String::from_utf8(raw.to_vec())
                        .map_err(|err| err_parse!("row value is not UTF-8: {err}"))?,
                )
            });
        }

        if !buf.is_empty() {
            return Err(err_parse!(
                "{} trailing bytes after the last column of a row",
                buf.remaining()
            ));
        }

        Ok(TextRow(values))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::TextRow;
    use crate::protocol::column::{ColumnDefinition, MySqlColumn};
    use crate::io::ProtocolDecode;
    use crate::value::MySqlValue;

    fn varchar_column(name: &str) -> MySqlColumn {
        let mut def = Vec::new();
        def.extend_from_slice(b"\x03def\x00\x00\x00");
        def.push(name.len() as u8);
        def.extend_from_slice(name.as_bytes());
        def.extend_from_slice(b"\x00");
        def.extend_from_slice(b"\x0c\x21\x00\x54\x00\x00\x00\xfd\x00\x00\x1f\x00\x00");

        MySqlColumn::new(ColumnDefinition::decode_with(Bytes::from(def), ()).unwrap())
    }

    #[test]
    fn decode_text_row() {
        let columns = vec![varchar_column("a"), varchar_column("b")];

        let row = TextRow::decode(Bytes::from_static(b"\x066.0.32\xfb"), &columns).unwrap();

        assert_eq!(row.0[0], MySqlValue::Text("6.0.32".into()));
        assert_eq!(row.0[1], MySqlValue::Null);
    }

    #[test]
    fn reject_trailing_bytes() {
        let columns = vec![varchar_column("a")];

        assert!(TextRow::decode(Bytes::from_static(b"\x01x\x01y"), &columns).is_err());
    }
}
