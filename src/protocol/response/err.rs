use bytes::{Buf, Bytes};

use crate::error::{MySqlDatabaseError, Result};
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/packet-ERR_Packet.html
// https://mariadb.com/kb/en/err_packet/

/// An error reported by the server.
#[derive(Debug)]
pub(crate) struct ErrPacket {
    pub(crate) error_code: u16,
    pub(crate) sql_state: Option<String>,
    pub(crate) error_message: String,
}

impl ErrPacket {
    pub(crate) fn into_database_error(self) -> MySqlDatabaseError {
        MySqlDatabaseError {
            code: self.error_code,
            sql_state: self.sql_state,
            message: self.error_message,
        }
    }
}

impl ProtocolDecode<Capabilities> for ErrPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self> {
        buf.require(3)?;

        let tag = buf.get_u8();
        if tag != 0xff {
            return Err(err_parse!(
                "expected 0xff for an ERR packet, found 0x{tag:02x}"
            ));
        }

        let error_code = buf.get_u16_le();

        // if the next byte is '#' the 5-character SQL state follows
        let sql_state = if capabilities.contains(Capabilities::PROTOCOL_41)
            && buf.first() == Some(&b'#')
        {
            buf.advance(1);
            Some(buf.get_str(5)?)
        } else {
            None
        };

        let error_message = buf.get_str_eof()?;

        Ok(Self {
            error_code,
            sql_state,
            error_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::ErrPacket;
    use crate::io::ProtocolDecode;
    use crate::protocol::Capabilities;

    #[test]
    fn decode_err_without_sql_state() {
        const DATA: &[u8] = b"\xff\xe3\x04Client does not support authentication protocol requested by server; consider upgrading MySQL client";

        let err =
            ErrPacket::decode_with(Bytes::from_static(DATA), Capabilities::PROTOCOL_41).unwrap();

        assert_eq!(err.error_code, 1251);
        assert_eq!(err.sql_state, None);
        assert!(err.error_message.starts_with("Client does not support"));
    }

    #[test]
    fn decode_err_unknown_table() {
        const DATA: &[u8] = b"\xff\x7a\x04#42S02Table 'nope' doesn't exist";

        let err =
            ErrPacket::decode_with(Bytes::from_static(DATA), Capabilities::PROTOCOL_41).unwrap();

        assert_eq!(err.error_code, 1146);
        assert_eq!(err.sql_state.as_deref(), Some("42S02"));
        assert_eq!(err.error_message, "Table 'nope' doesn't exist");
    }
}
