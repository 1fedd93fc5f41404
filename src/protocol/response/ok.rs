use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::response::Status;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/packet-OK_Packet.html
// https://mariadb.com/kb/en/ok_packet/

/// Signals successful completion of a command.
///
/// Since MySQL 5.7.5 (`DEPRECATE_EOF`), OK packets with a `0xfe` header
/// also stand in for EOF packets at the end of a result set.
#[derive(Debug, Clone)]
pub(crate) struct OkPacket {
    pub(crate) affected_rows: u64,
    pub(crate) last_insert_id: u64,
    pub(crate) status: Status,
    #[allow(dead_code)]
    pub(crate) warnings: u16,
}

impl ProtocolDecode<Capabilities> for OkPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self> {
        buf.require(1)?;

        let tag = buf.get_u8();
        if tag != 0x00 && tag != 0xfe {
            return Err(err_parse!(
                "expected 0x00 or 0xfe for an OK packet, found 0x{tag:02x}"
            ));
        }

        let affected_rows = buf.get_uint_lenenc()?;
        let last_insert_id = buf.get_uint_lenenc()?;

        let status = if capabilities.intersects(Capabilities::PROTOCOL_41 | Capabilities::TRANSACTIONS)
        {
            buf.require(2)?;
            Status::from_bits_truncate(buf.get_u16_le())
        } else {
            Status::empty()
        };

        let warnings = if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.require(2)?;
            buf.get_u16_le()
        } else {
            0
        };

        // the rest of the payload is human-readable status information,
        // which we have no use for

        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{OkPacket, Status};
    use crate::io::ProtocolDecode;
    use crate::protocol::Capabilities;

    #[test]
    fn decode_empty_ok() {
        const DATA: &[u8] = b"\x00\x00\x00\x02@\x00\x00";

        let capabilities = Capabilities::PROTOCOL_41 | Capabilities::TRANSACTIONS;
        let ok = OkPacket::decode_with(Bytes::from_static(DATA), capabilities).unwrap();

        assert_eq!(ok.affected_rows, 0);
        assert_eq!(ok.last_insert_id, 0);
        assert_eq!(ok.warnings, 0);
        assert_eq!(ok.status, Status::AUTOCOMMIT | Status::SESSION_STATE_CHANGED);
    }

    #[test]
    fn decode_insert_ok() {
        // affected_rows = 2, last_insert_id = 42
        const DATA: &[u8] = b"\x00\x02\x2a\x02\x00\x00\x00";

        let capabilities = Capabilities::PROTOCOL_41 | Capabilities::TRANSACTIONS;
        let ok = OkPacket::decode_with(Bytes::from_static(DATA), capabilities).unwrap();

        assert_eq!(ok.affected_rows, 2);
        assert_eq!(ok.last_insert_id, 42);
        assert_eq!(ok.status, Status::AUTOCOMMIT);
    }

    #[test]
    fn reject_wrong_tag() {
        const DATA: &[u8] = b"\x05\x00\x00\x02\x00\x00\x00";

        let capabilities = Capabilities::PROTOCOL_41;
        assert!(OkPacket::decode_with(Bytes::from_static(DATA), capabilities).is_err());
    }
}
