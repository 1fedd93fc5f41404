use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::response::Status;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/packet-EOF_Packet.html

/// The legacy result-set terminator: `0xfe` with a total length under 9.
///
/// Connections negotiated with `DEPRECATE_EOF` never see this packet;
/// they receive an OK packet with a `0xfe` header instead.
#[derive(Debug, Clone)]
pub(crate) struct EofPacket {
    #[allow(dead_code)]
    pub(crate) warnings: u16,
    pub(crate) status: Status,
}

impl ProtocolDecode<Capabilities> for EofPacket {
    fn decode_with(mut buf: Bytes, capabilities: Capabilities) -> Result<Self> {
        buf.require(1)?;

        let tag = buf.get_u8();
        if tag != 0xfe {
            return Err(err_parse!(
                "expected 0xfe for an EOF packet, found 0x{tag:02x}"
            ));
        }

        let (warnings, status) = if capabilities.contains(Capabilities::PROTOCOL_41) {
            buf.require(4)?;
            (
                buf.get_u16_le(),
                Status::from_bits_truncate(buf.get_u16_le()),
            )
        } else {
            (0, Status::empty())
        };

        Ok(Self { warnings, status })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{EofPacket, Status};
    use crate::io::ProtocolDecode;
    use crate::protocol::Capabilities;

    #[test]
    fn decode_eof() {
        const DATA: &[u8] = b"\xfe\x00\x00\x02\x00";

        let eof =
            EofPacket::decode_with(Bytes::from_static(DATA), Capabilities::PROTOCOL_41).unwrap();

        assert_eq!(eof.warnings, 0);
        assert_eq!(eof.status, Status::AUTOCOMMIT);
    }
}
