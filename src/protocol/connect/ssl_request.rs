use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::SSLRequest

/// The fixed prefix shared by the SSL request and the handshake response:
/// client capabilities, maximum packet size, collation, and 23 reserved
/// bytes.
#[derive(Debug)]
pub(crate) struct SslRequest {
    pub(crate) max_packet_size: u32,
    pub(crate) collation: u8,
}

impl ProtocolEncode<Capabilities> for SslRequest {
    fn encode_with(&self, buf: &mut Vec<u8>, context: Capabilities) -> Result<()> {
        buf.extend_from_slice(&context.bits().to_le_bytes());
        buf.extend_from_slice(&self.max_packet_size.to_le_bytes());
        buf.push(self.collation);
        buf.extend_from_slice(&[0_u8; 23]);

        Ok(())
    }
}
