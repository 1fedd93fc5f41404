use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-ping.html

/// Checks that the connection is alive; the server always answers OK.
#[derive(Debug)]
pub(crate) struct Ping;

impl ProtocolEncode<Capabilities> for Ping {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x0e); // COM_PING

        Ok(())
    }
}
