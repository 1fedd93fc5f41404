use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-quit.html

/// Tells the server we are going away. There is no response; the server
/// closes the connection.
#[derive(Debug)]
pub(crate) struct Quit;

impl ProtocolEncode<Capabilities> for Quit {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x01); // COM_QUIT

        Ok(())
    }
}
