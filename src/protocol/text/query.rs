use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-query.html

/// Executes a statement immediately, with results in the text protocol.
#[derive(Debug)]
pub(crate) struct Query<'a>(pub(crate) &'a str);

impl ProtocolEncode<Capabilities> for Query<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x03); // COM_QUERY
        buf.extend_from_slice(self.0.as_bytes());

        Ok(())
    }
}
