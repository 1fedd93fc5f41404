use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-stmt-prepare.html

/// Creates a prepared statement from the passed query.
#[derive(Debug)]
pub(crate) struct Prepare<'a>(pub(crate) &'a str);

impl ProtocolEncode<Capabilities> for Prepare<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x16); // COM_STMT_PREPARE
        buf.extend_from_slice(self.0.as_bytes());

        Ok(())
    }
}
