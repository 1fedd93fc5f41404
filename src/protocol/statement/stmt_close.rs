use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-stmt-close.html

/// Deallocates a prepared statement on the server. No response is sent.
#[derive(Debug)]
pub(crate) struct StmtClose {
    pub(crate) statement_id: u32,
}

impl ProtocolEncode<Capabilities> for StmtClose {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x19); // COM_STMT_CLOSE
        buf.extend_from_slice(&self.statement_id.to_le_bytes());

        Ok(())
    }
}
