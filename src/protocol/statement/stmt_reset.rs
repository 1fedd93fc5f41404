use crate::error::Result;
use crate::io::ProtocolEncode;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-stmt-reset.html

/// Resets a prepared statement: discards any buffered long data and
/// unbinds its parameters. The server answers with OK or ERR.
#[derive(Debug)]
pub(crate) struct StmtReset {
    pub(crate) statement_id: u32,
}

impl ProtocolEncode<Capabilities> for StmtReset {
    fn encode_with(&self, buf: &mut Vec<u8>, _: Capabilities) -> Result<()> {
        buf.push(0x1a); // COM_STMT_RESET
        buf.extend_from_slice(&self.statement_id.to_le_bytes());

        Ok(())
    }
}
