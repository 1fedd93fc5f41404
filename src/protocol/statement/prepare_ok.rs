use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/com-stmt-prepare-response.html#packet-COM_STMT_PREPARE_OK

#[derive(Debug)]
pub(crate) struct PrepareOk {
    pub(crate) statement_id: u32,
    pub(crate) columns: u16,
    pub(crate) params: u16,
    #[allow(dead_code)]
    pub(crate) warnings: u16,
}

impl ProtocolDecode<Capabilities> for PrepareOk {
    fn decode_with(mut buf: Bytes, _: Capabilities) -> Result<Self> {
        buf.require(12)?;

        let status = buf.get_u8();
        if status != 0x00 {
            return Err(err_parse!(
                "expected 0x00 for COM_STMT_PREPARE_OK, found 0x{status:02x}"
            ));
        }

        let statement_id = buf.get_u32_le();
        let columns = buf.get_u16_le();
        let params = buf.get_u16_le();

        buf.advance(1); // reserved filler

        let warnings = buf.get_u16_le();

        Ok(Self {
            statement_id,
            columns,
            params,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::PrepareOk;
    use crate::io::ProtocolDecode;
    use crate::protocol::Capabilities;

    #[test]
    fn decode_prepare_ok() {
        const DATA: &[u8] = b"\x00\x07\x00\x00\x00\x02\x00\x01\x00\x00\x00\x00";

        let ok = PrepareOk::decode_with(Bytes::from_static(DATA), Capabilities::empty()).unwrap();

        assert_eq!(ok.statement_id, 7);
        assert_eq!(ok.columns, 2);
        assert_eq!(ok.params, 1);
        assert_eq!(ok.warnings, 0);
    }

    #[test]
    fn reject_short_payload() {
        const DATA: &[u8] = b"\x00\x07\x00\x00";

        assert!(PrepareOk::decode_with(Bytes::from_static(DATA), Capabilities::empty()).is_err());
    }
}
