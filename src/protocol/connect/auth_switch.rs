use bytes::{Buf, Bytes};

use crate::error::Result;
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::auth_plugin::AuthPlugin;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::AuthSwitchRequest

/// During the handshake phase the server may ask us to redo the scramble
/// with a different plugin and a fresh nonce.
///
/// Distinguished from an EOF packet by its length (9 or more bytes).
#[derive(Debug)]
pub(crate) struct AuthSwitchRequest {
    pub(crate) plugin: AuthPlugin,
    pub(crate) data: Bytes,
}

impl ProtocolDecode for AuthSwitchRequest {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self> {
        buf.require(1)?;

        let tag = buf.get_u8();
        if tag != 0xfe {
            return Err(err_parse!(
                "expected 0xfe for an auth switch request, found 0x{tag:02x}"
            ));
        }

        let plugin = AuthPlugin::from_name(&buf.get_str_nul()?)?;

        // the nonce comes with a trailing NUL
        let mut data = buf;
        if data.last() == Some(&0) {
            data.truncate(data.len() - 1);
        }

        Ok(Self { plugin, data })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{AuthPlugin, AuthSwitchRequest};
    use crate::io::ProtocolDecode;

    #[test]
    fn decode_auth_switch() {
        let mut data = b"\xfemysql_native_password\0".to_vec();
        data.extend_from_slice(b"abcdefghijklmnopqrst\0");

        let req = AuthSwitchRequest::decode_with(Bytes::from(data), ()).unwrap();

        assert_eq!(req.plugin, AuthPlugin::MySqlNativePassword);
        assert_eq!(&req.data[..], b"abcdefghijklmnopqrst");
    }
}
