use bytes::{Buf, Bytes};

use crate::error::{Error, Result};
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::auth_plugin::AuthPlugin;
use crate::protocol::response::Status;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::Handshake
// https://mariadb.com/kb/en/connection/#initial-handshake-packet

/// The initial `HandshakeV10` greeting from the server.
#[derive(Debug)]
pub(crate) struct Handshake {
    pub(crate) server_version: String,
    pub(crate) connection_id: u32,
    pub(crate) capabilities: Capabilities,
    #[allow(dead_code)]
    pub(crate) charset: u8,
    #[allow(dead_code)]
    pub(crate) status: Status,

    /// At least 20 usable bytes of auth nonce ("scramble").
    pub(crate) auth_plugin_data: Bytes,
    pub(crate) auth_plugin: Option<AuthPlugin>,
}

impl ProtocolDecode for Handshake {
    fn decode_with(mut buf: Bytes, _: ()) -> Result<Self> {
        buf.require(1)?;

        let protocol_version = buf.get_u8();
        if protocol_version != 0x0a {
            return Err(Error::InvalidHandshake(format!(
                "unsupported protocol version {protocol_version}, expected 10"
            )));
        }

        let server_version = buf.get_str_nul()?;

        buf.require(4)?;
        let connection_id = buf.get_u32_le();

        // the first 8 bytes of the nonce, then a filler byte
        let auth_data_1 = buf.get_bytes(8)?;
        buf.require(1)?;
        buf.advance(1);

        buf.require(2 + 1 + 2 + 2 + 1 + 10)?;

        let capabilities_lo = buf.get_u16_le();
        let charset = buf.get_u8();
        let status = Status::from_bits_truncate(buf.get_u16_le());
        let capabilities_hi = buf.get_u16_le();

        let capabilities = Capabilities::from_bits_truncate(
            u32::from(capabilities_lo) | (u32::from(capabilities_hi) << 16),
        );

        let auth_data_len = buf.get_u8();

        // 10 reserved bytes
        buf.advance(10);

        // the remainder of the nonce: at least 13 bytes, NUL-terminated
        let auth_data_2_len = usize::from(auth_data_len).saturating_sub(8).max(13);
        let mut auth_data_2 = buf.get_bytes(auth_data_2_len)?;

        if auth_data_2.last() == Some(&0) {
            auth_data_2.truncate(auth_data_2.len() - 1);
        }

        let mut auth_plugin_data = Vec::with_capacity(auth_data_1.len() + auth_data_2.len());
        auth_plugin_data.extend_from_slice(&auth_data_1);
        auth_plugin_data.extend_from_slice(&auth_data_2);

        if auth_plugin_data.len() < 20 {
            return Err(Error::InvalidHandshake(format!(
                "auth nonce is {} bytes, expected at least 20",
                auth_plugin_data.len()
            )));
        }

        let auth_plugin = if capabilities.contains(Capabilities::PLUGIN_AUTH) && !buf.is_empty() {
            Some(AuthPlugin::from_name(&buf.get_str_nul()?)?)
        } else {
            None
        };

        Ok(Self {
            server_version,
            connection_id,
            capabilities,
            charset,
            status,
            auth_plugin_data: auth_plugin_data.into(),
            auth_plugin,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{AuthPlugin, Capabilities, Handshake};
    use crate::io::ProtocolDecode;

    // a greeting captured from MySQL 8.0 with mysql_native_password
    fn greeting() -> Vec<u8> {
        let mut data = Vec::new();

        data.push(0x0a);
        data.extend_from_slice(b"8.0.32\0");
        data.extend_from_slice(&42_u32.to_le_bytes());
        data.extend_from_slice(b"abcdefgh"); // salt part 1
        data.push(0);
        data.extend_from_slice(&0xf7ff_u16.to_le_bytes()); // capabilities lo
        data.push(0x21);
        data.extend_from_slice(&0x0002_u16.to_le_bytes()); // status
        data.extend_from_slice(&0xc1ff_u16.to_le_bytes()); // capabilities hi
        data.push(21); // auth data length
        data.extend_from_slice(&[0; 10]);
        data.extend_from_slice(b"ijklmnopqrst\0"); // salt part 2
        data.extend_from_slice(b"mysql_native_password\0");

        data
    }

    #[test]
    fn decode_handshake() {
        let handshake = Handshake::decode_with(Bytes::from(greeting()), ()).unwrap();

        assert_eq!(handshake.server_version, "8.0.32");
        assert_eq!(handshake.connection_id, 42);
        assert_eq!(&handshake.auth_plugin_data[..], b"abcdefghijklmnopqrst");
        assert_eq!(handshake.auth_plugin, Some(AuthPlugin::MySqlNativePassword));
        assert!(handshake.capabilities.contains(Capabilities::PROTOCOL_41));
        assert!(handshake.capabilities.contains(Capabilities::PLUGIN_AUTH));
        assert!(handshake.capabilities.contains(Capabilities::DEPRECATE_EOF));
    }

    #[test]
    fn reject_wrong_protocol_version() {
        let mut data = greeting();
        data[0] = 0x09;

        assert!(Handshake::decode_with(Bytes::from(data), ()).is_err());
    }

    #[test]
    fn reject_truncated_greeting() {
        let data = greeting();

        // cut into the middle of the second nonce part
        let handshake = Handshake::decode_with(Bytes::from(data[..40].to_vec()), ());

        assert!(handshake.is_err());
    }
}
