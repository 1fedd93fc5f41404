use crate::error::Result;
use crate::io::{BufMutExt, ProtocolEncode};
use crate::protocol::auth_plugin::AuthPlugin;
use crate::protocol::connect::SslRequest;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase-packets.html#packet-Protocol::HandshakeResponse
// https://mariadb.com/kb/en/connection/#client-handshake-response

#[derive(Debug)]
pub(crate) struct HandshakeResponse<'a> {
    pub(crate) max_packet_size: u32,
    pub(crate) collation: u8,
    pub(crate) username: &'a str,
    pub(crate) database: Option<&'a str>,
    pub(crate) auth_plugin: Option<AuthPlugin>,
    pub(crate) auth_response: &'a [u8],
}

impl ProtocolEncode<Capabilities> for HandshakeResponse<'_> {
    fn encode_with(&self, buf: &mut Vec<u8>, mut context: Capabilities) -> Result<()> {
        if self.auth_plugin.is_none() {
            // PLUGIN_AUTH is advertised only when we answer a named plugin
            context.remove(Capabilities::PLUGIN_AUTH);
        }

        // the first half of this packet is identical to the SSL request
        SslRequest {
            max_packet_size: self.max_packet_size,
            collation: self.collation,
        }
        .encode_with(buf, context)?;

        buf.put_str_nul(self.username);

        if context.contains(Capabilities::PLUGIN_AUTH_LENENC_DATA) {
            buf.put_bytes_lenenc(self.auth_response);
        } else if context.contains(Capabilities::SECURE_CONNECTION) {
            let len = u8::try_from(self.auth_response.len())
                .map_err(|_| err_packet!("auth response does not fit in one byte of length"))?;

            buf.push(len);
            buf.extend_from_slice(self.auth_response);
        } else {
            buf.push(0);
        }

        if context.contains(Capabilities::CONNECT_WITH_DB) {
            if let Some(database) = self.database {
                buf.put_str_nul(database);
            } else {
                buf.push(0);
            }
        }

        if context.contains(Capabilities::PLUGIN_AUTH) {
            if let Some(plugin) = self.auth_plugin {
                buf.put_str_nul(plugin.name());
            } else {
                buf.push(0);
            }
        }

        Ok(())
    }
}
