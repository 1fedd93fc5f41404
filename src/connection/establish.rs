use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::connection::auth::{scramble, AuthResponse};
use crate::connection::machine::{Reply, ReplyMachine};
use crate::connection::stream::MySqlStream;
use crate::connection::MySqlConnection;
use crate::error::{Error, Result};
use crate::io::Transport;
use crate::options::MySqlConnectOptions;
use crate::protocol::auth_plugin::AuthPlugin;
use crate::protocol::connect::HandshakeResponse;
use crate::protocol::Capabilities;

// https://dev.mysql.com/doc/internals/en/connection-phase.html

// the connection phase performs these tasks:
//  - exchange the capabilities of client and server
//  - authenticate the client against the server

/// The largest command packet we tell the server we will send.
const MAX_PACKET_SIZE: u32 = 16_777_215;

/// Process-local connection ids, used to pin prepared statements to the
/// connection that owns them.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn client_capabilities(options: &MySqlConnectOptions) -> Capabilities {
    let mut capabilities = Capabilities::PROTOCOL_41
        | Capabilities::IGNORE_SPACE
        | Capabilities::DEPRECATE_EOF
        | Capabilities::TRANSACTIONS
        | Capabilities::SECURE_CONNECTION
        | Capabilities::PLUGIN_AUTH_LENENC_DATA
        | Capabilities::PLUGIN_AUTH;

    if options.database.is_some() {
        capabilities |= Capabilities::CONNECT_WITH_DB;
    }

    if options.allow_multiple_statements {
        capabilities |= Capabilities::MULTI_STATEMENTS | Capabilities::MULTI_RESULTS;
    }

    capabilities
}

pub(crate) async fn establish(
    socket: Box<dyn Transport>,
    options: &MySqlConnectOptions,
) -> Result<MySqlConnection> {
    let mut stream = MySqlStream::new(socket, client_capabilities(options));
    let mut machine = ReplyMachine::new();

    let payload = stream.recv_packet().await?;

    let handshake = match machine.on_packet(payload, stream.capabilities)? {
        Some(Reply::Greeting(handshake)) => handshake,

        reply => {
            return Err(Error::InvalidHandshake(format!(
                "expected the server greeting, got {reply:?}"
            )));
        }
    };

    log::debug!(
        "connected to {} (connection id {})",
        handshake.server_version,
        handshake.connection_id
    );

    // the effective capability set for the life of the connection
    stream.capabilities &= handshake.capabilities;

    if !stream.capabilities.contains(Capabilities::PROTOCOL_41) {
        return Err(Error::InvalidHandshake(
            "server does not support the 4.1 protocol".to_owned(),
        ));
    }

    if !stream.capabilities.contains(Capabilities::SECURE_CONNECTION) {
        return Err(Error::InvalidHandshake(
            "server does not support 4.1 authentication".to_owned(),
        ));
    }

    let mut plugin = handshake.auth_plugin.unwrap_or(AuthPlugin::MySqlNativePassword);
    let mut nonce: Bytes = handshake.auth_plugin_data.clone();

    let password = options.password.as_deref().unwrap_or_default();
    let auth_response = scramble(plugin, password, &nonce);

    // the response continues the handshake exchange; the sequence id is
    // *not* reset
    stream.write_packet(&HandshakeResponse {
        max_packet_size: MAX_PACKET_SIZE,
        collation: options.collation,
        username: &options.username,
        database: options.database.as_deref(),
        auth_plugin: Some(plugin),
        auth_response: &auth_response,
    })?;
    stream.flush().await?;

    let status = loop {
        let payload = stream.recv_packet().await?;

        match machine.on_packet(payload, stream.capabilities) {
            Ok(Some(Reply::AuthOk(ok))) => break ok.status,

            Ok(Some(Reply::AuthSwitch(switch))) => {
                plugin = switch.plugin;
                nonce = switch.data;

                stream.write_packet(&AuthResponse(&scramble(plugin, password, &nonce)))?;
                stream.flush().await?;
            }

            Ok(Some(Reply::AuthMoreData(data))) => match (plugin, data.first().copied()) {
                // caching_sha2_password fast path succeeded; OK follows
                (AuthPlugin::CachingSha2Password, Some(0x03)) => {}

                // the server wants the full RSA exchange
                (AuthPlugin::CachingSha2Password, Some(0x04)) => {
                    return Err(Error::unsupported(
                        "caching_sha2_password full authentication; connect over TLS \
                         with a plaintext-capable plugin or use mysql_native_password",
                    ));
                }

                (_, tag) => {
                    return Err(Error::InvalidResponse(format!(
                        "unexpected auth continuation {tag:?} for plugin `{}`",
                        plugin.name()
                    )));
                }
            },

            Ok(reply) => {
                return Err(Error::InvalidResponse(format!(
                    "unexpected reply during authentication: {reply:?}"
                )));
            }

            // ER_ACCESS_DENIED_ERROR
            Err(Error::Server(err)) if err.code() == 1045 => {
                return Err(Error::InvalidCredentials {
                    username: options.username.clone(),
                });
            }

            Err(err) => return Err(err),
        }
    };

    Ok(MySqlConnection {
        stream,
        machine,
        id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        connection_id: handshake.connection_id,
        server_version: handshake.server_version,
        status,
        query_timeout: options.query_timeout,
        statements: HashSet::new(),
    })
}
