use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

mod auth;
mod establish;
mod executor;
mod machine;
mod stream;

pub use executor::ResultSet;

use crate::error::{Error, Result};
use crate::io::Transport;
use crate::options::{MySqlConnectOptions, TlsMode};
use crate::protocol::response::Status;
use crate::protocol::text::Quit;
use machine::ReplyMachine;
use stream::MySqlStream;

/// A single connection to a MySQL server.
///
/// One command may be in flight at a time; the request methods take
/// `&mut self` and a [`ResultSet`] borrows the connection until its rows
/// are consumed (or it is dropped, in which case the remaining packets
/// are drained before the next command).
pub struct MySqlConnection {
    pub(crate) stream: MySqlStream,
    pub(crate) machine: ReplyMachine,

    /// Process-local identity; prepared statements are pinned to it.
    pub(crate) id: u64,

    /// The server-assigned thread id.
    pub(crate) connection_id: u32,

    pub(crate) server_version: String,
    pub(crate) status: Status,
    pub(crate) query_timeout: Option<Duration>,

    /// Ids of statements prepared (and not yet closed) on this connection.
    pub(crate) statements: HashSet<u32>,
}

impl MySqlConnection {
    /// Opens a TCP connection and performs the handshake.
    ///
    /// The configured connect timeout bounds the whole establishment.
    /// TLS is not negotiated here; with [`TlsMode::Require`] this
    /// refuses to run over plaintext -- secure the stream yourself and
    /// use [`establish_with`](Self::establish_with).
    pub async fn connect(options: &MySqlConnectOptions) -> Result<Self> {
        if options.tls.mode == TlsMode::Require {
            return Err(Error::unsupported(
                "TLS is required but `connect` only opens plaintext TCP; \
                 wrap the stream and use `establish_with`",
            ));
        }

        tokio::time::timeout(options.connect_timeout, async {
            let socket = TcpStream::connect((options.host.as_str(), options.port)).await?;
            socket.set_nodelay(true)?;

            establish::establish(Box::new(socket), options).await
        })
        .await
        .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")))?
    }

    /// Performs the handshake over a caller-supplied byte stream: a TLS
    /// wrapper, a Unix socket, or an in-process pipe in tests.
    pub async fn establish_with(
        stream: impl Transport + 'static,
        options: &MySqlConnectOptions,
    ) -> Result<Self> {
        establish::establish(Box::new(stream), options).await
    }

    /// The version string reported by the server.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// The server-assigned connection (thread) id.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Returns `true` once the connection is poisoned; it must be
    /// discarded.
    pub fn is_closed(&self) -> bool {
        self.machine.is_closed()
    }

    /// Returns `true` when no command is mid-reply (an abandoned result
    /// set leaves the connection busy until it is drained).
    pub(crate) fn is_ready(&self) -> bool {
        !self.machine.is_busy()
    }

    pub(crate) fn poison(&mut self) {
        self.machine.poison();
    }

    /// Returns `true` if the server reports an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.status.contains(Status::IN_TRANS)
    }

    /// Sends `COM_QUIT` and shuts the transport down. The server never
    /// replies; no further events are produced.
    pub async fn close(mut self) -> Result<()> {
        if !self.machine.is_closed() {
            self.machine.poison();

            // best effort: the server may already be gone
            let _ = self.stream.send_packet(&Quit).await;
        }

        self.stream.shutdown().await
    }
}

impl Debug for MySqlConnection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("connection_id", &self.connection_id)
            .field("server_version", &self.server_version)
            .finish()
    }
}
