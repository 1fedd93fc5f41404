use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::io;

use thiserror::Error;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents all the ways a method can fail within the client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Error communicating with the database server.
    #[error("error communicating with the server: {0}")]
    Io(#[from] io::Error),

    /// The server greeting could not be understood.
    #[error("invalid server handshake: {0}")]
    InvalidHandshake(String),

    /// A response packet arrived that is not valid for the current command.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A packet violated the framing layer: bad header, bad sequence id,
    /// or an empty payload where one is required.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// A packet payload did not parse as the expected message.
    #[error("error parsing packet: {0}")]
    Parsing(String),

    /// A column value could not be decoded as the requested type.
    #[error("error decoding value: {0}")]
    Decoding(String),

    /// The server rejected the authentication attempt.
    #[error("invalid credentials for user `{username}`")]
    InvalidCredentials { username: String },

    /// The server requested something this client does not implement.
    #[error("unsupported by this client: {what}")]
    Unsupported { what: String },

    /// A command was issued while another command was still in flight
    /// on the same connection.
    ///
    /// The public API rules this out at compile time: commands take
    /// `&mut self`, and a [`ResultSet`](crate::ResultSet) keeps the
    /// connection borrowed until it is consumed or dropped (a dropped
    /// result set is drained, not an error). The reply machine keeps
    /// the runtime check as its own guard.
    #[error("connection is already executing a command")]
    ConnectionInUse,

    /// The connection was poisoned by an earlier protocol or I/O error.
    #[error("connection is closed")]
    ConnectionClosed,

    /// The server sent a packet that no state expects.
    #[error("unexpected response from the server: {0}")]
    UnexpectedResponse(String),

    /// A bound value cannot be assigned to the parameter's declared type.
    #[error("cannot bind a {given} value to a `{expected}` parameter")]
    InvalidTypeBound {
        given: &'static str,
        expected: String,
    },

    /// A statement or value was used with a connection that does not own it.
    #[error("invalid binding: {message}")]
    InvalidBinding { message: String },

    /// More values were bound than the statement declares parameters.
    #[error("more values bound than the statement has parameters")]
    TooManyParametersBound,

    /// Fewer values were bound than the statement declares parameters.
    #[error("fewer values bound than the statement has parameters")]
    NotEnoughParametersBound,

    /// An error reported by the server while executing a command.
    ///
    /// The connection survives; the server has re-synchronized.
    #[error(transparent)]
    Server(#[from] MySqlDatabaseError),

    /// The per-query deadline elapsed. The connection is poisoned.
    #[error("query timed out")]
    Timeout,

    /// The pool's acquire deadline elapsed before a connection freed up.
    #[error("timed out waiting for a pool connection")]
    PoolTimedOut,

    /// The pool was closed while waiting for a connection.
    #[error("pool is closed")]
    PoolClosed,
}

impl Error {
    pub(crate) fn unsupported(what: impl Into<String>) -> Self {
        Error::Unsupported { what: what.into() }
    }
}

/// An error returned from the MySQL server in an ERR packet.
#[derive(Debug, Clone)]
pub struct MySqlDatabaseError {
    pub(crate) code: u16,
    pub(crate) sql_state: Option<String>,
    pub(crate) message: String,
}

impl MySqlDatabaseError {
    /// Returns the server error code.
    ///
    /// All possible codes are documented in the
    /// [Server Error Message Reference](https://dev.mysql.com/doc/mysql-errors/8.0/en/server-error-reference.html).
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// Returns the five-character [SQLSTATE](https://en.wikipedia.org/wiki/SQLSTATE)
    /// code, if the server sent one.
    pub fn sql_state(&self) -> Option<&str> {
        self.sql_state.as_deref()
    }

    /// Returns the human-readable error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for MySqlDatabaseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.sql_state {
            Some(state) => write!(f, "{} ({}): {}", self.code, state, self.message),
            None => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

impl StdError for MySqlDatabaseError {}

macro_rules! err_parse {
    ($($arg:tt)*) => {
        $crate::error::Error::Parsing(format!($($arg)*))
    };
}

macro_rules! err_packet {
    ($($arg:tt)*) => {
        $crate::error::Error::InvalidPacket(format!($($arg)*))
    };
}
