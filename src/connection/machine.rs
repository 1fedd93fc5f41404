use std::mem;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, MySqlDatabaseError, Result};
use crate::io::{BufExt, ProtocolDecode};
use crate::protocol::column::{ColumnDefinition, MySqlColumn};
use crate::protocol::connect::{AuthSwitchRequest, Handshake};
use crate::protocol::packet::MAX_PAYLOAD;
use crate::protocol::response::{EofPacket, ErrPacket, OkPacket, Status};
use crate::protocol::statement::{BinaryRow, PrepareOk};
use crate::protocol::text::TextRow;
use crate::protocol::Capabilities;
use crate::type_info::MySqlTypeInfo;
use crate::value::{MySqlValue, QueryResult};

/// Where the connection stands in its dialogue with the server.
///
/// Exactly one phase is active at any time. Commands may begin only in
/// [`Idle`](Phase::Idle); a fatal error in any phase lands in
/// [`Closed`](Phase::Closed) and the connection must be discarded.
#[derive(Debug)]
pub(crate) enum Phase {
    /// Waiting for the server's `HandshakeV10` greeting.
    AwaitGreeting,

    /// Handshake response sent; waiting for OK, ERR, or an auth
    /// continuation.
    AwaitAuthResult,

    /// Between commands. The only phase that accepts new commands.
    Idle,

    /// A command that answers with a bare OK (`COM_PING`,
    /// `COM_STMT_RESET`) is in flight.
    AwaitOk,

    /// `COM_QUERY` or `COM_STMT_EXECUTE` sent; the next packet is an OK,
    /// an ERR, or a column count opening a result set.
    AwaitColumnCount { binary: bool },

    /// Reading the column definitions of a result set.
    ColumnDefs {
        remaining: u64,
        binary: bool,
        columns: Vec<MySqlColumn>,
    },

    /// Reading the EOF packet that separates column definitions from rows
    /// (connections without `DEPRECATE_EOF` only).
    ColumnsEof {
        binary: bool,
        columns: Vec<MySqlColumn>,
    },

    /// Streaming rows until the terminator.
    Rows {
        binary: bool,
        columns: Arc<[MySqlColumn]>,
    },

    /// `COM_STMT_PREPARE` sent; waiting for `COM_STMT_PREPARE_OK` or ERR.
    AwaitPrepareOk,

    /// Reading the parameter definitions of a prepared statement.
    PrepareParams {
        statement_id: u32,
        remaining: u16,
        column_count: u16,
        parameters: Vec<MySqlTypeInfo>,
    },

    /// Reading the EOF packet after parameter definitions.
    PrepareParamsEof {
        statement_id: u32,
        column_count: u16,
        parameters: Vec<MySqlTypeInfo>,
    },

    /// Reading the column definitions of a prepared statement.
    PrepareColumns {
        statement_id: u32,
        remaining: u16,
        parameters: Vec<MySqlTypeInfo>,
        columns: Vec<MySqlColumn>,
    },

    /// Reading the EOF packet after statement column definitions.
    PrepareColumnsEof {
        statement_id: u32,
        parameters: Vec<MySqlTypeInfo>,
        columns: Vec<MySqlColumn>,
    },

    /// The connection is poisoned; nothing more can happen on it.
    Closed,
}

/// A typed event produced by feeding a packet to the machine.
#[derive(Debug)]
pub(crate) enum Reply {
    Greeting(Handshake),
    AuthOk(OkPacket),
    AuthMoreData(Bytes),
    AuthSwitch(AuthSwitchRequest),

    /// The column metadata of a result set; rows follow.
    Columns(Arc<[MySqlColumn]>),

    /// One decoded row.
    Row(Vec<MySqlValue>),

    /// The command completed. The machine is [`Phase::Idle`] again unless
    /// the status announced another result set.
    Done {
        result: QueryResult,
        status: Status,
    },

    /// The server reported an error for the current command and has
    /// re-synchronized; the machine is [`Phase::Idle`] again.
    ServerError(MySqlDatabaseError),

    /// A statement finished preparing.
    Prepared {
        statement_id: u32,
        parameters: Vec<MySqlTypeInfo>,
        columns: Vec<MySqlColumn>,
    },
}

/// The commands a caller can start from [`Phase::Idle`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Command {
    /// `COM_QUERY`: text-protocol result set.
    Query,

    /// `COM_STMT_PREPARE`.
    Prepare,

    /// `COM_STMT_EXECUTE`: binary-protocol result set.
    Execute,

    /// A command answered by a bare OK.
    Simple,
}

/// The connection's reply state machine.
///
/// A pure transition function: `(phase, packet) -> (phase, reply)`. It
/// performs no I/O; the executor reads packets off the stream and feeds
/// them through here. Every `(phase, packet)` pair either advances the
/// machine or produces a declared error -- an error from [`on_packet`]
/// always leaves the machine [`Phase::Closed`], except for server-reported
/// command errors, which surface as [`Reply::ServerError`] with the
/// machine back at [`Phase::Idle`].
#[derive(Debug)]
pub(crate) struct ReplyMachine {
    phase: Phase,
}

impl ReplyMachine {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::AwaitGreeting,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.phase, Phase::Closed)
    }

    /// Returns `true` while a command's reply stream is unfinished.
    pub(crate) fn is_busy(&self) -> bool {
        !matches!(
            self.phase,
            Phase::Idle | Phase::Closed | Phase::AwaitGreeting | Phase::AwaitAuthResult
        )
    }

    pub(crate) fn poison(&mut self) {
        self.phase = Phase::Closed;
    }

    /// Accepts a new command, or refuses because one is already in
    /// flight ([`Error::ConnectionInUse`]) or the connection is dead
    /// ([`Error::ConnectionClosed`]).
    pub(crate) fn begin(&mut self, command: Command) -> Result<()> {
        match self.phase {
            Phase::Idle => {
                self.phase = match command {
                    Command::Query => Phase::AwaitColumnCount { binary: false },
                    Command::Execute => Phase::AwaitColumnCount { binary: true },
                    Command::Prepare => Phase::AwaitPrepareOk,
                    Command::Simple => Phase::AwaitOk,
                };

                Ok(())
            }

            Phase::Closed => Err(Error::ConnectionClosed),

            _ => Err(Error::ConnectionInUse),
        }
    }

    /// Feeds one inbound packet payload through the machine.
    ///
    /// Returns the reply the packet completes, or `None` when the packet
    /// only advanced an intermediate phase (column definitions, EOFs).
    pub(crate) fn on_packet(
        &mut self,
        payload: Bytes,
        capabilities: Capabilities,
    ) -> Result<Option<Reply>> {
        if payload.is_empty() {
            self.phase = Phase::Closed;
            return Err(err_packet!("empty packet payload"));
        }

        // taking the phase out lets the owned column vectors move from
        // one phase to the next without cloning; error paths leave the
        // placeholder `Closed` in place, which is exactly the poisoning
        // the error policy calls for
        let phase = mem::replace(&mut self.phase, Phase::Closed);

        self.transition(phase, payload, capabilities)
    }

    fn transition(
        &mut self,
        phase: Phase,
        payload: Bytes,
        capabilities: Capabilities,
    ) -> Result<Option<Reply>> {
        let tag = payload[0];

        match phase {
            Phase::AwaitGreeting => {
                if tag == 0xff {
                    // the server may refuse us before greeting properly
                    return Err(Error::Server(
                        ErrPacket::decode_with(payload, capabilities)?.into_database_error(),
                    ));
                }

                let handshake = Handshake::decode_with(payload, ())?;

                self.phase = Phase::AwaitAuthResult;

                Ok(Some(Reply::Greeting(handshake)))
            }

            Phase::AwaitAuthResult => match tag {
                0x00 => {
                    let ok = OkPacket::decode_with(payload, capabilities)?;

                    self.phase = Phase::Idle;

                    Ok(Some(Reply::AuthOk(ok)))
                }

                0x01 => {
                    self.phase = Phase::AwaitAuthResult;

                    Ok(Some(Reply::AuthMoreData(payload.slice(1..))))
                }

                0xfe => {
                    let switch = AuthSwitchRequest::decode_with(payload, ())?;

                    self.phase = Phase::AwaitAuthResult;

                    Ok(Some(Reply::AuthSwitch(switch)))
                }

                0xff => Err(Error::Server(
                    ErrPacket::decode_with(payload, capabilities)?.into_database_error(),
                )),

                _ => Err(Error::UnexpectedResponse(format!(
                    "0x{tag:02x} while authenticating"
                ))),
            },

            Phase::Idle => Err(Error::UnexpectedResponse(format!(
                "server sent 0x{tag:02x} while no command was in flight"
            ))),

            Phase::AwaitOk => match tag {
                0x00 => {
                    let ok = OkPacket::decode_with(payload, capabilities)?;

                    self.phase = Phase::Idle;

                    Ok(Some(Reply::Done {
                        result: QueryResult {
                            affected_rows: ok.affected_rows,
                            last_insert_id: ok.last_insert_id,
                        },
                        status: ok.status,
                    }))
                }

                0xff => self.server_error(payload, capabilities),

                _ => Err(Error::UnexpectedResponse(format!(
                    "0x{tag:02x} while waiting for OK"
                ))),
            },

            Phase::AwaitColumnCount { binary } => match tag {
                0x00 => {
                    let ok = OkPacket::decode_with(payload, capabilities)?;

                    Ok(Some(self.done(ok, binary)))
                }

                0xff => self.server_error(payload, capabilities),

                0xfb => Err(Error::unsupported("LOAD DATA LOCAL INFILE")),

                _ => {
                    let mut buf = payload;
                    let count = buf.get_uint_lenenc()?;

                    if count == 0 || !buf.is_empty() {
                        return Err(Error::InvalidResponse(
                            "malformed result set column count".to_owned(),
                        ));
                    }

                    self.phase = Phase::ColumnDefs {
                        remaining: count,
                        binary,
                        columns: Vec::with_capacity(count.min(128) as usize),
                    };

                    Ok(None)
                }
            },

            Phase::ColumnDefs {
                remaining,
                binary,
                mut columns,
            } => {
                if tag == 0xff {
                    return self.server_error(payload, capabilities);
                }

                let def = ColumnDefinition::decode_with(payload, ())?;
                columns.push(MySqlColumn::new(def));

                if remaining > 1 {
                    self.phase = Phase::ColumnDefs {
                        remaining: remaining - 1,
                        binary,
                        columns,
                    };

                    Ok(None)
                } else if capabilities.contains(Capabilities::DEPRECATE_EOF) {
                    Ok(Some(self.start_rows(binary, columns)))
                } else {
                    self.phase = Phase::ColumnsEof { binary, columns };

                    Ok(None)
                }
            }

            Phase::ColumnsEof { binary, columns } => match tag {
                0xfe if payload.len() < 9 => {
                    EofPacket::decode_with(payload, capabilities)?;

                    Ok(Some(self.start_rows(binary, columns)))
                }

                0xff => self.server_error(payload, capabilities),

                _ => Err(Error::UnexpectedResponse(format!(
                    "0x{tag:02x} where a column EOF was expected"
                ))),
            },

            Phase::Rows { binary, columns } => {
                if is_terminator(&payload, capabilities) {
                    let (result, status) = if capabilities.contains(Capabilities::DEPRECATE_EOF) {
                        let ok = OkPacket::decode_with(payload, capabilities)?;
                        (
                            QueryResult {
                                affected_rows: ok.affected_rows,
                                last_insert_id: ok.last_insert_id,
                            },
                            ok.status,
                        )
                    } else {
                        let eof = EofPacket::decode_with(payload, capabilities)?;
                        (QueryResult::default(), eof.status)
                    };

                    return Ok(Some(self.done_with(result, status, binary)));
                }

                if tag == 0xff {
                    return self.server_error(payload, capabilities);
                }

                let values = if binary {
                    BinaryRow::decode(payload, &columns)?.0
                } else {
                    TextRow::decode(payload, &columns)?.0
                };

                self.phase = Phase::Rows { binary, columns };

                Ok(Some(Reply::Row(values)))
            }

            Phase::AwaitPrepareOk => match tag {
                0x00 => {
                    let ok = PrepareOk::decode_with(payload, capabilities)?;

                    if ok.params > 0 {
                        self.phase = Phase::PrepareParams {
                            statement_id: ok.statement_id,
                            remaining: ok.params,
                            column_count: ok.columns,
                            parameters: Vec::with_capacity(ok.params as usize),
                        };

                        Ok(None)
                    } else {
                        Ok(self.after_prepare_params(
                            ok.statement_id,
                            ok.columns,
                            Vec::new(),
                        ))
                    }
                }

                0xff => self.server_error(payload, capabilities),

                _ => Err(Error::UnexpectedResponse(format!(
                    "0x{tag:02x} where COM_STMT_PREPARE_OK was expected"
                ))),
            },

            Phase::PrepareParams {
                statement_id,
                remaining,
                column_count,
                mut parameters,
            } => {
                if tag == 0xff {
                    return self.server_error(payload, capabilities);
                }

                let def = ColumnDefinition::decode_with(payload, ())?;
                parameters.push(MySqlTypeInfo::new(&def));

                if remaining > 1 {
                    self.phase = Phase::PrepareParams {
                        statement_id,
                        remaining: remaining - 1,
                        column_count,
                        parameters,
                    };

                    Ok(None)
                } else if capabilities.contains(Capabilities::DEPRECATE_EOF) {
                    Ok(self.after_prepare_params(statement_id, column_count, parameters))
                } else {
                    self.phase = Phase::PrepareParamsEof {
                        statement_id,
                        column_count,
                        parameters,
                    };

                    Ok(None)
                }
            }

            Phase::PrepareParamsEof {
                statement_id,
                column_count,
                parameters,
            } => match tag {
                0xfe if payload.len() < 9 => {
                    EofPacket::decode_with(payload, capabilities)?;

                    Ok(self.after_prepare_params(statement_id, column_count, parameters))
                }

                0xff => self.server_error(payload, capabilities),

                _ => Err(Error::UnexpectedResponse(format!(
                    "0x{tag:02x} where a parameter EOF was expected"
                ))),
            },

            Phase::PrepareColumns {
                statement_id,
                remaining,
                parameters,
                mut columns,
            } => {
                if tag == 0xff {
                    return self.server_error(payload, capabilities);
                }

                let def = ColumnDefinition::decode_with(payload, ())?;
                columns.push(MySqlColumn::new(def));

                if remaining > 1 {
                    self.phase = Phase::PrepareColumns {
                        statement_id,
                        remaining: remaining - 1,
                        parameters,
                        columns,
                    };

                    Ok(None)
                } else if capabilities.contains(Capabilities::DEPRECATE_EOF) {
                    self.phase = Phase::Idle;

                    Ok(Some(Reply::Prepared {
                        statement_id,
                        parameters,
                        columns,
                    }))
                } else {
                    self.phase = Phase::PrepareColumnsEof {
                        statement_id,
                        parameters,
                        columns,
                    };

                    Ok(None)
                }
            }

            Phase::PrepareColumnsEof {
                statement_id,
                parameters,
                columns,
            } => match tag {
                0xfe if payload.len() < 9 => {
                    EofPacket::decode_with(payload, capabilities)?;

                    self.phase = Phase::Idle;

                    Ok(Some(Reply::Prepared {
                        statement_id,
                        parameters,
                        columns,
                    }))
                }

                0xff => self.server_error(payload, capabilities),

                _ => Err(Error::UnexpectedResponse(format!(
                    "0x{tag:02x} where a column EOF was expected"
                ))),
            },

            Phase::Closed => Err(Error::ConnectionClosed),
        }
    }

    /// ERR inside a command: deliver it and return to `Idle`; the server
    /// has already re-synchronized.
    fn server_error(
        &mut self,
        payload: Bytes,
        capabilities: Capabilities,
    ) -> Result<Option<Reply>> {
        let err = ErrPacket::decode_with(payload, capabilities)?;

        self.phase = Phase::Idle;

        Ok(Some(Reply::ServerError(err.into_database_error())))
    }

    fn start_rows(&mut self, binary: bool, columns: Vec<MySqlColumn>) -> Reply {
        let columns: Arc<[MySqlColumn]> = columns.into();

        self.phase = Phase::Rows {
            binary,
            columns: Arc::clone(&columns),
        };

        Reply::Columns(columns)
    }

    fn done(&mut self, ok: OkPacket, binary: bool) -> Reply {
        self.done_with(
            QueryResult {
                affected_rows: ok.affected_rows,
                last_insert_id: ok.last_insert_id,
            },
            ok.status,
            binary,
        )
    }

    fn done_with(&mut self, result: QueryResult, status: Status, binary: bool) -> Reply {
        // with MULTI_STATEMENTS the server chains further result sets
        // behind this one; they must be read before the next command
        self.phase = if status.contains(Status::MORE_RESULTS_EXISTS) {
            Phase::AwaitColumnCount { binary }
        } else {
            Phase::Idle
        };

        Reply::Done { result, status }
    }

    fn after_prepare_params(
        &mut self,
        statement_id: u32,
        column_count: u16,
        parameters: Vec<MySqlTypeInfo>,
    ) -> Option<Reply> {
        if column_count > 0 {
            self.phase = Phase::PrepareColumns {
                statement_id,
                remaining: column_count,
                parameters,
                columns: Vec::with_capacity(column_count as usize),
            };

            None
        } else {
            self.phase = Phase::Idle;

            Some(Reply::Prepared {
                statement_id,
                parameters,
                columns: Vec::new(),
            })
        }
    }
}

/// Is this packet the terminator of a row stream?
///
/// Without `DEPRECATE_EOF` that is a genuine EOF packet (under 9 bytes);
/// with it, an OK packet wearing the `0xfe` header. A row whose first
/// column is large enough for an 8-byte length prefix also starts with
/// `0xfe`, but such a packet is at least `MAX_PAYLOAD` long.
fn is_terminator(payload: &Bytes, capabilities: Capabilities) -> bool {
    payload[0] == 0xfe
        && if capabilities.contains(Capabilities::DEPRECATE_EOF) {
            payload.len() < MAX_PAYLOAD
        } else {
            payload.len() < 9
        }
}
