use std::sync::Arc;

use futures_core::Stream;

use crate::arguments::MySqlArguments;
use crate::connection::machine::{Command, Reply};
use crate::connection::MySqlConnection;
use crate::error::{Error, Result};
use crate::protocol::column::MySqlColumn;
use crate::protocol::statement::{Execute, Prepare, StmtClose, StmtReset};
use crate::protocol::text::{Ping, Query};
use crate::row::MySqlRow;
use crate::statement::MySqlStatement;
use crate::value::QueryResult;

impl MySqlConnection {
    /// Receives one packet and runs it through the reply machine.
    ///
    /// I/O failures and query timeouts poison the connection before the
    /// error is surfaced; the machine poisons itself on protocol faults.
    async fn recv_reply(&mut self) -> Result<Option<Reply>> {
        let payload = match self.query_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.stream.recv_packet()).await {
                Ok(received) => received,

                Err(_) => {
                    self.machine.poison();
                    return Err(Error::Timeout);
                }
            },

            None => self.stream.recv_packet().await,
        };

        let payload = match payload {
            Ok(payload) => payload,

            Err(err) => {
                self.machine.poison();
                return Err(err);
            }
        };

        let reply = self.machine.on_packet(payload, self.stream.capabilities)?;

        if let Some(Reply::Done { status, .. }) = &reply {
            self.status = *status;
        }

        Ok(reply)
    }

    /// Reads (and discards) whatever remains of an abandoned command so
    /// the connection is `Idle` again.
    ///
    /// This is how a dropped [`ResultSet`] is recovered: the packets the
    /// caller never pulled are drained here, before the next command or
    /// before the pool re-issues the connection.
    pub(crate) async fn wait_until_ready(&mut self) -> Result<()> {
        if !self.stream.write_buffer_is_empty() {
            self.stream.flush().await?;
        }

        while self.machine.is_busy() {
            if let Some(Reply::ServerError(err)) = self.recv_reply().await? {
                log::debug!("discarded server error while draining: {err}");
            }
        }

        Ok(())
    }

    // A busy phase here can only come from an abandoned result set:
    // while a `ResultSet` is alive it holds the `&mut` borrow, so a
    // caller cannot reach this point mid-command. The leftover packets
    // are drained and the new command proceeds.
    async fn begin_command(&mut self, command: Command) -> Result<()> {
        self.wait_until_ready().await?;
        self.machine.begin(command)
    }

    /// Waits out the column metadata of a fresh command, ending with a
    /// [`ResultSet`] positioned before the first row (or already
    /// complete, for commands that return no rows).
    async fn read_result_header(&mut self) -> Result<(Arc<[MySqlColumn]>, Option<QueryResult>)> {
        loop {
            match self.recv_reply().await? {
                None => continue,

                Some(Reply::Columns(columns)) => return Ok((columns, None)),

                Some(Reply::Done { result, .. }) => return Ok((Vec::new().into(), Some(result))),

                Some(Reply::ServerError(err)) => return Err(Error::Server(err)),

                Some(reply) => {
                    self.machine.poison();
                    return Err(Error::UnexpectedResponse(format!(
                        "{reply:?} while reading a result set header"
                    )));
                }
            }
        }
    }

    /// Executes a statement immediately using the text protocol.
    pub async fn query(&mut self, sql: &str) -> Result<ResultSet<'_>> {
        self.begin_command(Command::Query).await?;

        log::debug!("executing query: {sql}");

        if let Err(err) = self.stream.send_packet(&Query(sql)).await {
            self.machine.poison();
            return Err(err);
        }

        let (columns, done) = self.read_result_header().await?;

        Ok(ResultSet {
            conn: self,
            columns,
            done,
        })
    }

    /// Prepares a statement for later execution.
    pub async fn prepare(&mut self, sql: &str) -> Result<MySqlStatement> {
        self.begin_command(Command::Prepare).await?;

        log::debug!("preparing statement: {sql}");

        if let Err(err) = self.stream.send_packet(&Prepare(sql)).await {
            self.machine.poison();
            return Err(err);
        }

        loop {
            match self.recv_reply().await? {
                None => continue,

                Some(Reply::Prepared {
                    statement_id,
                    parameters,
                    columns,
                }) => {
                    self.statements.insert(statement_id);

                    return Ok(MySqlStatement {
                        id: statement_id,
                        owner: self.id,
                        parameters,
                        columns: columns.into(),
                    });
                }

                Some(Reply::ServerError(err)) => return Err(Error::Server(err)),

                Some(reply) => {
                    self.machine.poison();
                    return Err(Error::UnexpectedResponse(format!(
                        "{reply:?} while preparing a statement"
                    )));
                }
            }
        }
    }

    /// Executes a prepared statement with the bound values, using the
    /// binary protocol.
    ///
    /// The bindings are validated against the statement's declared
    /// parameters before anything is written to the wire.
    pub async fn execute(
        &mut self,
        statement: &MySqlStatement,
        arguments: &MySqlArguments,
    ) -> Result<ResultSet<'_>> {
        self.check_owns(statement)?;
        arguments.check(&statement.parameters)?;

        self.begin_command(Command::Execute).await?;

        if let Err(err) = self
            .stream
            .send_packet(&Execute {
                statement_id: statement.id,
                arguments,
            })
            .await
        {
            self.machine.poison();
            return Err(err);
        }

        let (columns, done) = self.read_result_header().await?;

        Ok(ResultSet {
            conn: self,
            columns,
            done,
        })
    }

    /// Deallocates a prepared statement on the server. Fire-and-forget:
    /// `COM_STMT_CLOSE` has no response.
    pub async fn close_statement(&mut self, statement: MySqlStatement) -> Result<()> {
        self.check_owns(&statement)?;
        self.wait_until_ready().await?;

        if self.machine.is_closed() {
            return Err(Error::ConnectionClosed);
        }

        self.statements.remove(&statement.id);

        self.stream
            .send_packet(&StmtClose {
                statement_id: statement.id,
            })
            .await
    }

    /// Resets a prepared statement on the server, discarding buffered
    /// data. Expects an OK.
    pub async fn reset_statement(&mut self, statement: &MySqlStatement) -> Result<()> {
        self.check_owns(statement)?;
        self.begin_command(Command::Simple).await?;

        if let Err(err) = self
            .stream
            .send_packet(&StmtReset {
                statement_id: statement.id,
            })
            .await
        {
            self.machine.poison();
            return Err(err);
        }

        self.read_ok().await
    }

    /// Checks the connection is alive.
    pub async fn ping(&mut self) -> Result<()> {
        self.begin_command(Command::Simple).await?;

        if let Err(err) = self.stream.send_packet(&Ping).await {
            self.machine.poison();
            return Err(err);
        }

        self.read_ok().await
    }

    async fn read_ok(&mut self) -> Result<()> {
        loop {
            match self.recv_reply().await? {
                None => continue,
                Some(Reply::Done { .. }) => return Ok(()),
                Some(Reply::ServerError(err)) => return Err(Error::Server(err)),

                Some(reply) => {
                    self.machine.poison();
                    return Err(Error::UnexpectedResponse(format!(
                        "{reply:?} while waiting for OK"
                    )));
                }
            }
        }
    }

    fn check_owns(&self, statement: &MySqlStatement) -> Result<()> {
        if statement.owner != self.id {
            return Err(Error::InvalidBinding {
                message: format!(
                    "statement {} was prepared on a different connection",
                    statement.id
                ),
            });
        }

        Ok(())
    }
}

/// The reply stream of a `query` or `execute` command.
///
/// Rows are pulled on demand with [`next`](Self::next); the terminal
/// metadata is available from [`result`](Self::result) once the stream
/// is exhausted, or all at once from [`finish`](Self::finish).
///
/// Dropping a result set mid-stream is safe: the connection drains the
/// unread packets before it accepts another command.
#[must_use = "a result set does nothing until rows are pulled from it"]
#[derive(Debug)]
pub struct ResultSet<'c> {
    conn: &'c mut MySqlConnection,
    columns: Arc<[MySqlColumn]>,
    done: Option<QueryResult>,
}

impl<'c> ResultSet<'c> {
    /// The columns of the result set. Empty for commands that return no
    /// rows.
    pub fn columns(&self) -> &[MySqlColumn] {
        &self.columns
    }

    /// The terminal metadata, once the final packet has been seen.
    pub fn result(&self) -> Option<&QueryResult> {
        self.done.as_ref()
    }

    /// Pulls the next row, or `None` at the end of the result set.
    pub async fn next(&mut self) -> Result<Option<MySqlRow>> {
        if self.done.is_some() {
            return Ok(None);
        }

        loop {
            match self.conn.recv_reply().await? {
                None => continue,

                Some(Reply::Row(values)) => {
                    return Ok(Some(MySqlRow {
                        columns: Arc::clone(&self.columns),
                        values,
                    }));
                }

                Some(Reply::Done { result, .. }) => {
                    self.done = Some(result);
                    return Ok(None);
                }

                Some(Reply::ServerError(err)) => return Err(Error::Server(err)),

                Some(reply) => {
                    self.conn.machine.poison();
                    return Err(Error::UnexpectedResponse(format!(
                        "{reply:?} in the middle of a result set"
                    )));
                }
            }
        }
    }

    /// Drains any remaining rows and returns the terminal metadata.
    pub async fn finish(mut self) -> Result<QueryResult> {
        while self.next().await?.is_some() {}

        // chained result sets (multiple statements) are read off too
        self.conn.wait_until_ready().await?;

        Ok(self.done.unwrap_or_default())
    }

    /// Collects all rows, returning them with the terminal metadata.
    pub async fn try_collect(mut self) -> Result<(Vec<MySqlRow>, QueryResult)> {
        let mut rows = Vec::new();

        while let Some(row) = self.next().await? {
            rows.push(row);
        }

        let done = self.done.unwrap_or_default();
        self.conn.wait_until_ready().await?;

        Ok((rows, done))
    }

    /// Adapts the result set into a [`futures_core::Stream`] of rows.
    pub fn into_stream(self) -> impl Stream<Item = Result<MySqlRow>> + 'c {
        futures_util::stream::try_unfold(self, |mut results| async move {
            match results.next().await? {
                Some(row) => Ok(Some((row, results))),
                None => Ok(None),
            }
        })
    }
}
