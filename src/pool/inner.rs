use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::connection::MySqlConnection;
use crate::error::{Error, Result};
use crate::options::MySqlConnectOptions;
use crate::pool::PoolOptions;

/// What a released slot passes to the next waiter: a live connection, or
/// just permission to open a fresh one (when the released connection was
/// broken and dropped).
enum Handoff {
    Connection(MySqlConnection),
    Slot,
}

struct PoolState {
    idle: VecDeque<MySqlConnection>,

    /// Live connections: idle plus checked out plus being opened.
    size: u32,

    /// Callers waiting for a slot, oldest first. Released connections
    /// are handed straight to the front waiter, which is what keeps
    /// acquisition FIFO under saturation.
    waiters: VecDeque<oneshot::Sender<Handoff>>,

    closed: bool,
}

pub(crate) struct SharedPool {
    connect_options: MySqlConnectOptions,
    options: PoolOptions,
    state: Mutex<PoolState>,
}

enum Plan {
    Ready(MySqlConnection),
    Connect,
    Wait(oneshot::Receiver<Handoff>),
}

impl SharedPool {
    pub(crate) fn new(connect_options: MySqlConnectOptions, options: PoolOptions) -> Self {
        Self {
            connect_options,
            options,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                size: 0,
                waiters: VecDeque::new(),
                closed: false,
            }),
        }
    }

    pub(crate) fn size(&self) -> u32 {
        self.lock().size
    }

    pub(crate) fn num_idle(&self) -> usize {
        self.lock().idle.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolState> {
        // the state mutex cannot be poisoned: no panicking code runs
        // while it is held
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) async fn fill_min_idle(&self) -> Result<()> {
        for _ in 0..self.options.min_idle.min(self.options.max_size) {
            let conn = MySqlConnection::connect(&self.connect_options).await?;

            let mut state = self.lock();
            state.size += 1;
            state.idle.push_back(conn);
        }

        Ok(())
    }

    pub(crate) async fn acquire(self: &Arc<Self>) -> Result<MySqlConnection> {
        let deadline = Instant::now() + self.options.acquire_timeout;

        loop {
            let plan = {
                let mut state = self.lock();

                if state.closed {
                    return Err(Error::PoolClosed);
                }

                if let Some(conn) = state.idle.pop_front() {
                    Plan::Ready(conn)
                } else if state.size < self.options.max_size {
                    state.size += 1;
                    Plan::Connect
                } else {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push_back(tx);
                    Plan::Wait(rx)
                }
            };

            match plan {
                Plan::Ready(conn) => {
                    if conn.is_closed() {
                        // should not happen -- release refuses broken
                        // connections -- but never hand one out
                        self.forget(conn);
                        continue;
                    }

                    return Ok(conn);
                }

                Plan::Connect => {
                    match tokio::time::timeout_at(
                        deadline,
                        MySqlConnection::connect(&self.connect_options),
                    )
                    .await
                    {
                        Ok(Ok(conn)) => return Ok(conn),

                        Ok(Err(err)) => {
                            self.release_slot();
                            return Err(err);
                        }

                        Err(_) => {
                            self.release_slot();
                            return Err(Error::PoolTimedOut);
                        }
                    }
                }

                Plan::Wait(rx) => match tokio::time::timeout_at(deadline, rx).await {
                    Ok(Ok(Handoff::Connection(conn))) => {
                        if conn.is_closed() {
                            self.forget(conn);
                            continue;
                        }

                        return Ok(conn);
                    }

                    // a slot was reserved for us; open a replacement
                    Ok(Ok(Handoff::Slot)) => {
                        match tokio::time::timeout_at(
                            deadline,
                            MySqlConnection::connect(&self.connect_options),
                        )
                        .await
                        {
                            Ok(Ok(conn)) => return Ok(conn),

                            Ok(Err(err)) => {
                                self.release_slot();
                                return Err(err);
                            }

                            Err(_) => {
                                self.release_slot();
                                return Err(Error::PoolTimedOut);
                            }
                        }
                    }

                    // the pool closed out from under us; the loop will
                    // report it
                    Ok(Err(_)) => continue,

                    // our sender stays queued; `release` skips waiters
                    // whose receiver is gone
                    Err(_) => return Err(Error::PoolTimedOut),
                },
            }
        }
    }

    /// Returns a healthy connection to the pool, or drops a broken one
    /// and frees its slot.
    pub(crate) fn release(self: &Arc<Self>, conn: MySqlConnection) {
        if conn.is_closed() {
            log::warn!("discarding a broken connection instead of pooling it");
            self.forget(conn);
            return;
        }

        let mut state = self.lock();

        if state.closed {
            state.size -= 1;
            return;
        }

        let mut conn = conn;

        while let Some(waiter) = state.waiters.pop_front() {
            match waiter.send(Handoff::Connection(conn)) {
                // handed off directly; the connection never touches the
                // idle set
                Ok(()) => return,

                // that waiter gave up (timed out); try the next
                Err(Handoff::Connection(back)) => conn = back,

                Err(Handoff::Slot) => unreachable!(),
            }
        }

        state.idle.push_back(conn);
    }

    /// Drops a connection and releases its slot to the next waiter.
    pub(crate) fn forget(self: &Arc<Self>, conn: MySqlConnection) {
        drop(conn);
        self.release_slot();
    }

    /// Passes a freed slot to the first live waiter. With nobody
    /// waiting, the slot is kept and refilled in the background if
    /// shrinking would drop the pool below its idle floor; otherwise
    /// the pool shrinks.
    pub(crate) fn release_slot(self: &Arc<Self>) {
        let mut state = self.lock();

        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(Handoff::Slot).is_ok() {
                // the slot stays counted; the waiter opens the
                // replacement connection
                return;
            }
        }

        if !state.closed && state.size <= self.options.min_idle {
            drop(state);
            self.spawn_replacement();
            return;
        }

        state.size -= 1;
    }

    /// Like [`release_slot`](Self::release_slot), but never opens a
    /// replacement. Used when a replacement attempt itself failed, so a
    /// dead server does not spin the pool.
    fn abandon_slot(&self) {
        let mut state = self.lock();

        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(Handoff::Slot).is_ok() {
                return;
            }
        }

        state.size -= 1;
    }

    /// Opens a connection on a background task to hold the `min_idle`
    /// floor. The slot being replaced stays counted until the attempt
    /// resolves.
    fn spawn_replacement(self: &Arc<Self>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // no runtime to open a socket from; shrink instead
            self.abandon_slot();
            return;
        };

        let pool = Arc::clone(self);

        handle.spawn(async move {
            match MySqlConnection::connect(&pool.connect_options).await {
                Ok(conn) => pool.release(conn),

                Err(err) => {
                    log::warn!("failed to replace a discarded connection: {err}");
                    pool.abandon_slot();
                }
            }
        });
    }

    pub(crate) async fn close(&self) {
        let (idle, _waiters) = {
            let mut state = self.lock();
            state.closed = true;

            (
                std::mem::take(&mut state.idle),
                std::mem::take(&mut state.waiters),
            )
        };

        // dropping the waiters' senders wakes them into PoolClosed

        for conn in idle {
            let _ = conn.close().await;
        }
    }
}
