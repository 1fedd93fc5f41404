//! A pool of MySQL connections.
//!
//! The pool hands each connection to exactly one caller at a time;
//! callers beyond `max_size` wait in FIFO order. Broken connections are
//! discarded on release and never re-enter the idle set.

use std::sync::Arc;

mod connection;
mod inner;
mod options;

pub use connection::PoolConnection;
pub use options::PoolOptions;

use crate::error::Result;
use crate::options::MySqlConnectOptions;
use inner::SharedPool;

/// A shared handle to a connection pool. Cloning is cheap and refers to
/// the same pool.
#[derive(Clone)]
pub struct Pool(Arc<SharedPool>);

impl Pool {
    /// Creates a pool and opens its `min_idle` connections up front.
    pub async fn connect(
        connect_options: MySqlConnectOptions,
        options: PoolOptions,
    ) -> Result<Self> {
        let shared = Arc::new(SharedPool::new(connect_options, options));

        shared.fill_min_idle().await?;

        Ok(Pool(shared))
    }

    /// Retrieves a connection, waiting up to the configured acquire
    /// timeout if the pool is saturated.
    pub async fn acquire(&self) -> Result<PoolConnection> {
        let conn = self.0.acquire().await?;

        Ok(PoolConnection::new(conn, Arc::clone(&self.0)))
    }

    /// The number of live connections, idle and checked out.
    pub fn size(&self) -> u32 {
        self.0.size()
    }

    /// The number of idle connections.
    pub fn num_idle(&self) -> usize {
        self.0.num_idle()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Closes the pool: idle connections say goodbye to the server,
    /// waiters fail with [`PoolClosed`](crate::Error::PoolClosed), and
    /// checked-out connections are dropped when returned.
    pub async fn close(&self) {
        self.0.close().await;
    }
}
