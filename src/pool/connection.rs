use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use crate::connection::MySqlConnection;
use crate::pool::inner::SharedPool;

const DEREF_ERR: &str = "connection already returned to the pool";

/// How long a returned connection gets to drain an abandoned result set
/// before it is written off as broken.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A pooled connection, checked out to exactly one caller.
///
/// Dropping the guard returns the connection. If a result set was
/// abandoned mid-stream, the unread packets are drained on a background
/// task first; a connection that cannot drain within a grace period is
/// closed instead of pooled.
pub struct PoolConnection {
    conn: Option<MySqlConnection>,
    pool: Arc<SharedPool>,
}

impl PoolConnection {
    pub(crate) fn new(conn: MySqlConnection, pool: Arc<SharedPool>) -> Self {
        Self {
            conn: Some(conn),
            pool,
        }
    }

    /// Takes the connection out of the pool for good; the pool opens a
    /// replacement on demand.
    pub fn detach(mut self) -> MySqlConnection {
        let conn = self.conn.take().expect(DEREF_ERR);
        self.pool.release_slot();

        conn
    }
}

impl Deref for PoolConnection {
    type Target = MySqlConnection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect(DEREF_ERR)
    }
}

impl DerefMut for PoolConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect(DEREF_ERR)
    }
}

impl Drop for PoolConnection {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };

        let pool = Arc::clone(&self.pool);

        // returning may require async work (draining an abandoned result
        // set); when no runtime is available, the connection is dropped
        // and only its slot returns
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if !conn.is_ready() {
                        let drained =
                            tokio::time::timeout(DRAIN_GRACE, conn.wait_until_ready()).await;

                        if !matches!(drained, Ok(Ok(()))) {
                            log::warn!("connection failed to drain; closing it");
                            conn.poison();
                        }
                    }

                    pool.release(conn);
                });
            }

            Err(_) => pool.forget(conn),
        }
    }
}
