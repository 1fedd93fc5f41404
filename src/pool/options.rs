use std::time::Duration;

/// Sizing and timing knobs for the [`Pool`](crate::Pool).
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub(crate) max_size: u32,
    pub(crate) min_idle: u32,
    pub(crate) acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: 0,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most physical connections the pool will ever hold open.
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size.max(1);
        self
    }

    /// Connections opened eagerly when the pool is created.
    pub fn min_idle(mut self, min_idle: u32) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// How long [`acquire`](crate::Pool::acquire) waits before giving up
    /// with [`PoolTimedOut`](crate::Error::PoolTimedOut).
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}
