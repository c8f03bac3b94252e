//! Reuse of [`Connection`]s across pushes and fetches to the same endpoint.

use tokio::sync::Mutex;

use dashmap::DashMap;

use crate::connection::Connection;
use crate::error::TransportError;

/// A pool of at most one live [`Connection`] per endpoint.
///
/// Push and fetch clients call [`ConnectionPool::get`] before every
/// request; a connection that a prior request already tore down (because
/// `send`/`recv` returned an error) is replaced transparently on next use.
pub struct ConnectionPool {
    connections: DashMap<String, Mutex<Option<Connection>>>,
}

impl ConnectionPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Runs `f` with a live connection to `endpoint`, connecting first if
    /// none is pooled. If `f` returns an error, the connection is dropped
    /// from the pool so the next call reconnects.
    pub async fn with_connection<F, Fut, T>(&self, endpoint: &str, f: F) -> Result<T, TransportError>
    where
        F: FnOnce(&mut Connection) -> Fut,
        Fut: std::future::Future<Output = Result<T, TransportError>>,
    {
        let slot = self
            .connections
            .entry(endpoint.to_string())
            .or_insert_with(|| Mutex::new(None));
        let mut guard = slot.lock().await;

        if guard.is_none() {
            *guard = Some(Connection::connect(endpoint).await?);
        }

        let conn = guard.as_mut().expect("connection populated above");
        match f(conn).await {
            Ok(value) => Ok(value),
            Err(err) => {
                *guard = None;
                Err(err)
            }
        }
    }

    /// Drops any pooled connection to `endpoint`, forcing a reconnect on
    /// next use.
    pub fn invalidate(&self, endpoint: &str) {
        self.connections.remove(endpoint);
    }

    /// The number of endpoints this pool currently holds a slot for,
    /// whether connected or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns `true` if the pool holds no endpoint slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_pool_is_empty() {
        let pool = ConnectionPool::new();
        assert!(pool.is_empty());
    }

    #[test]
    fn invalidate_on_empty_pool_is_a_no_op() {
        let pool = ConnectionPool::new();
        pool.invalidate("worker-1:9001");
        assert!(pool.is_empty());
    }
}
