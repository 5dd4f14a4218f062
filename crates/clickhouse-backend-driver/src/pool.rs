// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Connection pool.
//!
//! All bookkeeping lives under one mutex: idle clients, clients in use by
//! key, and the reverse index from client id to key. A key identifies a
//! borrower; pulling twice with the same key returns the same client.
//!
//! Creating and connecting a client runs with the mutex released. A slot
//! is reserved first so concurrent pulls still respect `max`.
//!
//! # Lifecycle
//!
//! ```text
//! create -> connect -> in use <-> idle -> disconnected
//! ```
//!
//! [`ConnectionPool::pull`] never waits: at `max` clients it fails with
//! [`Error::TooManyConnections`]. [`ConnectionPool::push`] keeps a client
//! idle only while fewer than `min` are idle, and never keeps a closed or
//! disconnected one.
//!
//! # Registry
//!
//! One pool per database alias, created on first use; see [`pool_for`],
//! [`close_pool`] and [`reset_pools`].

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, LazyLock}
};

use clickhouse_backend_core::{Error, Result};
use parking_lot::{Mutex, MutexGuard};

use crate::client::{Client, ClientFactory, ClientId};

/// Client shared between the pool and its borrower.
#[derive(Clone)]
pub struct PooledClient {
    id:     ClientId,
    key:    Arc<str>,
    client: Arc<Mutex<Box<dyn Client>>>
}

impl PooledClient {
    /// Identifier of the underlying client.
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Key the client was pulled with.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run `f` with exclusive access to the client.
    pub fn with<T>(&self, f: impl FnOnce(&mut dyn Client) -> T) -> T {
        let mut guard = self.client.lock();
        f(guard.as_mut())
    }

    fn is_connected(&self) -> bool {
        self.client.lock().is_connected()
    }

    fn disconnect(&self) {
        self.client.lock().disconnect();
    }
}

impl fmt::Debug for PooledClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledClient")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Pool counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Idle clients.
    pub idle:   usize,
    /// Clients in use.
    pub in_use: usize,
    /// Clients created since the pool was built.
    pub issued: usize
}

struct PoolState {
    idle:       Vec<Box<dyn Client>>,
    in_use:     HashMap<Arc<str>, PooledClient>,
    key_index:  HashMap<ClientId, Arc<str>>,
    next_key:   u64,
    issued:     usize,
    connecting: usize
}

/// Bounded pool of clients.
pub struct ConnectionPool {
    factory: Arc<dyn ClientFactory>,
    min:     usize,
    max:     usize,
    state:   Mutex<PoolState>
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Pool keeping up to `min` idle clients and at most `max` clients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `max` is zero or below `min`.
    pub fn new(factory: Arc<dyn ClientFactory>, min: usize, max: usize) -> Result<Self> {
        if max == 0 || min > max {
            return Err(Error::config(format!(
                "invalid pool bounds: connections_min={min}, connections_max={max}"
            )));
        }
        Ok(Self {
            factory,
            min,
            max,
            state: Mutex::new(PoolState {
                idle:       Vec::new(),
                in_use:     HashMap::new(),
                key_index:  HashMap::new(),
                next_key:   0,
                issued:     0,
                connecting: 0
            })
        })
    }

    /// Minimum number of idle clients kept.
    #[must_use]
    pub const fn min(&self) -> usize {
        self.min
    }

    /// Maximum number of clients.
    #[must_use]
    pub const fn max(&self) -> usize {
        self.max
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle:   state.idle.len(),
            in_use: state.in_use.len(),
            issued: state.issued
        }
    }

    /// Borrow a client.
    ///
    /// With a key already in use, the same client is returned. Otherwise an
    /// idle client is reused, or a new one is created and connected without
    /// holding the pool lock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyConnections`] when `max` clients exist, and
    /// the connect error of a new client.
    pub fn pull(&self, key: Option<&str>) -> Result<PooledClient> {
        let mut state = self.state.lock();
        if let Some(key) = key
            && let Some(client) = state.in_use.get(key)
        {
            return Ok(client.clone());
        }
        let client = match state.idle.pop() {
            Some(client) => client,
            None => {
                if state.idle.len() + state.in_use.len() + state.connecting >= self.max {
                    tracing::debug!(max = self.max, "connection pool exhausted");
                    return Err(Error::TooManyConnections { max: self.max });
                }
                // The slot is reserved; connecting happens without the lock.
                state.connecting += 1;
                let created = MutexGuard::unlocked(&mut state, || {
                    let mut client = self.factory.create()?;
                    client.connect()?;
                    Ok::<_, Error>(client)
                });
                state.connecting -= 1;
                let client = created?;
                state.issued += 1;
                tracing::trace!(client = client.id(), "created connection");
                if let Some(key) = key
                    && let Some(existing) = state.in_use.get(key)
                {
                    let existing = existing.clone();
                    state.idle.push(client);
                    return Ok(existing);
                }
                client
            }
        };
        let key: Arc<str> = match key {
            Some(key) => Arc::from(key),
            None => {
                state.next_key += 1;
                Arc::from(format!("#{}", state.next_key))
            }
        };
        let pooled = PooledClient {
            id:     client.id(),
            key:    Arc::clone(&key),
            client: Arc::new(Mutex::new(client))
        };
        state.key_index.insert(pooled.id, Arc::clone(&key));
        state.in_use.insert(key, pooled.clone());
        tracing::trace!(client = pooled.id, key = %pooled.key, "pulled connection");
        Ok(pooled)
    }

    /// Return a client.
    ///
    /// The client goes back to idle unless `close` is set, it is
    /// disconnected, or `min` clients are already idle; otherwise it is
    /// disconnected and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Interface`] for a client this pool did not issue or
    /// that was already returned.
    pub fn push(&self, client: PooledClient, close: bool) -> Result<()> {
        let mut state = self.state.lock();
        let Some(key) = state.key_index.remove(&client.id) else {
            return Err(Error::interface(format!(
                "client {} is not in use by this pool",
                client.id
            )));
        };
        state.in_use.remove(&key);
        let id = client.id;
        let keep = !close && state.idle.len() < self.min && client.is_connected();
        match Arc::try_unwrap(client.client) {
            Ok(inner) if keep => {
                state.idle.push(inner.into_inner());
                tracing::trace!(client = id, "connection returned to idle");
            }
            Ok(inner) => {
                let mut inner = inner.into_inner();
                inner.disconnect();
                tracing::debug!(client = id, close, "connection closed");
            }
            Err(shared) => {
                shared.lock().disconnect();
                tracing::debug!(client = id, "connection still shared, closed");
            }
        }
        Ok(())
    }

    /// Disconnect every client and empty the pool.
    pub fn cleanup(&self) {
        let mut state = self.state.lock();
        for client in &mut state.idle {
            client.disconnect();
        }
        for client in state.in_use.values() {
            client.disconnect();
        }
        let closed = state.idle.len() + state.in_use.len();
        state.idle.clear();
        state.in_use.clear();
        state.key_index.clear();
        tracing::debug!(closed, "connection pool cleaned up");
    }
}

static POOLS: LazyLock<Mutex<HashMap<String, Arc<ConnectionPool>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Pool registered for `alias`, created with `factory` on first use.
///
/// # Errors
///
/// Returns [`Error::Config`] for invalid bounds.
pub fn pool_for(
    alias: &str,
    factory: Arc<dyn ClientFactory>,
    min: usize,
    max: usize
) -> Result<Arc<ConnectionPool>> {
    let mut pools = POOLS.lock();
    if let Some(pool) = pools.get(alias) {
        return Ok(Arc::clone(pool));
    }
    let pool = Arc::new(ConnectionPool::new(factory, min, max)?);
    pools.insert(alias.to_owned(), Arc::clone(&pool));
    tracing::debug!(alias, min, max, "registered connection pool");
    Ok(pool)
}

/// Clean up and unregister the pool of `alias`.
pub fn close_pool(alias: &str) {
    if let Some(pool) = POOLS.lock().remove(alias) {
        pool.cleanup();
    }
}

/// Clean up and unregister every pool.
pub fn reset_pools() {
    let pools: Vec<_> = POOLS.lock().drain().map(|(_, pool)| pool).collect();
    for pool in pools {
        pool.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        OnceLock, Weak,
        atomic::{AtomicBool, Ordering}
    };

    use proptest::prelude::*;

    use super::*;
    use crate::mock::MockServer;

    fn pool(min: usize, max: usize) -> (MockServer, ConnectionPool) {
        let server = MockServer::new();
        let pool = ConnectionPool::new(Arc::new(server.clone()), min, max).unwrap();
        (server, pool)
    }

    #[test]
    fn same_key_same_client() {
        let (_, pool) = pool(1, 2);
        let a = pool.pull(Some("worker-1")).unwrap();
        let b = pool.pull(Some("worker-1")).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(pool.stats().in_use, 1);
        let c = pool.pull(None).unwrap();
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn saturation() {
        let (_, pool) = pool(0, 2);
        let _a = pool.pull(None).unwrap();
        let _b = pool.pull(None).unwrap();
        assert!(matches!(
            pool.pull(None).unwrap_err(),
            Error::TooManyConnections { max: 2 }
        ));
    }

    #[test]
    fn idle_reuse_up_to_min() {
        let (server, pool) = pool(1, 3);
        let a = pool.pull(None).unwrap();
        let b = pool.pull(None).unwrap();
        let a_id = a.id();
        pool.push(a, false).unwrap();
        pool.push(b, false).unwrap();
        assert_eq!(pool.stats().idle, 1);
        assert_eq!(pool.pull(None).unwrap().id(), a_id);
        assert_eq!(server.connects(), 2);
    }

    #[test]
    fn close_and_disconnected_are_dropped() {
        let (_, pool) = pool(5, 5);
        let a = pool.pull(None).unwrap();
        pool.push(a, true).unwrap();
        let b = pool.pull(None).unwrap();
        b.with(|c| c.disconnect());
        pool.push(b, false).unwrap();
        assert_eq!(pool.stats().idle, 0);
    }

    #[test]
    fn push_twice_is_an_error() {
        let (_, pool) = pool(1, 1);
        let a = pool.pull(None).unwrap();
        pool.push(a.clone(), false).unwrap();
        assert!(matches!(pool.push(a, false).unwrap_err(), Error::Interface(_)));
    }

    #[test]
    fn connect_failure_is_not_counted() {
        let (server, pool) = pool(1, 1);
        server.set_unreachable(true);
        assert!(pool.pull(None).is_err());
        server.set_unreachable(false);
        assert!(pool.pull(None).is_ok());
    }

    struct ObservingFactory {
        server: MockServer,
        pool:   OnceLock<Weak<ConnectionPool>>,
        free:   AtomicBool
    }

    impl ClientFactory for ObservingFactory {
        fn create(&self) -> Result<Box<dyn Client>> {
            if let Some(pool) = self.pool.get().and_then(Weak::upgrade) {
                let state = pool.state.try_lock();
                let reserved = state.as_ref().is_some_and(|s| s.connecting == 1);
                self.free.store(reserved, Ordering::SeqCst);
            }
            self.server.create()
        }
    }

    #[test]
    fn connects_with_the_lock_released() {
        let factory = Arc::new(ObservingFactory {
            server: MockServer::new(),
            pool:   OnceLock::new(),
            free:   AtomicBool::new(false)
        });
        let pool = Arc::new(ConnectionPool::new(factory.clone(), 0, 1).unwrap());
        factory.pool.set(Arc::downgrade(&pool)).unwrap();

        let client = pool.pull(None).unwrap();
        assert!(factory.free.load(Ordering::SeqCst));
        assert!(client.with(|c| c.is_connected()));
        assert_eq!(pool.state.lock().connecting, 0);
        assert!(matches!(
            pool.pull(None).unwrap_err(),
            Error::TooManyConnections { max: 1 }
        ));
    }

    #[test]
    fn failed_connect_releases_the_slot() {
        let (server, pool) = pool(0, 1);
        server.set_unreachable(true);
        assert!(pool.pull(None).is_err());
        assert_eq!(pool.state.lock().connecting, 0);
        assert_eq!(pool.stats().issued, 0);
    }

    #[test]
    fn cleanup_disconnects_everything() {
        let (_, pool) = pool(2, 4);
        let a = pool.pull(None).unwrap();
        let b = pool.pull(None).unwrap();
        pool.push(b, false).unwrap();
        pool.cleanup();
        assert_eq!(pool.stats().idle + pool.stats().in_use, 0);
        assert!(!a.with(|c| c.is_connected()));
    }

    #[test]
    fn invalid_bounds() {
        let server = MockServer::new();
        assert!(ConnectionPool::new(Arc::new(server.clone()), 3, 2).is_err());
        assert!(ConnectionPool::new(Arc::new(server), 0, 0).is_err());
    }

    #[test]
    fn registry_per_alias() {
        let server = Arc::new(MockServer::new());
        let a = pool_for("pool-registry-test", server.clone(), 1, 2).unwrap();
        let b = pool_for("pool-registry-test", server, 5, 9).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        let held = a.pull(None).unwrap();
        close_pool("pool-registry-test");
        assert!(!held.with(|c| c.is_connected()));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Pull(Option<u8>),
        Push(usize, bool)
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            proptest::option::of(0_u8..4).prop_map(Op::Pull),
            (0_usize..8, proptest::bool::weighted(0.2)).prop_map(|(i, c)| Op::Push(i, c))
        ]
    }

    proptest! {
        #[test]
        fn bounds_hold(min in 0_usize..4, extra in 0_usize..4, ops in prop::collection::vec(op(), 0..60)) {
            let max = min + extra + 1;
            let (_, pool) = pool(min, max);
            let mut held: Vec<PooledClient> = Vec::new();
            for op in ops {
                match op {
                    Op::Pull(key) => {
                        let key = key.map(|k| format!("k{k}"));
                        if let Ok(client) = pool.pull(key.as_deref())
                            && !held.iter().any(|h| h.id() == client.id())
                        {
                            held.push(client);
                        }
                    }
                    Op::Push(i, close) if !held.is_empty() => {
                        let client = held.remove(i % held.len());
                        pool.push(client, close).unwrap();
                    }
                    Op::Push(..) => {}
                }
                let stats = pool.stats();
                prop_assert!(stats.idle + stats.in_use <= max);
                prop_assert!(stats.idle <= min);
                prop_assert_eq!(stats.in_use, held.len());
            }
            let alive = pool.stats().idle + held.len();
            for client in held {
                pool.push(client, false).unwrap();
            }
            prop_assert_eq!(pool.stats().idle, min.min(alive));
        }
    }
}
