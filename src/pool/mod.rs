//! A generic resource pool layered on top of a [`Channel`].
//!
//! The pool opens connections lazily through a creator callback, hands them out with
//! [`Pool::get`], takes them back with [`Pool::put`] and, on every maintenance tick
//! ([`Pool::check_connections`]), evicts idle connections and probes the others.
//!
//! ```rust
//! use coop_pool::{Pool, Resource};
//! use std::time::Duration;
//!
//! struct Session;
//!
//! #[async_trait::async_trait]
//! impl Resource for Session {
//!     async fn close(self) -> Result<(), anyhow::Error> {
//!         // e.g. send a goodbye frame before dropping the socket
//!         Ok(())
//!     }
//! }
//!
//! async fn example() -> anyhow::Result<()> {
//!     let pool = Pool::builder(|| async { Ok(Session) })
//!         .max_connections(16)
//!         .min_connections(2)
//!         .wait_timeout(Duration::from_secs(3))
//!         .build()?;
//!
//!     // evict idle connections in the background
//!     let maintenance = pool.spawn_maintenance(Duration::from_secs(1));
//!
//!     let session = pool.get().await?;
//!     // ... use the session ...
//!     pool.put(session).await?;
//!
//!     maintenance.shutdown().await;
//!     pool.close().await;
//!     Ok(())
//! }
//! ```
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::channel::{Channel, PopError};

mod builder;
mod configuration;
mod connection;
mod error;
mod hooks;
mod maintenance;

pub use builder::PoolBuilder;
pub use configuration::PoolSettings;
pub use connection::{Connection, ConnectionId, Resource};
pub use error::{ConfigError, PoolError};
pub use hooks::{CreateFn, DestroyFn, HeartbeatFn};
pub use maintenance::MaintenanceHandle;

use hooks::Hooks;

/// How long a maintenance tick waits for each free connection.
const MAINTENANCE_POP_TIMEOUT: Duration = Duration::from_millis(1);

/// A pool of `T` resources.
///
/// `Pool` is cheap to clone: clones share the same connections.
pub struct Pool<T: Resource> {
    inner: Arc<PoolInner<T>>,
}

impl<T: Resource> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct PoolInner<T: Resource> {
    settings: PoolSettings,
    idle_timeout: Duration,
    heartbeat_interval: Duration,
    wait_timeout: Duration,
    /// The free-list.
    channel: Channel<Connection<T>>,
    /// Connections that exist, free or checked out.
    current_connections: AtomicUsize,
    /// Bookkeeping for every connection the pool owns.
    /// A connection is a member of the pool if and only if it has an entry here.
    members: Mutex<HashMap<ConnectionId, Timestamps>>,
    hooks: Hooks<T>,
    closed: AtomicBool,
}

#[derive(Debug, Clone, Copy)]
struct Timestamps {
    last_used: Instant,
    last_heartbeat: Instant,
}

/// A point-in-time view of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections that exist, free or checked out.
    pub size: usize,
    /// Connections sitting in the free-list.
    pub idle: usize,
    /// The ceiling on `size`.
    pub max_size: usize,
}

impl<T: Resource> Pool<T> {
    /// Start building a [`Pool`].
    ///
    /// `creator` opens a new resource every time the pool needs to grow.
    pub fn builder<F, Fut>(creator: F) -> PoolBuilder<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, anyhow::Error>> + Send + 'static,
    {
        PoolBuilder::new(creator)
    }

    fn new(settings: PoolSettings, hooks: Hooks<T>, channel: Channel<Connection<T>>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle_timeout: settings.idle_timeout(),
                heartbeat_interval: settings.heartbeat_interval(),
                wait_timeout: settings.wait_timeout(),
                settings,
                channel,
                current_connections: AtomicUsize::new(0),
                members: Mutex::new(HashMap::new()),
                hooks,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Check a connection out of the pool.
    ///
    /// If no connection is free and the pool is below `max_connections`, a new one is opened
    /// first. Then `get` waits up to `wait_timeout` for a free connection.
    ///
    /// Failing to open a connection is not fatal on its own: a connection released in the
    /// meantime still satisfies the wait.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Exhausted`] if no connection became free within `wait_timeout`.
    /// - [`PoolError::CreationFailed`] *instead of* `Exhausted` when the pool tried to open a
    ///   connection for this call, failed, and then timed out waiting. The creator's error is
    ///   passed through unchanged.
    /// - [`PoolError::Closed`] once the pool has been closed.
    #[tracing::instrument(skip_all, name = "pool_get")]
    pub async fn get(&self) -> Result<Connection<T>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let mut creation_error = None;
        if self.inner.channel.is_empty() {
            if let Err(e) = self.grow().await {
                tracing::warn!(error = %e, "failed to open a new connection");
                creation_error = Some(e);
            }
        }

        let wait_timeout = self.inner.wait_timeout;
        let connection = match self.inner.channel.pop(Some(wait_timeout)).await {
            Ok(connection) => connection,
            Err(PopError::Closed) => return Err(PoolError::Closed),
            Err(_) => return Err(creation_error.unwrap_or(PoolError::Exhausted { wait_timeout })),
        };

        if let Some(timestamps) = self.inner.members.lock().get_mut(&connection.id()) {
            timestamps.last_used = Instant::now();
        }
        tracing::trace!(connection = %connection.id(), "connection checked out");
        Ok(connection)
    }

    /// Return a connection to the pool.
    ///
    /// `put` rejects connections that are empty ([`PoolError::InvalidConnection`]) and
    /// connections the pool does not own, or no longer owns ([`PoolError::NotPoolMember`]).
    /// If the free-list refuses the connection, it is closed and the error returned.
    #[tracing::instrument(skip_all, name = "pool_put", fields(connection = %connection.id()))]
    pub async fn put(&self, connection: Connection<T>) -> Result<(), PoolError> {
        if connection.is_empty() {
            return Err(PoolError::InvalidConnection);
        }
        // e.g. a connection checked out of another pool.
        if !self.is_member(connection.id()) {
            return Err(PoolError::NotPoolMember);
        }
        if self.is_closed() {
            self.close_connection(connection).await;
            return Err(PoolError::Closed);
        }

        if let Err(e) = self.inner.channel.push(connection, None).await {
            let kind = e.kind();
            self.close_connection(e.into_inner()).await;
            return Err(PoolError::Rejected(kind));
        }
        Ok(())
    }

    /// Open a new connection and add it to the free-list.
    ///
    /// Fails with [`PoolError::CreationFailed`] if the pool already holds `max_connections`
    /// connections or if the creator callback fails. A failed creation leaves no trace in
    /// the pool.
    #[tracing::instrument(skip_all, name = "pool_create_connection")]
    pub async fn create_connection(&self) -> Result<ConnectionId, PoolError> {
        match self.grow().await? {
            Some(id) => Ok(id),
            None => Err(PoolError::CreationFailed(anyhow!(
                "the pool already holds its maximum of {} connections",
                self.inner.settings.max_connections
            ))),
        }
    }

    /// Open one more connection, unless the pool is at capacity (`Ok(None)`).
    async fn grow(&self) -> Result<Option<ConnectionId>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }
        if !self.reserve_slot() {
            return Ok(None);
        }

        let resource = match self.inner.hooks.create().await {
            Ok(resource) => resource,
            Err(e) => {
                self.release_slot();
                return Err(PoolError::CreationFailed(e));
            }
        };

        let connection = Connection::new(resource);
        let id = connection.id();
        let now = Instant::now();
        self.inner.members.lock().insert(
            id,
            Timestamps {
                last_used: now,
                last_heartbeat: now,
            },
        );

        if let Err(e) = self.inner.channel.push(connection, None).await {
            self.inner.members.lock().remove(&id);
            self.release_slot();
            let kind = e.kind();
            let (_, resource) = e.into_inner().into_parts();
            if let Some(resource) = resource {
                self.destroy(id, resource).await;
            }
            return Err(PoolError::Rejected(kind));
        }
        tracing::debug!(connection = %id, "opened a new connection");
        Ok(Some(id))
    }

    /// Close a connection and remove it from the pool.
    ///
    /// The connection stops being a member of the pool before it is torn down: a
    /// concurrent `put` of the same connection is rejected. Teardown uses the destroyer
    /// callback, if one was configured, or [`Resource::close`]. Teardown errors are logged.
    #[tracing::instrument(skip_all, name = "pool_close_connection", fields(connection = %connection.id()))]
    pub async fn close_connection(&self, connection: Connection<T>) {
        let (id, resource) = connection.into_parts();
        // Only members count towards `current_connections`.
        if self.inner.members.lock().remove(&id).is_some() {
            self.release_slot();
        }
        if let Some(resource) = resource {
            self.destroy(id, resource).await;
        }
    }

    async fn destroy(&self, id: ConnectionId, resource: T) {
        match self.inner.hooks.destroy(resource).await {
            Ok(()) => tracing::debug!(connection = %id, "closed connection"),
            Err(cause) => {
                let error = PoolError::DestructionFailed { id, cause };
                tracing::warn!(error = %error, "connection teardown failed");
            }
        }
    }

    /// Run one maintenance pass over the free-list.
    ///
    /// Only the connections free when the pass starts are visited. Each one is:
    /// - closed, if it has not been checked out for longer than `idle_timeout` and the
    ///   free-list still holds at least `min_connections` connections without it;
    /// - otherwise probed with the heartbeat callback, if its last probe is at least
    ///   `heartbeat_interval` old, and closed if the probe fails;
    /// - put back on the free-list if it survived.
    #[tracing::instrument(skip_all, name = "pool_check_connections")]
    pub async fn check_connections(&self) {
        let now = Instant::now();
        let free = self.inner.channel.len();
        for _ in 0..free {
            let mut connection = match self.inner.channel.pop(Some(MAINTENANCE_POP_TIMEOUT)).await
            {
                Ok(connection) => connection,
                // Somebody else got there first.
                Err(_) => return,
            };
            let id = connection.id();

            let timestamps = self.inner.members.lock().get(&id).copied();
            let Some(timestamps) = timestamps else {
                self.close_connection(connection).await;
                continue;
            };

            if now.saturating_duration_since(timestamps.last_used) > self.inner.idle_timeout
                && self.inner.channel.len() >= self.inner.settings.min_connections
            {
                tracing::debug!(connection = %id, "evicting idle connection");
                self.close_connection(connection).await;
                continue;
            }

            if let Some(heartbeat) = self.inner.hooks.heartbeat.as_deref() {
                if now.saturating_duration_since(timestamps.last_heartbeat)
                    >= self.inner.heartbeat_interval
                {
                    let probe = match connection.resource_mut() {
                        Some(resource) => heartbeat(resource).await,
                        None => Err(anyhow!("the connection holds no resource")),
                    };
                    match probe {
                        Ok(()) => {
                            if let Some(timestamps) = self.inner.members.lock().get_mut(&id) {
                                timestamps.last_heartbeat = Instant::now();
                            }
                        }
                        Err(e) => {
                            let error = PoolError::DestructionFailed {
                                id,
                                cause: e.context("heartbeat failed"),
                            };
                            tracing::warn!(error = %error, "closing connection after a failed heartbeat");
                            self.close_connection(connection).await;
                            continue;
                        }
                    }
                }
            }

            if let Err(e) = self.inner.channel.push(connection, None).await {
                self.close_connection(e.into_inner()).await;
            }
        }
    }

    /// Tear the pool down.
    ///
    /// Every free connection is closed and the free-list is closed. From then on `get`
    /// fails with [`PoolError::Closed`] and connections handed back with `put` are closed.
    #[tracing::instrument(skip_all, name = "pool_close")]
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        while let Ok(connection) = self.inner.channel.pop(Some(MAINTENANCE_POP_TIMEOUT)).await {
            self.close_connection(connection).await;
        }
        self.inner.channel.close();
        tracing::info!("connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Connections that exist, free or checked out.
    pub fn current_connections(&self) -> usize {
        self.inner.current_connections.load(Ordering::SeqCst)
    }

    /// Connections sitting in the free-list.
    pub fn idle_connections(&self) -> usize {
        self.inner.channel.len()
    }

    /// Whether the connection identified by `id` belongs to this pool.
    pub fn is_member(&self, id: ConnectionId) -> bool {
        self.inner.members.lock().contains_key(&id)
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.inner.settings
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            size: self.current_connections(),
            idle: self.idle_connections(),
            max_size: self.inner.settings.max_connections,
        }
    }

    /// Claim a slot for a new connection without ever going past `max_connections`.
    fn reserve_slot(&self) -> bool {
        let max = self.inner.settings.max_connections;
        self.inner
            .current_connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < max).then_some(current + 1)
            })
            .is_ok()
    }

    fn release_slot(&self) {
        let _ = self.inner.current_connections.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |current| current.checked_sub(1),
        );
    }
}
