//! `coop-pool` provides a bounded [`Channel`](crate::channel::Channel) that works the same
//! way whatever runtime it runs on, and a generic resource [`Pool`](crate::pool::Pool) built
//! on top of it, to share expensive handles (database sessions, sockets, ...) between tasks.
//!
//! The pool guarantees:
//! - it never holds more than `max_connections` connections, checked out or not;
//! - a connection is only ever handed out once at a time, and is reused in FIFO order;
//! - idle connections are evicted, but never below `min_connections` free ones;
//! - connections failing their heartbeat are closed and never handed out again.
//!
//! [`Pool`](crate::pool::Pool) is the best starting point.

pub mod channel;
pub mod pool;

pub use channel::{Backend, Channel};
pub use pool::{
    ConfigError, Connection, ConnectionId, MaintenanceHandle, Pool, PoolBuilder, PoolError,
    PoolSettings, PoolStatus, Resource,
};
