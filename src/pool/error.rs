use std::time::Duration;

use crate::channel::PushErrorKind;

use super::ConnectionId;

/// Errors surfaced by [`Pool`](super::Pool) operations.
#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    /// No connection became available within the configured wait timeout.
    #[error(
        "connection pool exhausted and unable to acquire a connection within wait timeout ({wait_timeout:?})"
    )]
    Exhausted { wait_timeout: Duration },
    /// The connection no longer holds a resource (see [`Connection::take`](super::Connection::take)).
    #[error("the connection is invalid: expected a connection holding a resource, but it was empty")]
    InvalidConnection,
    /// The connection was never created by this pool, or it has already been closed.
    #[error("the connection does not belong to the connection pool")]
    NotPoolMember,
    /// The creator callback failed. The underlying error is passed through unchanged.
    #[error(transparent)]
    CreationFailed(anyhow::Error),
    /// Tearing a connection down (or probing it) failed.
    ///
    /// The pool only logs this one: by the time it happens the connection is already gone.
    #[error("failed to destroy connection {id}: {cause:#}")]
    DestructionFailed {
        id: ConnectionId,
        cause: anyhow::Error,
    },
    /// The free-list refused a connection. The connection has been closed.
    #[error("the connection could not be returned to the pool: {0}")]
    Rejected(PushErrorKind),
    /// The pool has been closed.
    #[error("the connection pool is closed")]
    Closed,
}

/// Invalid [`PoolSettings`](super::PoolSettings).
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("max_connections must be at least 1")]
    NoConnections,
    #[error("min_connections ({min}) must not exceed max_connections ({max})")]
    MinAboveMax { min: usize, max: usize },
    #[error("{name} must be a finite, non-negative number of seconds, got {value}")]
    InvalidDuration { name: &'static str, value: f64 },
    #[error("the channel can hold {capacity} connections, but the pool may open up to {max}")]
    ChannelTooSmall { capacity: usize, max: usize },
}
