//! Pooled handles and the contract resources must fulfil.
use std::fmt;
use std::ops::{Deref, DerefMut};

use uuid::Uuid;

/// The stable identity of a pooled connection.
///
/// The pool keys its per-connection bookkeeping on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A resource that can be managed by a [`Pool`](super::Pool).
///
/// `close` is how the pool tears a resource down when no destroyer callback
/// was configured on the pool. The default implementation just drops it.
#[async_trait::async_trait]
pub trait Resource: Sized + Send + 'static {
    /// Release whatever the resource holds (sockets, sessions, file handles...).
    async fn close(self) -> Result<(), anyhow::Error> {
        drop(self);
        Ok(())
    }
}

/// A resource checked out of a [`Pool`](super::Pool).
///
/// `Connection` dereferences to the resource it wraps.
/// Hand it back with [`Pool::put`](super::Pool::put) once you are done with it,
/// or tear it down with [`Pool::close_connection`](super::Pool::close_connection).
pub struct Connection<T> {
    id: ConnectionId,
    resource: Option<T>,
}

impl<T> Connection<T> {
    pub(crate) fn new(resource: T) -> Self {
        Self {
            id: ConnectionId::new(),
            resource: Some(resource),
        }
    }

    /// The identity the pool tracks this connection under.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Move the resource out, leaving an empty connection behind.
    ///
    /// The pool refuses empty connections: [`Pool::put`](super::Pool::put) fails with
    /// [`PoolError::InvalidConnection`](super::PoolError::InvalidConnection).
    /// Pass the empty connection to [`Pool::close_connection`](super::Pool::close_connection)
    /// to give its slot back to the pool.
    pub fn take(this: &mut Self) -> Option<T> {
        this.resource.take()
    }

    /// Whether the resource has been moved out with [`Connection::take`].
    pub fn is_empty(&self) -> bool {
        self.resource.is_none()
    }

    pub(crate) fn resource_mut(&mut self) -> Option<&mut T> {
        self.resource.as_mut()
    }

    pub(crate) fn into_parts(self) -> (ConnectionId, Option<T>) {
        (self.id, self.resource)
    }
}

impl<T> Deref for Connection<T> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the resource was moved out with [`Connection::take`].
    fn deref(&self) -> &T {
        self.resource
            .as_ref()
            .expect("the resource was taken out of this connection")
    }
}

impl<T> DerefMut for Connection<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource
            .as_mut()
            .expect("the resource was taken out of this connection")
    }
}

impl<T: fmt::Debug> fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("resource", &self.resource)
            .finish()
    }
}
