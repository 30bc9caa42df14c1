//! A bounded FIFO queue with blocking `push`/`pop`, polymorphic over its backend.
//!
//! [`Channel`] is the only synchronisation primitive used by the [`Pool`](crate::pool::Pool):
//! the pool's free-list *is* a channel.
//!
//! Three backends are available and they do **not** behave identically:
//!
//! - [`Backend::Semaphore`] and [`Backend::Mpsc`] suspend the calling task until the operation
//!   can complete or the timeout elapses, yielding to whatever else is ready on the runtime.
//! - [`Backend::Memory`] is the fallback for code running without a tokio runtime. It never waits:
//!   `push` on a full channel and `pop` on an empty one fail immediately, whatever timeout you
//!   pass. It is a best-effort substitute, not a simulation of the blocking backends.
//!
//! ```rust
//! use coop_pool::channel::{Backend, Channel};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let channel = Channel::new(Backend::Semaphore, 2);
//! channel.push("a", None).await.unwrap();
//! assert_eq!(channel.len(), 1);
//! assert_eq!(channel.pop(Some(Duration::from_millis(10))).await, Ok("a"));
//! # }
//! ```
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;

mod error;
mod memory;
mod mpsc;
mod semaphore;

pub use error::{PopError, PushError, PushErrorKind};
pub use memory::MemoryChannel;
pub use mpsc::MpscChannel;
pub use semaphore::SemaphoreChannel;

/// The capability set every channel backend provides.
///
/// A `timeout` of `None` waits indefinitely.
/// Backends that cannot wait are free to ignore the timeout altogether.
#[async_trait::async_trait]
pub trait ChannelBackend<T: Send + 'static>: Send + Sync {
    /// Enqueue `value`, waiting for capacity if the backend supports it.
    ///
    /// On failure the value is handed back inside the error.
    async fn push(&self, value: T, timeout: Option<Duration>) -> Result<(), PushError<T>>;

    /// Dequeue the oldest value, waiting for one if the backend supports it.
    async fn pop(&self, timeout: Option<Duration>) -> Result<T, PopError>;

    /// How many values are currently queued.
    fn len(&self) -> usize;

    /// The maximum number of values the channel can hold. Fixed at construction.
    fn capacity(&self) -> usize;

    /// Discard every queued value and refuse any further `push`/`pop`.
    ///
    /// Idempotent.
    fn close(&self);

    /// Whether [`close`](ChannelBackend::close) has been called.
    fn is_closed(&self) -> bool;
}

/// Which backend a [`Channel`] should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Pick [`Backend::Semaphore`] if a tokio runtime is running on the current thread,
    /// [`Backend::Memory`] otherwise.
    #[default]
    Auto,
    /// A queue guarded by two fair tokio semaphores. See [`SemaphoreChannel`].
    Semaphore,
    /// A bounded tokio mpsc channel. See [`MpscChannel`].
    Mpsc,
    /// The non-blocking fallback. See [`MemoryChannel`].
    Memory,
}

impl Backend {
    /// Detect which backend fits the current execution context.
    pub fn detect() -> Self {
        if tokio::runtime::Handle::try_current().is_ok() {
            Self::Semaphore
        } else {
            Self::Memory
        }
    }

    /// Resolve [`Backend::Auto`] into a concrete backend. Concrete backends are returned as-is.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto => Self::detect(),
            concrete => concrete,
        }
    }
}

/// A bounded queue whose backend is chosen once, at construction.
pub struct Channel<T> {
    backend: Box<dyn ChannelBackend<T>>,
}

impl<T: Send + 'static> Channel<T> {
    /// Create a channel holding at most `capacity` values.
    ///
    /// [`Backend::Auto`] is resolved here, against the calling thread.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(backend: Backend, capacity: usize) -> Self {
        assert!(capacity > 0, "channel capacity must be greater than zero");
        match backend.resolve() {
            Backend::Semaphore => Self::with_backend(SemaphoreChannel::new(capacity)),
            Backend::Mpsc => Self::with_backend(MpscChannel::new(capacity)),
            Backend::Memory | Backend::Auto => Self::with_backend(MemoryChannel::new(capacity)),
        }
    }

    /// Wrap a custom backend.
    pub fn with_backend<B: ChannelBackend<T> + 'static>(backend: B) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// See [`ChannelBackend::push`].
    pub async fn push(&self, value: T, timeout: Option<Duration>) -> Result<(), PushError<T>> {
        let outcome = self.backend.push(value, timeout).await;
        if let Err(e) = &outcome {
            tracing::trace!(error = %e, "channel push failed");
        }
        outcome
    }

    /// See [`ChannelBackend::pop`].
    pub async fn pop(&self, timeout: Option<Duration>) -> Result<T, PopError> {
        let outcome = self.backend.pop(timeout).await;
        if let Err(e) = &outcome {
            tracing::trace!(error = %e, "channel pop failed");
        }
        outcome
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.backend.capacity()
    }

    pub fn close(&self) {
        self.backend.close()
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_closed()
    }
}

/// Drive `future` to completion, giving up once `timeout` elapses (never, for `None`).
pub(crate) async fn within<F: Future>(
    timeout: Option<Duration>,
    future: F,
) -> Result<F::Output, tokio::time::error::Elapsed> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, future).await,
        None => Ok(future.await),
    }
}
