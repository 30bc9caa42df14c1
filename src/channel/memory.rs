use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::{ChannelBackend, PopError, PushError, PushErrorKind};

/// The fallback backend, for code that is not running on a tokio runtime.
///
/// It never suspends the caller. `push` fails with [`PushErrorKind::Full`] when the
/// channel is at capacity and `pop` fails with [`PopError::Empty`] when nothing is queued,
/// both immediately and regardless of the timeout they were given.
pub struct MemoryChannel<T> {
    queue: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    capacity: usize,
}

impl<T> MemoryChannel<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            closed: AtomicBool::new(false),
            capacity,
        }
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> ChannelBackend<T> for MemoryChannel<T> {
    async fn push(&self, value: T, _timeout: Option<Duration>) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::new(PushErrorKind::Closed, value));
        }
        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            return Err(PushError::new(PushErrorKind::Full, value));
        }
        queue.push_back(value);
        Ok(())
    }

    async fn pop(&self, _timeout: Option<Duration>) -> Result<T, PopError> {
        if self.is_closed() {
            return Err(PopError::Closed);
        }
        self.queue.lock().pop_front().ok_or(PopError::Empty)
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.queue.lock().clear();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
