use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Semaphore, SemaphorePermit};

use super::{within, ChannelBackend, PopError, PushError, PushErrorKind};

/// A blocking backend: a `VecDeque` guarded by two tokio semaphores.
///
/// `slots` counts free capacity, `items` counts queued values.
/// tokio semaphores hand out permits in request order, which gives FIFO
/// fairness among waiting pushers and among waiting poppers.
///
/// Closing the channel closes both semaphores: every task blocked in `push`
/// or `pop` wakes up and fails with `Closed`.
pub struct SemaphoreChannel<T> {
    queue: Mutex<VecDeque<T>>,
    slots: Semaphore,
    items: Semaphore,
    capacity: usize,
}

enum Interrupted {
    Closed,
    Timeout,
}

impl From<Interrupted> for PushErrorKind {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Closed => Self::Closed,
            Interrupted::Timeout => Self::Timeout,
        }
    }
}

impl From<Interrupted> for PopError {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Closed => Self::Closed,
            Interrupted::Timeout => Self::Timeout,
        }
    }
}

impl<T> SemaphoreChannel<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            slots: Semaphore::new(capacity),
            items: Semaphore::new(0),
            capacity,
        }
    }
}

async fn acquire(
    semaphore: &Semaphore,
    timeout: Option<Duration>,
) -> Result<SemaphorePermit<'_>, Interrupted> {
    match within(timeout, semaphore.acquire()).await {
        Ok(Ok(permit)) => Ok(permit),
        Ok(Err(_)) => Err(Interrupted::Closed),
        Err(_) => Err(Interrupted::Timeout),
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> ChannelBackend<T> for SemaphoreChannel<T> {
    async fn push(&self, value: T, timeout: Option<Duration>) -> Result<(), PushError<T>> {
        match acquire(&self.slots, timeout).await {
            Ok(permit) => permit.forget(),
            Err(reason) => return Err(PushError::new(reason.into(), value)),
        }
        {
            let mut queue = self.queue.lock();
            // `close` may have run while we were waiting for the permit.
            if self.items.is_closed() {
                return Err(PushError::new(PushErrorKind::Closed, value));
            }
            queue.push_back(value);
        }
        self.items.add_permits(1);
        Ok(())
    }

    async fn pop(&self, timeout: Option<Duration>) -> Result<T, PopError> {
        acquire(&self.items, timeout).await?.forget();
        let value = {
            let mut queue = self.queue.lock();
            if self.slots.is_closed() {
                return Err(PopError::Closed);
            }
            queue.pop_front().ok_or(PopError::Closed)?
        };
        self.slots.add_permits(1);
        Ok(value)
    }

    fn len(&self) -> usize {
        self.queue.lock().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn close(&self) {
        let mut queue = self.queue.lock();
        self.slots.close();
        self.items.close();
        queue.clear();
    }

    fn is_closed(&self) -> bool {
        self.items.is_closed()
    }
}
