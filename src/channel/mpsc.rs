use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, Mutex, Notify};

use super::{within, ChannelBackend, PopError, PushError, PushErrorKind};

/// A blocking backend built on a bounded [`tokio::sync::mpsc`] channel.
///
/// `push` reserves a permit before moving the value in, so a push that times out
/// still returns its value. The receiving half sits behind a fair async mutex:
/// concurrent poppers are served in the order they started waiting.
///
/// Timeouts keep the full precision of the [`Duration`] they are given.
pub struct MpscChannel<T> {
    sender: RwLock<Option<mpsc::Sender<T>>>,
    receiver: Mutex<mpsc::Receiver<T>>,
    closing: Notify,
    closed: AtomicBool,
    capacity: usize,
}

impl<T> MpscChannel<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(receiver),
            closing: Notify::new(),
            closed: AtomicBool::new(false),
            capacity,
        }
    }
}

fn discard<T>(receiver: &mut mpsc::Receiver<T>) {
    receiver.close();
    while receiver.try_recv().is_ok() {}
}

#[async_trait::async_trait]
impl<T: Send + 'static> ChannelBackend<T> for MpscChannel<T> {
    async fn push(&self, value: T, timeout: Option<Duration>) -> Result<(), PushError<T>> {
        let closing = self.closing.notified();
        tokio::pin!(closing);
        closing.as_mut().enable();

        let sender = self.sender.read().clone();
        let sender = match sender {
            Some(sender) if !self.is_closed() => sender,
            _ => return Err(PushError::new(PushErrorKind::Closed, value)),
        };
        let reserved = tokio::select! {
            biased;

            _ = closing.as_mut() => Err(PushErrorKind::Closed),
            reserved = within(timeout, sender.reserve()) => match reserved {
                Ok(Ok(permit)) => Ok(permit),
                Ok(Err(_)) => Err(PushErrorKind::Closed),
                Err(_) => Err(PushErrorKind::Timeout),
            },
        };
        match reserved {
            Ok(permit) => {
                permit.send(value);
                Ok(())
            }
            Err(kind) => Err(PushError::new(kind, value)),
        }
    }

    async fn pop(&self, timeout: Option<Duration>) -> Result<T, PopError> {
        let closing = self.closing.notified();
        tokio::pin!(closing);
        closing.as_mut().enable();

        if self.is_closed() {
            return Err(PopError::Closed);
        }
        let receive = async {
            let mut receiver = self.receiver.lock().await;
            if self.is_closed() {
                // `close` could not reach the receiver while we held it.
                discard(&mut receiver);
                return Err(PopError::Closed);
            }
            receiver.recv().await.ok_or(PopError::Closed)
        };
        tokio::select! {
            biased;

            _ = closing.as_mut() => Err(PopError::Closed),
            received = within(timeout, receive) => received.unwrap_or(Err(PopError::Timeout)),
        }
    }

    fn len(&self) -> usize {
        match self.sender.read().as_ref() {
            Some(sender) => sender.max_capacity() - sender.capacity(),
            None => 0,
        }
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.sender.write().take();
        self.closing.notify_waiters();
        if let Ok(mut receiver) = self.receiver.try_lock() {
            discard(&mut receiver);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
