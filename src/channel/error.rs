use std::fmt;

/// Why a [`push`](super::ChannelBackend::push) did not enqueue its value.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushErrorKind {
    /// The channel was at capacity and the backend does not wait.
    #[error("the channel is full")]
    Full,
    /// The channel has been closed.
    #[error("the channel is closed")]
    Closed,
    /// No capacity freed up before the timeout elapsed.
    #[error("timed out waiting for channel capacity")]
    Timeout,
}

/// A failed push.
///
/// The rejected value travels back to the caller, who stays responsible for it.
pub struct PushError<T> {
    kind: PushErrorKind,
    value: T,
}

impl<T> PushError<T> {
    /// Reject `value`. Custom [`ChannelBackend`](super::ChannelBackend)s use this to hand it back.
    pub fn new(kind: PushErrorKind, value: T) -> Self {
        Self { kind, value }
    }

    /// What went wrong.
    pub fn kind(&self) -> PushErrorKind {
        self.kind
    }

    /// Take back the value that could not be pushed.
    pub fn into_inner(self) -> T {
        self.value
    }
}

// Manual impls: the payload does not need to be `Debug`.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl<T> std::error::Error for PushError<T> {}

/// Why a [`pop`](super::ChannelBackend::pop) came back empty-handed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopError {
    /// Nothing was queued and the backend does not wait.
    #[error("the channel is empty")]
    Empty,
    /// The channel has been closed.
    #[error("the channel is closed")]
    Closed,
    /// Nothing arrived before the timeout elapsed.
    #[error("timed out waiting for a value")]
    Timeout,
}
