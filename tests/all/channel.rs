use coop_pool::channel::{Backend, Channel, PopError, PushErrorKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const BLOCKING_BACKENDS: [Backend; 2] = [Backend::Semaphore, Backend::Mpsc];

#[tokio::test(start_paused = true)]
async fn blocking_backends_preserve_insertion_order() {
    for backend in BLOCKING_BACKENDS {
        // Arrange
        let channel = Channel::new(backend, 4);
        for word in ["a", "b", "c"] {
            channel.push(word, None).await.unwrap();
        }

        // Act
        let mut popped = Vec::new();
        while let Ok(word) = channel.pop(Some(Duration::from_millis(1))).await {
            popped.push(word);
        }

        // Assert
        assert_eq!(vec!["a", "b", "c"], popped, "{backend:?}");
        assert!(channel.is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn blocking_backends_wait_for_the_full_timeout() {
    for backend in BLOCKING_BACKENDS {
        // Arrange
        let channel = Channel::new(backend, 1);
        channel.push(1u8, None).await.unwrap();
        let started = Instant::now();

        // Act
        let push = channel.push(2, Some(Duration::from_millis(300))).await;
        let after_push = started.elapsed();
        channel.pop(None).await.unwrap();
        let pop = channel.pop(Some(Duration::from_millis(300))).await;

        // Assert
        let err = push.unwrap_err();
        assert_eq!(PushErrorKind::Timeout, err.kind(), "{backend:?}");
        assert_eq!(2, err.into_inner());
        assert!(after_push >= Duration::from_millis(300));
        assert_eq!(Err(PopError::Timeout), pop, "{backend:?}");
        assert!(started.elapsed() >= Duration::from_millis(600));
    }
}

#[tokio::test(start_paused = true)]
async fn waiting_poppers_are_served_in_arrival_order() {
    for backend in BLOCKING_BACKENDS {
        // Arrange
        let channel = Arc::new(Channel::new(backend, 2));
        let mut poppers = Vec::new();
        for _ in 0..2 {
            let channel = channel.clone();
            poppers.push(tokio::spawn(async move { channel.pop(None).await }));
            tokio::task::yield_now().await;
        }

        // Act
        channel.push("first", None).await.unwrap();
        channel.push("second", None).await.unwrap();

        // Assert
        let mut received = Vec::new();
        for popper in poppers {
            received.push(popper.await.unwrap().unwrap());
        }
        assert_eq!(vec!["first", "second"], received, "{backend:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn closing_releases_blocked_pushers() {
    for backend in BLOCKING_BACKENDS {
        // Arrange
        let channel = Arc::new(Channel::new(backend, 1));
        channel.push(0u32, None).await.unwrap();
        let pusher = tokio::spawn({
            let channel = channel.clone();
            async move { channel.push(1, None).await.map_err(|e| e.kind()) }
        });
        tokio::task::yield_now().await;

        // Act
        channel.close();

        // Assert
        assert_eq!(Err(PushErrorKind::Closed), pusher.await.unwrap(), "{backend:?}");
        assert!(channel.is_closed());
        assert_eq!(0, channel.len());
        assert_eq!(1, channel.capacity());
        assert_eq!(Err(PopError::Closed), channel.pop(Some(Duration::ZERO)).await);
    }
}

#[tokio::test(start_paused = true)]
async fn the_memory_backend_never_waits() {
    // Arrange
    let channel = Channel::new(Backend::Memory, 1);
    let started = Instant::now();

    // Act
    let empty = channel.pop(Some(Duration::from_secs(5))).await;
    channel.push('x', Some(Duration::from_secs(5))).await.unwrap();
    let full = channel.push('y', Some(Duration::from_secs(5))).await;

    // Assert
    assert_eq!(Err(PopError::Empty), empty);
    assert_eq!(PushErrorKind::Full, full.unwrap_err().kind());
    assert_eq!(Duration::ZERO, started.elapsed());
    assert_eq!(Ok('x'), channel.pop(None).await);
}
