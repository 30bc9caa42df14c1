use crate::helpers::Tracker;
use anyhow::anyhow;
use coop_pool::{Connection, Pool, PoolError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn get_opens_connections_lazily_up_to_the_maximum() {
    // Arrange
    let tracker = Tracker::default();
    let pool = tracker
        .builder()
        .max_connections(2)
        .min_connections(1)
        .wait_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    assert_eq!(0, pool.current_connections());

    // Act
    let first = pool.get().await.unwrap();
    let second = pool.get().await.unwrap();
    let started = Instant::now();
    let third = pool.get().await;
    let waited = started.elapsed();
    let first_id = first.id();
    pool.put(first).await.unwrap();
    let retried = pool.get().await.unwrap();

    // Assert
    assert_ne!(first_id, second.id());
    assert!(matches!(third, Err(PoolError::Exhausted { .. })));
    assert!(waited >= Duration::from_millis(100));
    assert_eq!(first_id, retried.id());
    assert_eq!(2, tracker.created());
    assert_eq!(2, pool.current_connections());
    assert_eq!(0, pool.idle_connections());
}

#[tokio::test(start_paused = true)]
async fn released_connections_are_reused() {
    // Arrange
    let tracker = Tracker::default();
    let pool = tracker.builder().max_connections(2).build().unwrap();
    let connection = pool.get().await.unwrap();
    let id = connection.id();

    // Act
    pool.put(connection).await.unwrap();
    let again = pool.get().await.unwrap();

    // Assert
    assert_eq!(id, again.id());
    assert_eq!(1, tracker.created());
    assert_eq!(1, pool.current_connections());
}

#[tokio::test(start_paused = true)]
async fn a_waiting_get_is_served_by_a_put() {
    // Arrange
    let tracker = Tracker::default();
    let pool = tracker
        .builder()
        .max_connections(1)
        .wait_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let connection = pool.get().await.unwrap();
    let id = connection.id();
    let waiter = tokio::spawn({
        let pool = pool.clone();
        async move { pool.get().await.map(|c| c.id()) }
    });
    tokio::task::yield_now().await;

    // Act
    tokio::time::sleep(Duration::from_secs(1)).await;
    pool.put(connection).await.unwrap();

    // Assert
    assert_eq!(id, waiter.await.unwrap().unwrap());
    assert_eq!(1, tracker.created());
}

#[tokio::test(start_paused = true)]
async fn concurrent_gets_never_exceed_the_maximum() {
    // Arrange
    let tracker = Tracker::default();
    let pool = tracker
        .builder()
        .max_connections(3)
        .wait_timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    // Act
    let attempts = (0..10).map(|_| {
        let pool = pool.clone();
        tokio::spawn(async move { pool.get().await })
    });
    let mut checked_out = Vec::new();
    let mut exhausted = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        match attempt.await.unwrap() {
            Ok(connection) => checked_out.push(connection),
            Err(PoolError::Exhausted { .. }) => exhausted += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    // Assert
    assert_eq!(3, checked_out.len());
    assert_eq!(7, exhausted);
    assert_eq!(3, tracker.created());
    assert_eq!(3, pool.current_connections());
}

#[tokio::test(start_paused = true)]
async fn a_creation_failure_is_passed_through_unchanged() {
    // Arrange
    let pool = Pool::<crate::helpers::FakeConnection>::builder(|| async {
        Err(anyhow!("connection refused"))
    })
    .wait_timeout(Duration::from_millis(10))
    .build()
    .unwrap();

    // Act
    let outcome = pool.get().await;

    // Assert
    match outcome {
        Err(e @ PoolError::CreationFailed(_)) => assert_eq!("connection refused", e.to_string()),
        other => panic!("expected a creation failure, got {other:?}"),
    }
    assert_eq!(0, pool.current_connections());
}

#[tokio::test(start_paused = true)]
async fn a_connection_released_while_creation_fails_still_satisfies_get() {
    // Arrange
    let tracker = Tracker::default();
    let attempts = Arc::new(AtomicUsize::new(0));
    let pool = Pool::builder({
        let tracker = tracker.clone();
        let attempts = attempts.clone();
        move || {
            let outcome = match attempts.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(tracker.open()),
                _ => Err(anyhow!("database is restarting")),
            };
            async move { outcome }
        }
    })
    .max_connections(2)
    .wait_timeout(Duration::from_secs(1))
    .build()
    .unwrap();
    let connection = pool.get().await.unwrap();
    let id = connection.id();
    tokio::spawn({
        let pool = pool.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            pool.put(connection).await.unwrap();
        }
    });

    // Act
    let reused = pool.get().await.unwrap();

    // Assert
    assert_eq!(id, reused.id());
    assert_eq!(2, attempts.load(Ordering::SeqCst));
    assert_eq!(1, pool.current_connections());
}

#[tokio::test]
async fn put_rejects_connections_from_another_pool() {
    // Arrange
    let tracker = Tracker::default();
    let ours = tracker.builder().build().unwrap();
    let theirs = tracker.builder().build().unwrap();
    let foreign = theirs.get().await.unwrap();

    // Act
    let outcome = ours.put(foreign).await;

    // Assert
    assert!(matches!(outcome, Err(PoolError::NotPoolMember)));
    assert_eq!(0, ours.idle_connections());
    assert_eq!(1, theirs.current_connections());
}

#[tokio::test]
async fn put_rejects_a_connection_whose_resource_was_taken() {
    // Arrange
    let tracker = Tracker::default();
    let pool = tracker.builder().build().unwrap();
    let mut connection = pool.get().await.unwrap();
    let resource = Connection::take(&mut connection);

    // Act
    let outcome = pool.put(connection).await;

    // Assert
    assert!(resource.is_some());
    assert!(matches!(outcome, Err(PoolError::InvalidConnection)));
    assert_eq!(0, pool.idle_connections());
}

#[tokio::test]
async fn checked_out_connections_dereference_to_their_resource() {
    // Arrange
    let tracker = Tracker::default();
    let pool = tracker.builder().build().unwrap();

    // Act
    let mut connection = pool.get().await.unwrap();
    connection.ping().await.unwrap();

    // Assert
    assert_eq!(0, connection.serial);
    assert_eq!(1, tracker.pings());
    assert!(pool.is_member(connection.id()));
}
