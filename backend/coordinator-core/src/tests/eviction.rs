// Unit tests for Evictor: CloseExactly and DrainAll against fake transports.

use crate::eviction::{DrainOutcome, ShutdownState};
use crate::registry::{CLOSE_REASON, ConnectionHandle, ConnectionRegistry};
use crate::tests::{
    evictor_for, register_cooperative, register_unresponsive, spawn_fake_transport,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

/// **VALUE**: Verifies CloseExactly removes exactly `min(n, size)` connections.
///
/// **WHY THIS MATTERS**: The cleanup agent asks for a precise count. Closing
/// more drops users for no reason; closing fewer leaves the server over budget.
///
/// **BUG THIS CATCHES**: Would catch returning before handles are deregistered,
/// or closing the whole set.
#[tokio::test]
async fn given_100_connections_when_closing_11_then_89_remain() {
    // GIVEN: 100 cooperative connections
    let registry = Arc::new(ConnectionRegistry::new(100));
    let transports = register_cooperative(&registry, 100).await;
    let evictor = evictor_for(&registry);

    // WHEN: Closing 11
    let closed = evictor.close_exactly(11).await;

    // THEN: 11 closed, 89 remain, and exactly 11 transports saw a close request
    assert_eq!(closed, 11);
    assert_eq!(registry.size().await, 89);

    // Evicted transports finish; the rest stay parked on their receivers.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let mut evicted = 0;
    for transport in transports {
        if transport.is_finished() && transport.await.expect("transport panicked") {
            evicted += 1;
        }
    }
    assert_eq!(evicted, 11);
}

/// **VALUE**: Verifies asking for more than exist closes everything and nothing more.
#[tokio::test]
async fn given_fewer_connections_than_requested_when_closing_then_closes_all() {
    // GIVEN: 3 connections
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _transports = register_cooperative(&registry, 3).await;
    let evictor = evictor_for(&registry);

    // WHEN: Closing 10
    let closed = evictor.close_exactly(10).await;

    // THEN: All 3 closed
    assert_eq!(closed, 3);
    assert_eq!(registry.size().await, 0);
}

/// **VALUE**: Verifies closing zero, or closing from an empty registry, is a no-op.
#[tokio::test]
async fn given_zero_request_or_empty_registry_when_closing_then_nothing_happens() {
    // GIVEN: 2 connections and an empty registry
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _transports = register_cooperative(&registry, 2).await;
    let evictor = evictor_for(&registry);
    let empty = Arc::new(ConnectionRegistry::new(100));
    let empty_evictor = evictor_for(&empty);

    // WHEN: Closing 0, and closing 5 from empty
    let zero = evictor.close_exactly(0).await;
    let from_empty = empty_evictor.close_exactly(5).await;

    // THEN: Nothing closed
    assert_eq!(zero, 0);
    assert_eq!(from_empty, 0);
    assert_eq!(registry.size().await, 2);
}

/// **VALUE**: Verifies a transport that never answers does not stall eviction forever.
///
/// **WHY THIS MATTERS**: A half-dead client must not block the command channel;
/// the engine waits a bounded time and deregisters the handle anyway.
///
/// **BUG THIS CATCHES**: Would catch awaiting the close ack without a timeout.
#[tokio::test]
async fn given_unresponsive_transports_when_closing_then_removed_after_ack_timeout() {
    // GIVEN: 4 connections whose transports never acknowledge
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _receivers = register_unresponsive(&registry, 4).await;
    let evictor = evictor_for(&registry);

    // WHEN: Closing 2
    let started = Instant::now();
    let closed = evictor.close_exactly(2).await;

    // THEN: Completed in roughly one ack timeout (acks are awaited concurrently)
    assert_eq!(closed, 2);
    assert_eq!(registry.size().await, 2);
    assert!(
        started.elapsed() < Duration::from_secs(1),
        "Took {:?}",
        started.elapsed()
    );
}

/// **VALUE**: Verifies a handle whose transport already ended is still deregistered.
///
/// **BUG THIS CATCHES**: Would catch skipping `remove` when the close request
/// itself fails, leaving a ghost entry that inflates the size forever.
#[tokio::test]
async fn given_dead_transport_when_closing_then_handle_still_removed() {
    // GIVEN: A handle whose receiver has been dropped
    let registry = Arc::new(ConnectionRegistry::new(100));
    let (handle, close_rx) = ConnectionHandle::new("dead");
    registry.add(handle).await;
    drop(close_rx);
    let evictor = evictor_for(&registry);

    // WHEN: Closing 1
    let closed = evictor.close_exactly(1).await;

    // THEN: Counted and removed
    assert_eq!(closed, 1);
    assert_eq!(registry.size().await, 0);
}

/// **VALUE**: Verifies the close request carries the shutdown reason.
#[tokio::test]
async fn given_handle_when_close_requested_then_reason_is_server_shutting_down() {
    // GIVEN: A handle and its receiver
    let (handle, mut close_rx) = ConnectionHandle::new("peer");

    // WHEN: A close is requested
    let ack = handle
        .request_close(CLOSE_REASON)
        .expect("request_close failed");

    // THEN: The transport sees the reason and its ack reaches the requester
    let request = close_rx.recv().await.expect("no close request");
    assert_eq!(request.reason(), "Server shutting down");
    request.acknowledge();
    assert!(ack.await.is_ok());
}

/// **VALUE**: Verifies DrainAll empties the registry and ends in DRAINED.
///
/// **WHY THIS MATTERS**: Shutdown must give every client a close frame before
/// the process exits.
#[tokio::test]
async fn given_cooperative_connections_when_draining_then_drained() {
    // GIVEN: 20 cooperative connections
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _transports = register_cooperative(&registry, 20).await;
    let evictor = evictor_for(&registry);
    assert_eq!(evictor.shutdown_state(), ShutdownState::Normal);

    // WHEN: Draining
    let outcome = evictor.drain_all(Duration::from_secs(2)).await;

    // THEN: Empty and DRAINED
    assert_eq!(outcome, DrainOutcome::Drained);
    assert_eq!(registry.size().await, 0);
    assert_eq!(evictor.shutdown_state(), ShutdownState::Drained);
}

/// **VALUE**: Verifies DrainAll returns within its timeout when connections never close.
///
/// **WHY THIS MATTERS**: Shutdown must be bounded even with stuck clients.
///
/// **BUG THIS CATCHES**: Would catch a drain loop with no deadline.
#[tokio::test]
async fn given_stuck_connections_when_draining_then_times_out_within_bound() {
    // GIVEN: 3 connections that never deregister
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _receivers = register_unresponsive(&registry, 3).await;
    let evictor = evictor_for(&registry);
    let limit = Duration::from_millis(200);

    // WHEN: Draining with a short timeout
    let started = Instant::now();
    let outcome = evictor.drain_all(limit).await;
    let elapsed = started.elapsed();

    // THEN: Timed out promptly, state still DRAINED
    assert_eq!(outcome, DrainOutcome::TimedOut);
    assert!(elapsed >= limit, "Returned early: {:?}", elapsed);
    assert!(
        elapsed < limit + Duration::from_millis(500),
        "Overran: {:?}",
        elapsed
    );
    assert_eq!(evictor.shutdown_state(), ShutdownState::Drained);
    assert_eq!(registry.size().await, 3);
}

/// **VALUE**: Verifies the cancel future cuts a drain short.
///
/// **WHY THIS MATTERS**: A second Ctrl-C from the operator means "stop waiting".
#[tokio::test]
async fn given_cancel_when_draining_stuck_connections_then_cancelled() {
    // GIVEN: A stuck connection and a long drain timeout
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _receivers = register_unresponsive(&registry, 1).await;
    let evictor = evictor_for(&registry);

    // WHEN: Cancel resolves after 50ms
    let started = Instant::now();
    let outcome = evictor
        .drain_all_until(Duration::from_secs(30), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await;

    // THEN: Cancelled well before the timeout, state DRAINED
    assert_eq!(outcome, DrainOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(evictor.shutdown_state(), ShutdownState::Drained);
}

/// **VALUE**: Verifies a second drain is refused instead of racing the first.
///
/// **BUG THIS CATCHES**: Would catch a drain that resets state to DRAINING
/// after another drain already finished.
#[tokio::test]
async fn given_completed_drain_when_draining_again_then_already_draining() {
    // GIVEN: A finished drain on an empty registry
    let registry = Arc::new(ConnectionRegistry::new(100));
    let evictor = evictor_for(&registry);
    assert_eq!(
        evictor.drain_all(Duration::from_millis(200)).await,
        DrainOutcome::Drained
    );

    // WHEN: Draining again
    let outcome = evictor.drain_all(Duration::from_millis(200)).await;

    // THEN: Refused, state unchanged
    assert_eq!(outcome, DrainOutcome::AlreadyDraining);
    assert_eq!(evictor.shutdown_state(), ShutdownState::Drained);
}

/// **VALUE**: Verifies a connection registered after the drain started is still closed.
///
/// **WHY THIS MATTERS**: A WebSocket handshake that began just before shutdown
/// finishes after the drain took its first look at the registry. That client
/// must still get its close frame, or the drain burns its whole timeout and
/// the connection outlives the process.
///
/// **BUG THIS CATCHES**: Would catch a drain that only asks the connections
/// present when it started.
#[tokio::test]
async fn given_drain_in_progress_when_connection_registers_late_then_it_is_closed() {
    // GIVEN: One early connection that takes 100ms to go away after its close request
    let registry = Arc::new(ConnectionRegistry::new(100));
    let (early, mut early_rx) = ConnectionHandle::new("early");
    let early_id = early.id();
    registry.add(early).await;
    let early_registry = Arc::clone(&registry);
    tokio::spawn(async move {
        if let Some(request) = early_rx.recv().await {
            request.acknowledge();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        early_registry.remove(early_id).await;
    });
    let evictor = evictor_for(&registry);

    // WHEN: A second connection registers 20ms into a 400ms drain
    let late_registry = Arc::clone(&registry);
    let late_add = async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let (late, late_rx) = ConnectionHandle::new("late");
        let late_id = late.id();
        let outcome = late_registry.add(late).await;
        (outcome, spawn_fake_transport(late_registry, late_id, late_rx))
    };
    let (drain_outcome, (late_outcome, late_transport)) =
        tokio::join!(evictor.drain_all(Duration::from_millis(400)), late_add);

    // THEN: The late add was accepted, asked to close, and the drain emptied the registry
    assert!(late_outcome.inserted);
    assert_eq!(drain_outcome, DrainOutcome::Drained);
    assert_eq!(registry.size().await, 0);
    let asked_to_close = tokio::time::timeout(Duration::from_secs(1), late_transport)
        .await
        .expect("Late transport was never asked to close")
        .expect("transport panicked");
    assert!(asked_to_close);
}

/// **VALUE**: Verifies a drain requested while another runs returns only after DRAINED.
///
/// **WHY THIS MATTERS**: Callers treat the return of a drain as "shutdown is
/// complete". Returning while the first drain is still waiting lets the
/// process exit with connections still open.
///
/// **BUG THIS CATCHES**: Would catch the second call returning immediately
/// with the state still DRAINING.
#[tokio::test]
async fn given_drain_running_when_draining_concurrently_then_waits_for_drained() {
    // GIVEN: A stuck connection and a first drain with a 300ms timeout
    let registry = Arc::new(ConnectionRegistry::new(100));
    let _receivers = register_unresponsive(&registry, 1).await;
    let evictor = evictor_for(&registry);

    // WHEN: A second drain starts 20ms later
    let started = Instant::now();
    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let outcome = evictor.drain_all(Duration::from_secs(5)).await;
        (outcome, evictor.shutdown_state(), started.elapsed())
    };
    let (first, (second_outcome, state_at_return, elapsed)) =
        tokio::join!(evictor.drain_all(Duration::from_millis(300)), second);

    // THEN: The first timed out, and the second returned only once DRAINED
    assert_eq!(first, DrainOutcome::TimedOut);
    assert_eq!(second_outcome, DrainOutcome::AlreadyDraining);
    assert_eq!(state_at_return, ShutdownState::Drained);
    assert!(
        elapsed >= Duration::from_millis(300),
        "Second drain returned early: {:?}",
        elapsed
    );
}

/// **VALUE**: Verifies the shutdown state names match the wire/log vocabulary.
#[test]
fn given_shutdown_states_when_displayed_then_upper_case_names() {
    assert_eq!(ShutdownState::Normal.to_string(), "NORMAL");
    assert_eq!(ShutdownState::Draining.to_string(), "DRAINING");
    assert_eq!(ShutdownState::Drained.to_string(), "DRAINED");
}
