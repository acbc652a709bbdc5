//! Integration tests for coordinator startup and graceful shutdown.

use super::helpers::{next_close_frame, start_coordinator, test_config};

use coordinator_core::Coordinator;
use coordinator_core::eviction::{DrainOutcome, ShutdownState};

use std::time::{Duration, Instant};

use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// **VALUE**: Verifies shutdown closes every client with a close frame and
/// ends DRAINED with an empty registry.
///
/// **WHY THIS MATTERS**: Clients must learn the server is going away rather
/// than see a reset.
#[tokio::test]
async fn given_connected_clients_when_shutting_down_then_all_closed_and_drained() {
    // GIVEN: 5 connected clients
    let server = start_coordinator(100).await;
    let mut clients = server.connect_clients(5).await;
    assert_eq!(server.coordinator.shutdown_state(), ShutdownState::Normal);

    // WHEN: Shutting down, with clients reading concurrently
    let readers: Vec<_> = clients
        .drain(..)
        .map(|mut client| tokio::spawn(async move { next_close_frame(&mut client).await }))
        .collect();
    let outcome = server.coordinator.shutdown(server.handle).await;

    // THEN: Drained, and every client saw a Going Away close
    assert_eq!(outcome, DrainOutcome::Drained);
    assert_eq!(server.coordinator.shutdown_state(), ShutdownState::Drained);
    assert_eq!(server.coordinator.registry().size().await, 0);
    for reader in readers {
        let frame = reader
            .await
            .expect("Reader panicked")
            .expect("Expected a close frame");
        assert_eq!(frame.code, CloseCode::Away);
    }
}

/// **VALUE**: Verifies no new WebSocket connections are admitted once draining starts.
///
/// **BUG THIS CATCHES**: Would catch an acceptor that keeps registering
/// clients during shutdown, so the drain never reaches zero.
#[tokio::test]
async fn given_drained_coordinator_when_client_connects_then_not_admitted() {
    // GIVEN: A coordinator that has drained but whose handle is kept alive
    let server = start_coordinator(100).await;
    let addr = server.handle.websocket_addr();
    let outcome = server
        .coordinator
        .evictor()
        .drain_all(Duration::from_secs(1))
        .await;
    assert_eq!(outcome, DrainOutcome::Drained);
    tokio::time::sleep(Duration::from_millis(50)).await;

    // WHEN: A client tries to connect
    let url = format!("ws://{}", addr);
    let attempt = tokio::time::timeout(Duration::from_millis(500), connect_async(&url)).await;

    // THEN: It is not registered
    assert!(!matches!(attempt, Ok(Ok(_))), "Client admitted after drain");
    assert_eq!(server.coordinator.registry().size().await, 0);
}

/// **VALUE**: Verifies an already-resolved cancel future wins over the drain wait.
///
/// **WHY THIS MATTERS**: A second Ctrl-C must stop the wait even while
/// clients are still registered.
#[tokio::test]
async fn given_connected_client_when_shutdown_cancelled_immediately_then_cancelled() {
    // GIVEN: One connected client
    let server = start_coordinator(100).await;
    let _client = server.connect_client().await;

    // WHEN: Shutting down with an immediate cancel
    let started = Instant::now();
    let outcome = server
        .coordinator
        .shutdown_until(server.handle, async {})
        .await;

    // THEN: Cancelled promptly, state DRAINED
    assert_eq!(outcome, DrainOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(server.coordinator.shutdown_state(), ShutdownState::Drained);
}

/// **VALUE**: Verifies a command channel that cannot bind does not stop the coordinator.
///
/// **WHY THIS MATTERS**: The TCP and local channels are independent; losing
/// one must not take down the other or the WebSocket server.
#[tokio::test]
async fn given_unbindable_socket_path_when_starting_then_other_channels_run() {
    // GIVEN: A socket path inside a directory that does not exist
    let dir = TempDir::new().expect("Failed to create temp dir");
    let bad_path = dir.path().join("missing").join("ipc.sock");
    let coordinator = Coordinator::new(test_config(100, bad_path));

    // WHEN: Starting
    let handle = coordinator.start().await.expect("Start should succeed");

    // THEN: Local channel missing, network and WebSocket channels up
    assert!(handle.local_command_endpoint().is_none());
    let network = handle
        .network_command_endpoint()
        .expect("Network channel should be running")
        .to_string();
    TcpStream::connect(&network)
        .await
        .expect("Failed to connect to network channel");
    TcpStream::connect(handle.websocket_addr())
        .await
        .expect("Failed to connect to WebSocket server");

    handle.stop();
}

/// **VALUE**: Verifies a WebSocket bind failure is fatal for startup.
#[tokio::test]
async fn given_occupied_websocket_port_when_starting_then_error() {
    // GIVEN: A coordinator already holding a port
    let first = start_coordinator(100).await;
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = test_config(100, dir.path().join("ipc.sock"));
    config.websocket.bind_addr = first.handle.websocket_addr().to_string();

    // WHEN: A second coordinator tries the same WebSocket port
    let result = Coordinator::new(config).start().await;

    // THEN: Startup fails
    assert!(result.is_err());
}
