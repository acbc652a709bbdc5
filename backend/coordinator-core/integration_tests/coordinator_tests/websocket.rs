//! Integration tests for the managed WebSocket transport.

use super::helpers::{connect, next_close_frame, start_coordinator, wait_for_size};

use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

/// **VALUE**: Verifies upgraded WebSocket clients are registered.
///
/// **WHY THIS MATTERS**: The registry size is what the trigger and the
/// cleanup agent act on.
#[tokio::test]
async fn given_running_coordinator_when_clients_connect_then_registered() {
    // GIVEN: A running coordinator
    let server = start_coordinator(100).await;

    // WHEN: Three clients connect
    let _clients = server.connect_clients(3).await;

    // THEN: All three are tracked
    assert_eq!(server.registry().size().await, 3);
}

/// **VALUE**: Verifies a client that closes on its own is deregistered.
///
/// **BUG THIS CATCHES**: Would catch only removing handles on eviction,
/// leaving departed clients counted forever.
#[tokio::test]
async fn given_registered_client_when_client_closes_then_deregistered() {
    // GIVEN: Two registered clients
    let server = start_coordinator(100).await;
    let mut clients = server.connect_clients(2).await;

    // WHEN: One sends a close frame
    let mut leaving = clients.remove(0);
    leaving.close(None).await.expect("Failed to close");

    // THEN: Registry drops to 1
    assert!(wait_for_size(server.registry(), 1).await);
}

/// **VALUE**: Verifies a client that drops its TCP connection without a
/// close frame is also deregistered.
#[tokio::test]
async fn given_registered_client_when_socket_dropped_then_deregistered() {
    let server = start_coordinator(100).await;
    let client = server.connect_client().await;

    drop(client);

    assert!(wait_for_size(server.registry(), 0).await);
}

/// **VALUE**: Verifies data frames from clients are tolerated and ignored.
///
/// **BUG THIS CATCHES**: Would catch treating inbound traffic as an error and
/// dropping the connection.
#[tokio::test]
async fn given_registered_client_when_sending_messages_then_stays_registered() {
    let server = start_coordinator(100).await;
    let mut client = server.connect_client().await;

    client
        .send(Message::Text("hello".into()))
        .await
        .expect("Failed to send text");
    client
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .expect("Failed to send binary");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(server.registry().size().await, 1);
}

/// **VALUE**: Verifies eviction sends a Going Away close frame with the shutdown reason.
///
/// **WHY THIS MATTERS**: Clients rely on the close code to reconnect
/// elsewhere instead of treating the close as an error.
#[tokio::test]
async fn given_registered_client_when_evicted_then_receives_going_away_close() {
    // GIVEN: One registered client
    let server = start_coordinator(100).await;
    let mut client = server.connect_client().await;

    // WHEN: The eviction engine closes one connection
    let closed = server.coordinator.evictor().close_exactly(1).await;

    // THEN: The client sees a 1001 close with the reason text
    assert_eq!(closed, 1);
    let frame = next_close_frame(&mut client)
        .await
        .expect("Expected a close frame with payload");
    assert_eq!(frame.code, CloseCode::Away);
    assert_eq!(frame.reason.as_str(), "Server shutting down");
    assert_eq!(server.registry().size().await, 0);
}

/// **VALUE**: Verifies a raw TCP connection that never upgrades is not registered.
#[tokio::test]
async fn given_non_websocket_client_when_connecting_then_not_registered() {
    use tokio::io::AsyncWriteExt;

    let server = start_coordinator(100).await;
    let mut raw = tokio::net::TcpStream::connect(server.handle.websocket_addr())
        .await
        .expect("Failed to connect");

    raw.write_all(b"GET / HTTP/1.1\r\n\r\n")
        .await
        .expect("Failed to write");
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(server.registry().size().await, 0);

    // A real client still works afterwards.
    let _client = connect(server.handle.websocket_addr().port()).await;
    assert!(wait_for_size(server.registry(), 1).await);
}
