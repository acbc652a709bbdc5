//! Integration tests for the TCP and local socket command channels.

use super::helpers::{start_coordinator, wait_for_size};

use coordinator_core::command::{
    LocalCommandListener, NetworkCommandListener, START_SIGNAL, start_network_command_server,
};
use coordinator_core::error::listener::ListenerError;
use coordinator_core::registry::TriggerState;

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UnixStream};

/// **VALUE**: End-to-end: the 100th client fires the trigger, the service gets
/// its start byte, asks for 11 closes, and 89 clients remain.
///
/// **WHY THIS MATTERS**: This is the whole admission/eviction loop as the
/// cleanup service sees it.
#[tokio::test]
async fn given_service_connected_when_100th_client_arrives_then_start_byte_and_eviction() {
    // GIVEN: A coordinator with capacity 100 and a connected service
    let server = start_coordinator(100).await;
    let service = TcpStream::connect(server.network_addr())
        .await
        .expect("Failed to connect service");
    let (read_half, mut write_half) = service.into_split();
    let mut reader = BufReader::new(read_half);

    // WHEN: 99 clients connect
    let mut clients = server.connect_clients(99).await;

    // THEN: Trigger still armed, no start byte
    assert_eq!(server.registry().trigger_state().await, TriggerState::Armed);
    let mut byte = [0u8; 1];
    let early =
        tokio::time::timeout(Duration::from_millis(100), reader.read_exact(&mut byte)).await;
    assert!(early.is_err(), "Start byte sent before capacity was reached");

    // WHEN: The 100th client connects
    clients.push(server.connect_client().await);

    // THEN: Trigger fired and the service receives 0x01
    assert_eq!(server.registry().trigger_state().await, TriggerState::Fired);
    tokio::time::timeout(Duration::from_secs(2), reader.read_exact(&mut byte))
        .await
        .expect("Timed out waiting for start byte")
        .expect("Failed to read start byte");
    assert_eq!(byte[0], START_SIGNAL);

    // WHEN: The service asks for 11 closes
    write_half.write_all(b"11\n").await.expect("Failed to write");
    let mut response = String::new();
    reader
        .read_line(&mut response)
        .await
        .expect("Failed to read ack");

    // THEN: Exact ack, 89 remain
    assert_eq!(response, "Closing 11 WS connections\n");
    assert!(wait_for_size(server.registry(), 89).await);
}

/// **VALUE**: Verifies the local channel answers without any preamble.
///
/// **BUG THIS CATCHES**: Would catch sending the start byte on the local
/// binding, which would corrupt the first ack line for the agent.
#[tokio::test]
async fn given_local_channel_when_command_sent_then_ack_is_first_bytes() {
    // GIVEN: 5 clients and an agent on the local socket
    let server = start_coordinator(100).await;
    let _clients = server.connect_clients(5).await;
    let agent = UnixStream::connect(&server.socket_path)
        .await
        .expect("Failed to connect to local socket");
    let (read_half, mut write_half) = agent.into_split();
    let mut reader = BufReader::new(read_half);

    // WHEN: Asking for 2
    write_half.write_all(b"2\n").await.expect("Failed to write");
    let mut response = String::new();
    reader
        .read_line(&mut response)
        .await
        .expect("Failed to read ack");

    // THEN: The very first line is the ack, and 3 remain
    assert_eq!(response, "Closing 2 WS connections\n");
    assert!(wait_for_size(server.registry(), 3).await);
}

/// **VALUE**: Verifies a malformed command gets no response and the channel stays usable.
#[tokio::test]
async fn given_malformed_command_when_sent_then_ignored_and_channel_open() {
    // GIVEN: An agent on the local socket with 3 clients connected
    let server = start_coordinator(100).await;
    let _clients = server.connect_clients(3).await;
    let agent = UnixStream::connect(&server.socket_path)
        .await
        .expect("Failed to connect to local socket");
    let (read_half, mut write_half) = agent.into_split();
    let mut reader = BufReader::new(read_half);

    // WHEN: Sending garbage
    write_half.write_all(b"abc\n").await.expect("Failed to write");

    // THEN: Nothing comes back and nothing is closed
    let mut response = String::new();
    let silent =
        tokio::time::timeout(Duration::from_millis(100), reader.read_line(&mut response)).await;
    assert!(silent.is_err(), "Unexpected response: {:?}", response);
    assert_eq!(server.registry().size().await, 3);

    // WHEN: Sending a valid command on the same connection
    write_half.write_all(b"1\n").await.expect("Failed to write");
    response.clear();
    reader
        .read_line(&mut response)
        .await
        .expect("Failed to read ack");

    // THEN: It is honored
    assert_eq!(response, "Closing 1 WS connections\n");
    assert!(wait_for_size(server.registry(), 2).await);
}

/// **VALUE**: Verifies several agents can hold command connections at once.
#[tokio::test]
async fn given_two_local_agents_when_both_send_then_both_acked() {
    let server = start_coordinator(100).await;
    let _clients = server.connect_clients(4).await;

    let mut first = UnixStream::connect(&server.socket_path)
        .await
        .expect("Failed to connect first agent");
    let mut second = UnixStream::connect(&server.socket_path)
        .await
        .expect("Failed to connect second agent");

    first.write_all(b"1\n").await.expect("Failed to write");
    second.write_all(b"2\n").await.expect("Failed to write");

    let mut first_reader = BufReader::new(&mut first);
    let mut first_response = String::new();
    first_reader
        .read_line(&mut first_response)
        .await
        .expect("Failed to read first ack");
    let mut second_reader = BufReader::new(&mut second);
    let mut second_response = String::new();
    second_reader
        .read_line(&mut second_response)
        .await
        .expect("Failed to read second ack");

    assert_eq!(first_response, "Closing 1 WS connections\n");
    assert_eq!(second_response, "Closing 2 WS connections\n");
    assert!(wait_for_size(server.registry(), 1).await);
}

/// **VALUE**: Verifies a stale socket file from a previous run does not block startup.
///
/// **WHY THIS MATTERS**: After a crash the socket file is left behind; the
/// coordinator must take the path over.
#[tokio::test]
async fn given_stale_socket_file_when_binding_then_replaced() {
    // GIVEN: A regular file at the socket path
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("ipc.sock");
    std::fs::write(&path, b"stale").expect("Failed to write stale file");

    // WHEN: Binding
    let listener = LocalCommandListener::bind(&path).expect("Failed to bind over stale file");

    // THEN: A client can connect
    assert_eq!(listener.path(), path.as_path());
    UnixStream::connect(&path)
        .await
        .expect("Failed to connect to rebound socket");
}

/// **VALUE**: Verifies the socket file is removed when the listener goes away.
#[tokio::test]
async fn given_bound_local_listener_when_dropped_then_socket_file_removed() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("ipc.sock");

    let listener = LocalCommandListener::bind(&path).expect("Failed to bind");
    assert!(path.exists());
    drop(listener);

    assert!(!path.exists());
}

/// **VALUE**: Verifies binding an occupied port reports a bind error naming the endpoint.
#[tokio::test]
async fn given_occupied_port_when_binding_network_channel_then_bind_error() {
    // GIVEN: A port already taken
    let taken = NetworkCommandListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind first listener");
    let addr = taken.local_addr().to_string();

    // WHEN: Binding the same port again
    let server = start_coordinator(10).await;
    let result = start_network_command_server(
        &addr,
        Arc::clone(server.coordinator.evictor()),
        server.registry().trigger(),
    )
    .await;

    // THEN: Bind error for that address
    match result {
        Err(ListenerError::Bind { endpoint, .. }) => assert_eq!(endpoint, addr),
        other => panic!("Expected bind error, got {:?}", other.map(|h| h.endpoint().to_string())),
    }
}
