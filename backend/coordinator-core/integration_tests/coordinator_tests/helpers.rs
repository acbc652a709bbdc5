//! Test helpers for coordinator integration tests.
//!
//! Every test runs its own coordinator on ephemeral ports with the local
//! socket inside a temp dir, so tests can run in parallel.

use coordinator_core::config::{CoordinatorConfig, EvictionConfig};
use coordinator_core::registry::ConnectionRegistry;
use coordinator_core::{Coordinator, CoordinatorHandle};

use std::path::PathBuf;
use std::time::Duration;

use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A started coordinator plus the temp dir holding its local socket.
pub struct TestCoordinator {
    pub coordinator: Coordinator,
    pub handle: CoordinatorHandle,
    pub socket_path: PathBuf,
    _socket_dir: TempDir,
}

/// Config bound to loopback ephemeral ports with short eviction timings.
pub fn test_config(capacity: usize, socket_path: PathBuf) -> CoordinatorConfig {
    let mut config = CoordinatorConfig::default();
    config.websocket.bind_addr = "127.0.0.1:0".to_string();
    config.command.network_addr = "127.0.0.1:0".to_string();
    config.command.local_socket_path = socket_path;
    config.registry.capacity = capacity;
    config.eviction = EvictionConfig {
        close_ack_timeout: Duration::from_millis(500),
        drain_timeout: Duration::from_secs(2),
        drain_poll_interval: Duration::from_millis(10),
    };
    config
}

/// Test helper: Start a coordinator with the given trigger capacity.
pub async fn start_coordinator(capacity: usize) -> TestCoordinator {
    let socket_dir = TempDir::new().expect("Failed to create temp dir");
    let socket_path = socket_dir.path().join("ipc.sock");
    let coordinator = Coordinator::new(test_config(capacity, socket_path.clone()));
    let handle = coordinator
        .start()
        .await
        .expect("Failed to start coordinator");

    TestCoordinator {
        coordinator,
        handle,
        socket_path,
        _socket_dir: socket_dir,
    }
}

impl TestCoordinator {
    pub fn registry(&self) -> &ConnectionRegistry {
        self.coordinator.registry()
    }

    pub fn network_addr(&self) -> String {
        self.handle
            .network_command_endpoint()
            .expect("Network command channel not running")
            .to_string()
    }

    /// Test helper: Open one WebSocket client and wait until it is registered.
    pub async fn connect_client(&self) -> Client {
        let expected = self.registry().size().await + 1;
        let client = connect(self.handle.websocket_addr().port()).await;
        assert!(
            wait_for_size(self.registry(), expected).await,
            "Client was not registered"
        );
        client
    }

    /// Test helper: Open `count` clients, one at a time.
    pub async fn connect_clients(&self, count: usize) -> Vec<Client> {
        let mut clients = Vec::with_capacity(count);
        for _ in 0..count {
            clients.push(self.connect_client().await);
        }
        clients
    }
}

/// Test helper: Connect a WebSocket client to the coordinator.
pub async fn connect(port: u16) -> Client {
    let url = format!("ws://127.0.0.1:{}", port);
    let (ws_stream, _) = connect_async(&url)
        .await
        .expect("Failed to connect to WebSocket server");
    ws_stream
}

/// Test helper: Poll until the registry reaches `expected`, for up to 2s.
pub async fn wait_for_size(registry: &ConnectionRegistry, expected: usize) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if registry.size().await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    registry.size().await == expected
}

/// Test helper: Read frames until a close frame arrives; returns it, or `None`
/// if the stream ends first.
pub async fn next_close_frame(client: &mut Client) -> Option<CloseFrame> {
    let read = async {
        while let Some(message) = client.next().await {
            match message {
                Ok(Message::Close(frame)) => return frame,
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    };

    tokio::time::timeout(Duration::from_secs(2), read)
        .await
        .expect("Timed out waiting for close frame")
}
