use ws_coordinator::settings::config_dir_from;

use coordinator_core::Coordinator;
use coordinator_core::config::{CONFIG_FILE_NAME, CoordinatorConfig};
use coordinator_core::eviction::DrainOutcome;

use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

// ============================================================================
// Integration tests for the process wiring: config directory -> Coordinator
// ============================================================================

/// **VALUE**: Tests the startup path the binary takes, from a config file on
/// disk to a running coordinator that answers on its local socket.
///
/// **WHY THIS MATTERS**: Operators deploy with a `coordinator.json`; every
/// field in it must reach the component that uses it.
///
/// **BUG THIS CATCHES**: Would catch a config field that is parsed but never
/// wired through (for example the socket path falling back to /tmp/ipc.sock).
#[tokio::test]
async fn given_config_file_when_starting_coordinator_then_endpoints_follow_config() {
    // GIVEN: A config dir with ephemeral ports and a temp socket path
    let dir = TempDir::new().expect("tempdir");
    let socket_path = dir.path().join("agent.sock");
    let json = format!(
        r#"{{
            "version": 1,
            "websocket": {{ "bind_addr": "127.0.0.1:0" }},
            "command": {{
                "network_addr": "127.0.0.1:0",
                "local_socket_path": "{}"
            }},
            "registry": {{ "capacity": 3 }},
            "eviction": {{ "drain_timeout": "1s", "drain_poll_interval": "10ms" }},
            "logging": {{ "directory": "{}" }}
        }}"#,
        socket_path.display(),
        dir.path().join("logs").display()
    );
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), json).expect("write config");

    // WHEN: Loading the way the binary does and starting
    let config_dir = config_dir_from(Some(dir.path().display().to_string()));
    let config = CoordinatorConfig::load(&config_dir).expect("load config");
    assert_eq!(config.registry.capacity, 3);
    assert_eq!(config.eviction.drain_timeout, Duration::from_secs(1));

    let coordinator = Coordinator::new(config);
    let handle = coordinator.start().await.expect("start");

    // THEN: The local socket lives where the config said and answers commands
    assert_eq!(
        handle.local_command_endpoint(),
        Some(socket_path.display().to_string().as_str())
    );
    let mut agent = UnixStream::connect(&socket_path)
        .await
        .expect("connect to configured socket");
    agent.write_all(b"0\n").await.expect("write");
    let mut response = String::new();
    BufReader::new(&mut agent)
        .read_line(&mut response)
        .await
        .expect("read ack");
    assert_eq!(response, "Closing 0 WS connections\n");

    // AND: Shutdown with nobody connected drains immediately
    let outcome = coordinator.shutdown(handle).await;
    assert_eq!(outcome, DrainOutcome::Drained);
}
