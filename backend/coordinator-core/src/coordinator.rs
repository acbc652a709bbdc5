//! Composition root: builds the single registry and wires every component to it.

use crate::command::{CommandServerHandle, start_network_command_server};
#[cfg(unix)]
use crate::command::start_local_command_server;
use crate::config::CoordinatorConfig;
use crate::error::listener::ListenerError;
use crate::eviction::{DrainOutcome, Evictor, ShutdownSignal, ShutdownState};
use crate::registry::ConnectionRegistry;
use crate::websocket::{WebSocketServerHandle, start_websocket_server};

use std::future::{Future, pending};
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};

pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Arc<ConnectionRegistry>,
    evictor: Arc<Evictor>,
    shutdown: ShutdownSignal,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new(config.registry.capacity));
        let shutdown = ShutdownSignal::new();
        let evictor = Arc::new(Evictor::new(
            Arc::clone(&registry),
            shutdown.clone(),
            &config.eviction,
        ));

        Self {
            config,
            registry,
            evictor,
            shutdown,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn evictor(&self) -> &Arc<Evictor> {
        &self.evictor
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.shutdown.state()
    }

    /// Start the WebSocket acceptor and both command channels.
    ///
    /// # Errors
    ///
    /// Only a WebSocket bind failure is returned. A command channel that fails
    /// to bind is logged and left out; the rest of the coordinator still runs.
    pub async fn start(&self) -> Result<CoordinatorHandle, ListenerError> {
        let websocket = start_websocket_server(
            &self.config.websocket.bind_addr,
            Arc::clone(&self.registry),
            self.shutdown.clone(),
        )
        .await?;

        let network = match start_network_command_server(
            &self.config.command.network_addr,
            Arc::clone(&self.evictor),
            self.registry.trigger(),
        )
        .await
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Service command channel disabled: {}", e);
                None
            }
        };

        let local = self.start_local_channel();

        info!(
            "Coordinator started: capacity={}, websocket={}",
            self.registry.capacity(),
            websocket.local_addr()
        );

        Ok(CoordinatorHandle {
            websocket,
            network,
            local,
        })
    }

    #[cfg(unix)]
    fn start_local_channel(&self) -> Option<CommandServerHandle> {
        match start_local_command_server(
            &self.config.command.local_socket_path,
            Arc::clone(&self.evictor),
            self.registry.trigger(),
        ) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("IPC command channel disabled: {}", e);
                None
            }
        }
    }

    #[cfg(not(unix))]
    fn start_local_channel(&self) -> Option<CommandServerHandle> {
        log::warn!("IPC command channel requires Unix domain sockets, skipping");
        None
    }

    /// Drain all managed connections, then stop every listener.
    pub async fn shutdown(&self, handle: CoordinatorHandle) -> DrainOutcome {
        self.shutdown_until(handle, pending()).await
    }

    /// [`Coordinator::shutdown`] whose drain wait also ends when `cancel` resolves.
    pub async fn shutdown_until<F>(&self, handle: CoordinatorHandle, cancel: F) -> DrainOutcome
    where
        F: Future<Output = ()>,
    {
        info!("Coordinator shutting down");
        let outcome = self
            .evictor
            .drain_all_until(self.config.eviction.drain_timeout, cancel)
            .await;
        handle.stop();
        info!("Coordinator shut down: {:?}", outcome);
        outcome
    }
}

/// Running listeners started by [`Coordinator::start`].
#[derive(Debug)]
pub struct CoordinatorHandle {
    websocket: WebSocketServerHandle,
    network: Option<CommandServerHandle>,
    local: Option<CommandServerHandle>,
}

impl CoordinatorHandle {
    pub fn websocket_addr(&self) -> SocketAddr {
        self.websocket.local_addr()
    }

    /// Bound address of the TCP command channel, if it started.
    pub fn network_command_endpoint(&self) -> Option<&str> {
        self.network.as_ref().map(|h| h.endpoint())
    }

    /// Socket path of the local command channel, if it started.
    pub fn local_command_endpoint(&self) -> Option<&str> {
        self.local.as_ref().map(|h| h.endpoint())
    }

    pub fn stop(&self) {
        self.websocket.stop();
        if let Some(network) = &self.network {
            network.stop();
        }
        if let Some(local) = &self.local {
            local.stop();
        }
    }
}
