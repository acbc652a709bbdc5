use ws_coordinator::error::CoordinatorAppError;
use ws_coordinator::logger::initialize as LoggerInitialize;
use ws_coordinator::settings::{load_config, load_dotenv};

use coordinator_core::Coordinator;
use coordinator_core::error::CoreError;

use common::ErrorLocation;

use log::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), CoordinatorAppError> {
    let dotenv_path = load_dotenv();
    let config = load_config()?;

    // Initialize logger FIRST, before anything can log
    LoggerInitialize(&config.logging.directory)?;

    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }
    info!(
        "Coordinator starting: websocket={}, service={}, ipc={}, capacity={}",
        config.websocket.bind_addr,
        config.command.network_addr,
        config.command.local_socket_path.display(),
        config.registry.capacity
    );

    let coordinator = Coordinator::new(config);
    let handle = coordinator.start().await.map_err(CoreError::from)?;

    if let Err(e) = shutdown_requested().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received, draining connections (press Ctrl-C again to skip)");

    let outcome = coordinator
        .shutdown_until(handle, async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt received, skipping drain wait");
            }
        })
        .await;

    info!("Coordinator exited: {:?}", outcome);
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_requested() -> Result<(), CoordinatorAppError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate =
            signal(SignalKind::terminate()).map_err(|e| CoordinatorAppError::Startup {
                message: format!("Failed to install SIGTERM handler: {e}"),
                location: ErrorLocation::caller(),
            })?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => result.map_err(|e| CoordinatorAppError::Startup {
                message: format!("Failed to listen for Ctrl-C: {e}"),
                location: ErrorLocation::caller(),
            }),
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| CoordinatorAppError::Startup {
                message: format!("Failed to listen for Ctrl-C: {e}"),
                location: ErrorLocation::caller(),
            })
    }
}
