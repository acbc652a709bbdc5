use crate::ACCEPT_ERROR_BACKOFF;
use crate::command::listener::{CommandBinding, CommandListener, NetworkCommandListener};
#[cfg(unix)]
use crate::command::listener::LocalCommandListener;
use crate::command::session::serve_session;
use crate::error::listener::ListenerError;
use crate::eviction::Evictor;
use crate::registry::TriggerWaiter;

#[cfg(unix)]
use std::path::Path;
use std::sync::Arc;

use log::{error, info};
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Handle to a running command channel accept loop.
///
/// Dropping the handle leaves the server running; call [`CommandServerHandle::stop`]
/// to end the accept loop. Sessions already in progress finish on their own.
#[derive(Debug)]
pub struct CommandServerHandle {
    binding: CommandBinding,
    endpoint: String,
    task: JoinHandle<()>,
}

impl CommandServerHandle {
    pub fn binding(&self) -> CommandBinding {
        self.binding
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

/// Run the command loop over any bound [`CommandListener`].
///
/// Spawns the accept loop and one task per accepted connection.
pub fn serve_commands<L>(
    listener: L,
    evictor: Arc<Evictor>,
    trigger: TriggerWaiter,
) -> CommandServerHandle
where
    L: CommandListener,
{
    let binding = listener.binding();
    let endpoint = listener.endpoint();

    let task = tokio::spawn(accept_loop(listener, evictor, trigger));

    CommandServerHandle {
        binding,
        endpoint,
        task,
    }
}

async fn accept_loop<L>(mut listener: L, evictor: Arc<Evictor>, trigger: TriggerWaiter)
where
    L: CommandListener,
{
    let binding = listener.binding();

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!("{} client connected from {}", binding, peer);
                let evictor = Arc::clone(&evictor);
                let trigger = trigger.clone();

                tokio::spawn(async move {
                    match serve_session(stream, &peer, binding, &evictor, &trigger).await {
                        Ok(()) => info!("{} client {} disconnected", binding, peer),
                        Err(e) => error!("{} session with {} ended: {}", binding, peer, e),
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept {} connection: {}", binding, e);
                sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

/// Bind the TCP command channel and start serving it.
///
/// # Errors
///
/// Returns [`ListenerError::Bind`] if the port cannot be bound.
pub async fn start_network_command_server(
    addr: &str,
    evictor: Arc<Evictor>,
    trigger: TriggerWaiter,
) -> Result<CommandServerHandle, ListenerError> {
    let listener = NetworkCommandListener::bind(addr).await?;
    Ok(serve_commands(listener, evictor, trigger))
}

/// Bind the local socket command channel and start serving it.
///
/// # Errors
///
/// Returns [`ListenerError::Bind`] if the socket path cannot be prepared or bound.
#[cfg(unix)]
pub fn start_local_command_server(
    path: &Path,
    evictor: Arc<Evictor>,
    trigger: TriggerWaiter,
) -> Result<CommandServerHandle, ListenerError> {
    let listener = LocalCommandListener::bind(path)?;
    Ok(serve_commands(listener, evictor, trigger))
}
