//! Listener abstraction shared by both command channel bindings.

use crate::error::listener::ListenerError;

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::future::Future;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::{Path, PathBuf};

use log::info;
#[cfg(unix)]
use log::warn;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

/// Which command channel a listener serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBinding {
    /// TCP, used by the remote cleanup agent. Sends the start byte once the trigger fires.
    Network,
    /// Unix domain socket, same-host tooling only. No preamble.
    Local,
}

impl CommandBinding {
    pub fn sends_start_signal(&self) -> bool {
        matches!(self, CommandBinding::Network)
    }
}

impl Display for CommandBinding {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        match self {
            CommandBinding::Network => formatter.write_str("service"),
            CommandBinding::Local => formatter.write_str("IPC"),
        }
    }
}

/// A bound listener that yields command-channel streams.
pub trait CommandListener: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn binding(&self) -> CommandBinding;

    /// Human-readable bound address, for logs and handles.
    fn endpoint(&self) -> String;

    /// Accept the next connection and a printable peer name.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<(Self::Stream, String), ListenerError>> + Send;
}

pub struct NetworkCommandListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl NetworkCommandListener {
    /// Bind the TCP command port.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Bind`] if the address is in use or not bindable.
    pub async fn bind(addr: &str) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ListenerError::bind(addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ListenerError::bind(addr, e))?;

        info!("Service communication server listening on {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl CommandListener for NetworkCommandListener {
    type Stream = TcpStream;

    fn binding(&self) -> CommandBinding {
        CommandBinding::Network
    }

    fn endpoint(&self) -> String {
        self.local_addr.to_string()
    }

    async fn accept(&mut self) -> Result<(TcpStream, String), ListenerError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| ListenerError::accept(self.local_addr.to_string(), e))?;
        Ok((stream, peer.to_string()))
    }
}

/// Unix socket listener; owns its socket file and unlinks it on drop.
#[cfg(unix)]
pub struct LocalCommandListener {
    listener: UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
impl LocalCommandListener {
    /// Bind the local socket, removing any stale socket file first.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Bind`] if the stale file cannot be removed or the
    /// socket cannot be bound.
    pub fn bind(path: &Path) -> Result<Self, ListenerError> {
        let endpoint = path.display().to_string();

        match std::fs::remove_file(path) {
            Ok(()) => info!("Removed stale IPC socket file {}", endpoint),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ListenerError::bind(endpoint, e)),
        }

        let listener = UnixListener::bind(path).map_err(|e| ListenerError::bind(&endpoint, e))?;

        info!("IPC server listening on {}", endpoint);
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(unix)]
impl CommandListener for LocalCommandListener {
    type Stream = UnixStream;

    fn binding(&self) -> CommandBinding {
        CommandBinding::Local
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }

    async fn accept(&mut self) -> Result<(UnixStream, String), ListenerError> {
        let (stream, _) = self
            .listener
            .accept()
            .await
            .map_err(|e| ListenerError::accept(self.endpoint(), e))?;
        Ok((stream, format!("unix:{}", self.path.display())))
    }
}

#[cfg(unix)]
impl Drop for LocalCommandListener {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "Failed to remove IPC socket file {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}
