pub mod command;
pub mod config;
pub mod connection;
pub mod listener;

pub use command::CommandError;
pub use config::ConfigError;
pub use connection::ConnectionError;
pub use listener::ListenerError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}
