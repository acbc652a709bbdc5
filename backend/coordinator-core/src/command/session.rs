//! The command loop shared by both bindings.

use crate::command::listener::CommandBinding;
use crate::command::request::EvictionRequest;
use crate::error::command::CommandError;
use crate::eviction::Evictor;
use crate::registry::TriggerWaiter;

use common::ErrorLocation;

use log::{error, info};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

/// Byte sent to a network peer once the threshold trigger has fired.
pub const START_SIGNAL: u8 = 1;

/// Longest command line accepted before the channel is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Serve one command-channel connection until the peer hangs up.
///
/// Malformed lines are logged and skipped. Read or write failures, and lines
/// longer than [`MAX_LINE_BYTES`], end the session with an error.
pub(crate) async fn serve_session<S>(
    stream: S,
    peer: &str,
    binding: CommandBinding,
    evictor: &Evictor,
    trigger: &TriggerWaiter,
) -> Result<(), CommandError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);

    if binding.sends_start_signal() {
        if !trigger.fired().await {
            info!("Threshold trigger dropped before firing, closing {}", peer);
            return Ok(());
        }

        write_half
            .write_all(&[START_SIGNAL])
            .await
            .map_err(CommandError::write)?;
        write_half.flush().await.map_err(CommandError::write)?;
        info!("Sent start signal to cleanup service at {}", peer);
    }

    let mut reader = BufReader::new(read_half);
    let mut line = Vec::new();

    while read_command_line(&mut reader, &mut line).await? {
        let request = match EvictionRequest::from_bytes(&line) {
            Ok(request) => request,
            Err(e) if e.is_recoverable() => {
                error!("Invalid number received from {}: {}", peer, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        info!(
            "Received {} message from {}: {}",
            binding,
            peer,
            request.count()
        );

        evictor.close_exactly(request.count()).await;

        write_half
            .write_all(request.acknowledgement().as_bytes())
            .await
            .map_err(CommandError::write)?;
        write_half.flush().await.map_err(CommandError::write)?;
    }

    Ok(())
}

/// Read one line into `buf` without its terminator.
///
/// Returns `Ok(false)` at end of stream. A final line without a newline is
/// still returned.
pub(crate) async fn read_command_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<bool, CommandError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();

    let read = (&mut *reader)
        .take(MAX_LINE_BYTES as u64 + 1)
        .read_until(b'\n', buf)
        .await
        .map_err(CommandError::read)?;

    if read == 0 {
        return Ok(false);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_LINE_BYTES {
        return Err(CommandError::LineTooLong {
            limit: MAX_LINE_BYTES,
            location: ErrorLocation::caller(),
        });
    }

    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    Ok(true)
}
