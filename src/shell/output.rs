//! Streaming remote-command execution (`ExecuteRemoteCommand`, spec.md
//! §4.4): a one-shot `shell:<cmd>` transport that pushes decoded lines at
//! a [`Receiver`] until EOF or cancellation, rather than the
//! prompt-synchronised [`super::ShellSession`].
//!
//! Grounded on the streaming-read loop shape in
//! `examples/p47t-rust-52-projects/adb-client/src/client.rs`
//! (`execute_command`), adapted to push lines at a [`Receiver`] and to
//! race reads against a [`CancelHandle`] with `tokio::select!`.

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::cancellation::CancelHandle;
use crate::error::{AdbError, AdbResult};
use crate::receiver::{MultiLineReceiver, Receiver};

/// Streams `cmd`'s output from an already-selected `shell:<cmd>`
/// transport into `receiver`, line by line, until the device closes the
/// stream or `cancel` is signalled.
///
/// Returns `Ok(())` on a clean EOF or a requested cancellation; I/O
/// errors other than a cancellation-induced read failure propagate.
pub async fn execute_remote_command<R: Receiver>(
    socket: &mut TcpStream,
    receiver: &mut R,
    cancel: &CancelHandle,
) -> AdbResult<()> {
    let mut buf = [0u8; 8192];
    let mut lines = MultiLineReceiver::new(|batch: &[String]| {
        for line in batch {
            receiver.add_output(line);
        }
    });

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = socket.read(&mut buf) => {
                let n = result.map_err(|err| {
                    AdbError::ShellCommandUnresponsive(format!("shell stream read failed: {}", err))
                })?;
                if n == 0 {
                    break;
                }
                lines.feed(&String::from_utf8_lossy(&buf[..n]));
            }
        }
    }

    lines.finish();
    receiver.flush();
    Ok(())
}
