//! The interactive shell session: a long-lived bidirectional byte stream
//! on which prompt recognition drives request/response synchronisation.
//!
//! This is net-new relative to the teacher (`jmgao-adb`'s `client::shell`
//! implements the demultiplexed `shell,v2` protocol and a raw passthrough
//! for an interactive terminal — see `examples/jmgao-adb/src/client/shell/`
//! — neither of which is a prompt-synchronising scripting API), built in
//! the teacher's async style over `tokio::io` using the `regex` crate the
//! teacher already depends on for [`prompt::Prompt`] recognition.

pub mod prompt;
pub mod output;

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{AdbError, AdbResult};
pub use prompt::Prompt;

/// State of the shell session's request/response synchronisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShellState {
    /// No prompt has been recognised yet.
    WaitingForPrompt,
    /// A prompt is cached and valid; the shell is idle.
    Idle,
    /// A command has been sent; awaiting the next prompt.
    Executing,
    /// The underlying socket has been closed.
    Terminal,
}

/// How long [`ShellSession::get_prompt`]/`has_pending_bytes` waits, via
/// `TcpStream::peek`, to decide whether bytes are already sitting in the
/// socket's receive buffer. This is a liveness check, not a real timeout:
/// if the socket is genuinely idle the peek simply reports "no data".
const PENDING_CHECK_TIMEOUT: Duration = Duration::from_millis(1);

/// The maximum number of trailing bytes kept around purely for prompt
/// regex scanning, bounding the cost of repeated matching on long output.
const SCAN_WINDOW: usize = 4096;

/// An interactive shell session, opened by [`crate::client::AdbClient::start_shell`].
pub struct ShellSession {
    socket: TcpStream,
    state: ShellState,
    prompt: Option<Prompt>,
    valid_match: bool,
    scan_buffer: String,
}

impl ShellSession {
    pub(crate) fn new(socket: TcpStream) -> Self {
        ShellSession {
            socket,
            state: ShellState::WaitingForPrompt,
            prompt: None,
            valid_match: false,
            scan_buffer: String::new(),
        }
    }

    /// The current synchronisation state.
    pub fn state(&self) -> ShellState {
        self.state
    }

    /// The last recognised prompt, if any.
    pub fn prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    /// Whether the cached prompt (if any) is still considered valid.
    pub fn is_valid_match(&self) -> bool {
        self.valid_match
    }

    /// The working directory captured by the last recognised prompt.
    pub fn current_directory(&self) -> Option<&str> {
        self.prompt.as_ref().map(|p| p.directory.as_str())
    }

    /// Writes `cmd + "\n"` as ASCII bytes to the shell.
    pub async fn send_command(&mut self, cmd: &str) -> AdbResult<()> {
        self.socket.write_all(cmd.as_bytes()).await?;
        self.socket.write_all(b"\n").await?;
        self.state = ShellState::Executing;
        self.valid_match = false;
        self.scan_buffer.clear();
        Ok(())
    }

    /// Reads whatever bytes are currently buffered. If `wait` is set and
    /// none are buffered, suspends until some arrive. Invalidates any
    /// stale prompt state, then re-attempts prompt recognition if the
    /// chunk ends in `$ ` or `# `.
    pub async fn read_available(&mut self, wait: bool) -> AdbResult<Vec<u8>> {
        let mut buf = vec![0u8; 4096];
        let n = if wait {
            self.socket.read(&mut buf).await?
        } else {
            match self.socket.try_read(&mut buf) {
                Ok(n) => n,
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => 0,
                Err(err) => return Err(err.into()),
            }
        };
        buf.truncate(n);
        if n == 0 {
            self.state = ShellState::Terminal;
            return Ok(buf);
        }

        self.valid_match = false;
        self.prompt = None;
        if self.state != ShellState::Terminal {
            self.state = ShellState::Executing;
        }

        self.scan_buffer.push_str(&String::from_utf8_lossy(&buf));
        if self.scan_buffer.len() > SCAN_WINDOW {
            let excess = self.scan_buffer.len() - SCAN_WINDOW;
            self.scan_buffer.drain(..excess);
        }

        if buf.ends_with(b"$ ") || buf.ends_with(b"# ") {
            if let Some(prompt) = Prompt::try_match(&self.scan_buffer) {
                self.scan_buffer.clear();
                self.prompt = Some(prompt);
                self.valid_match = true;
                self.state = ShellState::Idle;
            }
        }

        Ok(buf)
    }

    /// Repeatedly calls [`ShellSession::read_available`] until a prompt is
    /// recognised, concatenating the bytes read. If `no_prompt` is set,
    /// the terminating prompt text is stripped from the returned string
    /// (it is still consumed from the wire).
    pub async fn read_to_end(&mut self, no_prompt: bool) -> AdbResult<String> {
        let mut accumulated = Vec::new();
        loop {
            let chunk = self.read_available(true).await?;
            if chunk.is_empty() {
                break;
            }
            accumulated.extend_from_slice(&chunk);
            if self.valid_match {
                break;
            }
        }

        let mut text = String::from_utf8_lossy(&accumulated).into_owned();
        if no_prompt {
            if let Some(prompt) = &self.prompt {
                if let Some(idx) = text.rfind(prompt.message.as_str()) {
                    text.truncate(idx);
                }
            }
        }
        Ok(text)
    }

    /// Whether any bytes are already sitting in the socket's receive
    /// buffer, without consuming them.
    async fn has_pending_bytes(&mut self) -> bool {
        let mut peek_buf = [0u8; 1];
        matches!(
            tokio::time::timeout(PENDING_CHECK_TIMEOUT, self.socket.peek(&mut peek_buf)).await,
            Ok(Ok(n)) if n > 0
        )
    }

    /// Returns the cached prompt if it's fresh and no bytes are pending;
    /// otherwise drains to the next prompt.
    pub async fn get_prompt(&mut self) -> AdbResult<Prompt> {
        if self.valid_match && !self.has_pending_bytes().await {
            if let Some(prompt) = self.prompt.clone() {
                return Ok(prompt);
            }
        }
        self.read_to_end(false).await?;
        self.prompt
            .clone()
            .ok_or_else(|| AdbError::ProtocolFault("shell closed before a prompt was recognised".into()))
    }

    /// Drains pending data to the prompt, sends `cmd`, and returns its
    /// output without the terminating prompt.
    pub async fn interact(&mut self, cmd: &str) -> AdbResult<String> {
        self.get_prompt().await?;
        self.send_command(cmd).await?;
        self.read_to_end(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr);
        let (server, client) = tokio::join!(
            async { listener.accept().await.unwrap().0 },
            async { client.await.unwrap() }
        );
        (server, client)
    }

    #[tokio::test]
    async fn interact_sends_command_and_returns_output_without_prompt() {
        let (mut server, client) = connected_pair().await;
        let mut session = ShellSession::new(client);

        server.write_all(b"\r\nhost:/ $ ").await.unwrap();
        let prompt = session.get_prompt().await.unwrap();
        assert_eq!(prompt.directory, "/");
        assert_eq!(prompt.user, '$');

        let server_task = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let n = server.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"pwd\n");
            server.write_all(b"/\r\nhost:/ $ ").await.unwrap();
        });

        let output = session.interact("pwd").await.unwrap();
        assert_eq!(output, "/\r\n");
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn read_available_invalidates_stale_prompt_state() {
        let (mut server, client) = connected_pair().await;
        let mut session = ShellSession::new(client);

        server.write_all(b"host:/ $ ").await.unwrap();
        session.read_available(true).await.unwrap();
        assert!(session.is_valid_match());

        server.write_all(b"more output\n").await.unwrap();
        session.read_available(true).await.unwrap();
        assert!(!session.is_valid_match());
    }
}
