//! `Install` (spec.md §4.4): chunked APK upload over the `sync:`-style
//! `exec:cmd package install` pipe, followed by a UTF-8 terminal-token
//! check against the installer's final status line.
//!
//! Grounded on the chunked-write loop the teacher already uses for file
//! push (`examples/jmgao-adb/src/client/mod.rs`'s sync push path), kept
//! at the spec's 32 KiB chunk size, reading via `tokio::fs`.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{AdbError, AdbResult};

/// Chunk size used when streaming the APK to the device, matching the
/// sync protocol's maximum data-chunk length.
const CHUNK_SIZE: usize = 32 * 1024;

/// The exact success token the installer prints on completion.
const SUCCESS_TOKEN: &str = "Success\n";

/// Streams `apk_path`'s contents to an already-selected install
/// transport in `CHUNK_SIZE` chunks, then reads the installer's final
/// status line and validates it strictly as UTF-8 against
/// [`SUCCESS_TOKEN`].
pub async fn install(socket: &mut TcpStream, apk_path: &std::path::Path) -> AdbResult<()> {
    let mut file = tokio::fs::File::open(apk_path).await?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        socket.write_all(&buf[..n]).await?;
    }
    socket.shutdown().await?;

    let mut response = Vec::new();
    socket.read_to_end(&mut response).await?;

    let text = std::str::from_utf8(&response).map_err(|_| {
        AdbError::ProtocolFault("install status line was not valid UTF-8".into())
    })?;

    if text.trim_end() == SUCCESS_TOKEN.trim_end() {
        Ok(())
    } else {
        Err(AdbError::ServerFail(text.trim_end().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt as _;
    use tokio::net::TcpListener;

    async fn write_temp_apk(contents: &[u8]) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn successful_install_streams_chunks_and_recognises_success_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let payload = vec![0xABu8; CHUNK_SIZE + 10];
        let expected = payload.clone();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            assert_eq!(received, expected);
            socket.write_all(b"Success\n").await.unwrap();
        });

        let apk = write_temp_apk(&payload).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let result = install(&mut client, apk.path()).await;
        server.await.unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn failure_message_surfaces_as_server_fail() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            socket
                .write_all(b"Failure [INSTALL_FAILED_INVALID_APK]\n")
                .await
                .unwrap();
        });

        let apk = write_temp_apk(b"not really an apk").await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        let result = install(&mut client, apk.path()).await;
        server.await.unwrap();

        match result {
            Err(AdbError::ServerFail(msg)) => {
                assert!(msg.contains("INSTALL_FAILED_INVALID_APK"))
            }
            other => panic!("expected ServerFail, got {:?}", other),
        }
    }
}
