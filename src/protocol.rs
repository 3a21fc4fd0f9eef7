//! The `####LEN+payload` framed transport: request encoding, status reads,
//! length-prefixed string reads, and the device-selection handshake.
//!
//! This is the wire-level codec every façade operation in [`crate::client`]
//! is a short script over. Grounded on the teacher's
//! `client::write_hex_length_prefixed`/`read_okay` (`src/client/mod.rs`),
//! reimplemented over `tokio::io` instead of `futures::io`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{AdbError, AdbResult};

/// Encodes `payload` as a `####LEN+payload` frame using the default
/// ISO-8859-1-compatible byte encoding (every ASCII service request is a
/// 1:1 byte mapping, so this operates on raw bytes directly).
pub fn encode_request(payload: &str) -> Vec<u8> {
    encode_request_bytes(payload.as_bytes())
}

/// As [`encode_request`], but for payloads that are already raw bytes
/// (used for the 32 KiB install body chunks, which are not text).
pub fn encode_request_bytes(payload: &[u8]) -> Vec<u8> {
    let mut framed = format!("{:04x}", payload.len()).into_bytes();
    framed.extend_from_slice(payload);
    framed
}

/// Writes a length-prefixed request frame to `stream`.
pub async fn write_request<W: AsyncWrite + Unpin>(stream: &mut W, payload: &str) -> AdbResult<()> {
    trace!(target = "adbhost::protocol", %payload, "sending request");
    stream.write_all(&encode_request(payload)).await?;
    Ok(())
}

/// Reads the four-byte `OKAY`/`FAIL` status word. On `FAIL`, reads the
/// trailing length-prefixed diagnostic string and returns it as
/// [`AdbError::ServerFail`]. Any other four bytes is a protocol violation.
pub async fn read_status<R: AsyncRead + Unpin>(stream: &mut R) -> AdbResult<()> {
    let mut status = [0u8; 4];
    stream.read_exact(&mut status).await?;
    match &status {
        b"OKAY" => Ok(()),
        b"FAIL" => {
            let message = read_length_prefixed_string(stream).await?;
            Err(AdbError::ServerFail(message))
        }
        other => Err(AdbError::ProtocolFault(format!(
            "expected OKAY or FAIL, got {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Reads four ASCII hex digits followed by exactly that many bytes,
/// decoded as UTF-8. A short read or non-hex length fails with
/// [`AdbError::ProtocolFault`].
pub async fn read_length_prefixed_string<R: AsyncRead + Unpin>(stream: &mut R) -> AdbResult<String> {
    let bytes = read_length_prefixed_bytes(stream).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// As [`read_length_prefixed_string`], but returns the raw bytes without
/// decoding. Used by callers (e.g. `root`/`unroot`) that need to enforce a
/// stricter encoding than the default.
pub async fn read_length_prefixed_bytes<R: AsyncRead + Unpin>(stream: &mut R) -> AdbResult<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            AdbError::ProtocolFault("short read while reading length prefix".into())
        } else {
            AdbError::Io(err)
        }
    })?;

    let len_str = std::str::from_utf8(&len_buf)
        .map_err(|_| AdbError::ProtocolFault(format!("non-ASCII length prefix: {:?}", len_buf)))?;
    let len = usize::from_str_radix(len_str, 16)
        .map_err(|_| AdbError::ProtocolFault(format!("invalid hex length: {:?}", len_str)))?;

    let mut data = vec![0u8; len];
    stream.read_exact(&mut data).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            AdbError::ProtocolFault(format!("short read: expected {} bytes", len))
        } else {
            AdbError::Io(err)
        }
    })?;
    Ok(data)
}

/// Performs the `host:transport:<serial>` (or `host-serial:<serial>:...`)
/// device-selection handshake: sends the request, reads the single `OKAY`,
/// and returns the still-open stream bound to that device for subsequent
/// service requests.
pub async fn select_device<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S, serial: &str) -> AdbResult<()> {
    if serial.is_empty() {
        return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
    }
    let request = format!("host:transport:{}", serial);
    write_request(stream, &request).await?;
    read_status(stream).await
}

/// Performs the `host:transport-any` handshake when no serial is given,
/// used by operations that don't require device selection by serial but do
/// need to bind to *some* device (e.g. `shell:`, `install`).
pub async fn select_any_device<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) -> AdbResult<()> {
    write_request(stream, "host:transport-any").await?;
    read_status(stream).await
}

/// Reads the two sequential `OKAY` frames the `forward`/`reverse:forward`
/// services emit (one for the request itself, one for the forward having
/// been established), then the length-prefixed port string. Returns 0 if
/// the port string is empty or unparsable, matching spec.md's
/// `CreateForward` response handling.
pub async fn read_forward_port<R: AsyncRead + Unpin>(stream: &mut R) -> AdbResult<u16> {
    read_status(stream).await?;
    read_status(stream).await?;
    let port_str = read_length_prefixed_string(stream).await?;
    Ok(port_str.trim().parse().unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encode_request_hex_length_matches_ascii_spec() {
        let framed = encode_request("host:version");
        assert_eq!(&framed[..4], b"000c");
        assert_eq!(&framed[4..], b"host:version");
    }

    #[test]
    fn encode_request_accepts_uppercase_or_lowercase_on_read() {
        // §8 Invariant 1: first four bytes are the hex length of the payload.
        let framed = encode_request("shell:ls");
        assert_eq!(framed.len(), 4 + "shell:ls".len());
        let len = usize::from_str_radix(std::str::from_utf8(&framed[..4]).unwrap(), 16).unwrap();
        assert_eq!(len, "shell:ls".len());
    }

    #[tokio::test]
    async fn read_status_okay() {
        let mut cursor = Cursor::new(b"OKAY".to_vec());
        assert!(read_status(&mut cursor).await.is_ok());
    }

    #[tokio::test]
    async fn read_status_fail_surfaces_message() {
        let mut payload = b"FAIL".to_vec();
        payload.extend_from_slice(b"000edevice offline");
        let mut cursor = Cursor::new(payload);
        let err = read_status(&mut cursor).await.unwrap_err();
        match err {
            AdbError::ServerFail(msg) => assert_eq!(msg, "device offline"),
            other => panic!("expected ServerFail, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn read_status_unexpected_bytes_is_protocol_fault() {
        let mut cursor = Cursor::new(b"NOPE".to_vec());
        let err = read_status(&mut cursor).await.unwrap_err();
        assert!(matches!(err, AdbError::ProtocolFault(_)));
    }

    #[tokio::test]
    async fn read_length_prefixed_string_round_trips() {
        let mut payload = b"0005".to_vec();
        payload.extend_from_slice(b"hello");
        let mut cursor = Cursor::new(payload);
        let s = read_length_prefixed_string(&mut cursor).await.unwrap();
        assert_eq!(s, "hello");
    }

    #[tokio::test]
    async fn read_length_prefixed_string_short_read_is_protocol_fault() {
        let mut cursor = Cursor::new(b"0010abc".to_vec());
        let err = read_length_prefixed_string(&mut cursor).await.unwrap_err();
        assert!(matches!(err, AdbError::ProtocolFault(_)));
    }

    #[tokio::test]
    async fn select_device_rejects_empty_serial_without_touching_socket() {
        let mut cursor = Cursor::new(Vec::new());
        let err = select_device(&mut cursor, "").await.unwrap_err();
        assert!(matches!(err, AdbError::InvalidArgument(_)));
        assert!(cursor.get_ref().is_empty(), "no bytes should have been written");
    }

    #[tokio::test]
    async fn read_forward_port_empty_string_is_zero() {
        let mut payload = b"OKAYOKAY".to_vec();
        payload.extend_from_slice(b"0000");
        let mut cursor = Cursor::new(payload);
        let port = read_forward_port(&mut cursor).await.unwrap();
        assert_eq!(port, 0);
    }

    #[tokio::test]
    async fn read_forward_port_parses_hex_free_decimal_string() {
        // Real adb servers return the port as a plain decimal ASCII string.
        let mut payload = b"OKAYOKAY".to_vec();
        payload.extend_from_slice(b"00041234");
        let mut cursor = Cursor::new(payload);
        let port = read_forward_port(&mut cursor).await.unwrap();
        assert_eq!(port, 1234);
    }
}
