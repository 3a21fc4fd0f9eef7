//! `RunLogService`: the binary logcat record stream (spec.md §4.5).
//!
//! Grounded on the teacher's use of `byteorder`+`num-derive` for
//! binary-record parsing (`examples/jmgao-adb` depends on both; the shell
//! v2 framing in `examples/jmgao-adb/src/client/shell/protocol.rs` is the
//! closest in-repo precedent for a length-prefixed binary record loop).
//! The v1 (20-byte) vs v2+ (>=24-byte, adds `lid`/`uid`) header split is
//! exactly the logger_entry vs logger_entry_v2 layouts of the Android
//! logging subsystem.

use byteorder::{ByteOrder, LittleEndian};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{AdbError, AdbResult};

/// Log buffer identifiers, as sent in a v2+ logger_entry header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(i32)]
pub enum LogId {
    Main = 0,
    Radio = 1,
    Events = 2,
    System = 3,
    Crash = 4,
    Stats = 5,
    Security = 6,
    Kernel = 7,
}

/// Android log priority levels, as encoded in the first byte of payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
#[repr(u8)]
pub enum LogPriority {
    Unknown = 0,
    Default = 1,
    Verbose = 2,
    Debug = 3,
    Info = 4,
    Warn = 5,
    Error = 6,
    Fatal = 7,
    Silent = 8,
}

/// One decoded log record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub log_id: Option<LogId>,
    pub pid: i32,
    pub tid: i32,
    pub sec: i32,
    pub nsec: i32,
    pub priority: LogPriority,
    pub tag: String,
    pub message: String,
}

/// Minimum bytes needed to decode a v1 header: len, hdr_size, pid, tid,
/// sec, nsec (each a `u16`/`i32`, 20 bytes total).
const V1_HEADER_LEN: usize = 20;

impl LogEntry {
    /// Parses one record, given the already-read `header` (`hdr_size`
    /// bytes, v1 or v2+) and its `payload` (`len` bytes: priority byte,
    /// NUL-terminated tag, NUL-terminated message).
    fn from_parts(header: &[u8], payload: &[u8]) -> AdbResult<LogEntry> {
        if header.len() < V1_HEADER_LEN {
            return Err(AdbError::ProtocolFault(
                "log entry header shorter than the minimum v1 layout".into(),
            ));
        }

        let pid = LittleEndian::read_i32(&header[4..8]);
        let tid = LittleEndian::read_i32(&header[8..12]);
        let sec = LittleEndian::read_i32(&header[12..16]);
        let nsec = LittleEndian::read_i32(&header[16..20]);

        let log_id = if header.len() >= 24 {
            let raw = LittleEndian::read_i32(&header[20..24]);
            LogId::from_i32(raw)
        } else {
            None
        };

        if payload.is_empty() {
            return Err(AdbError::ProtocolFault(
                "log entry payload missing priority byte".into(),
            ));
        }
        let priority = LogPriority::from_u8(payload[0]).unwrap_or(LogPriority::Unknown);

        let rest = &payload[1..];
        let tag_end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let tag = String::from_utf8_lossy(&rest[..tag_end]).into_owned();

        let message = if tag_end < rest.len() {
            let msg_start = tag_end + 1;
            let msg_bytes = &rest[msg_start..];
            let msg_end = msg_bytes
                .iter()
                .position(|&b| b == 0)
                .unwrap_or(msg_bytes.len());
            String::from_utf8_lossy(&msg_bytes[..msg_end]).into_owned()
        } else {
            String::new()
        };

        Ok(LogEntry {
            log_id,
            pid,
            tid,
            sec,
            nsec,
            priority,
            tag,
            message,
        })
    }
}

/// Reads exactly `buf.len()` bytes, remapping an EOF to
/// [`AdbError::EndOfStream`]: unlike a clean EOF at a record boundary,
/// an EOF partway through a record is not a normal termination.
async fn read_exact_mid_record<S: AsyncRead + Unpin>(socket: &mut S, buf: &mut [u8]) -> AdbResult<()> {
    match socket.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(AdbError::EndOfStream(
            "log stream ended in the middle of a record".into(),
        )),
        Err(err) => Err(err.into()),
    }
}

/// Reads successive [`LogEntry`] records off a `log:<buffer>` transport.
pub struct LogReader<S> {
    socket: S,
}

impl<S: AsyncRead + Unpin> LogReader<S> {
    pub fn new(socket: S) -> Self {
        LogReader { socket }
    }

    /// Reads the next record. Returns `Ok(None)` on a clean EOF between
    /// records (the device stopped logging); an EOF mid-record is an
    /// [`AdbError::EndOfStream`], not a normal termination.
    pub async fn read_entry(&mut self) -> AdbResult<Option<LogEntry>> {
        let mut len_buf = [0u8; 2];
        match self.socket.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => return Err(err.into()),
        }
        let len = LittleEndian::read_u16(&len_buf) as usize;

        let mut hdr_size_buf = [0u8; 2];
        read_exact_mid_record(&mut self.socket, &mut hdr_size_buf).await?;
        let hdr_size = LittleEndian::read_u16(&hdr_size_buf) as usize;
        if hdr_size < V1_HEADER_LEN {
            return Err(AdbError::ProtocolFault(format!(
                "log entry hdr_size {} is smaller than the v1 layout",
                hdr_size
            )));
        }

        let mut header = vec![0u8; hdr_size];
        header[0..2].copy_from_slice(&len_buf);
        header[2..4].copy_from_slice(&hdr_size_buf);
        read_exact_mid_record(&mut self.socket, &mut header[4..]).await?;

        let mut payload = vec![0u8; len];
        read_exact_mid_record(&mut self.socket, &mut payload).await?;

        LogEntry::from_parts(&header, &payload).map(Some)
    }
}
