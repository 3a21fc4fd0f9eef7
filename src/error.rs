//! Error taxonomy for the ADB host protocol client.

use thiserror::Error;

/// Errors surfaced by every operation in this crate.
///
/// Variants correspond to the error kinds named in the protocol
/// specification rather than to any particular transport detail.
#[derive(Debug, Error)]
pub enum AdbError {
    /// A mandatory argument (device serial, endpoint, stream) was null or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested endpoint family or socket capability isn't supported.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Malformed framing, a short read, or unexpected status bytes.
    #[error("protocol fault: {0}")]
    ProtocolFault(String),

    /// The server replied `FAIL` (or an equivalent typed failure token)
    /// with a diagnostic message.
    #[error("adb server error: {0}")]
    ServerFail(String),

    /// A streaming shell read raised an I/O error without cancellation
    /// having been requested.
    #[error("shell command unresponsive: {0}")]
    ShellCommandUnresponsive(String),

    /// No device matched the selection criteria.
    #[error("no device found matching the given criteria")]
    DeviceNotFound,

    /// More than one device matched the selection criteria.
    #[error("multiple devices match the given criteria")]
    MultipleDevicesMatch,

    /// Shell output matched a recognised `permission denied` pattern.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Shell output matched a recognised `file not found` pattern.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Shell output matched a recognised `unknown option` pattern.
    #[error("unknown option: {0}")]
    UnknownOption(String),

    /// Shell output matched a recognised `Aborting.` pattern.
    #[error("command aborting: {0}")]
    CommandAborting(String),

    /// Normal stream termination observed where a complete record was
    /// expected (a mid-record short read).
    #[error("unexpected end of stream: {0}")]
    EndOfStream(String),

    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout this crate.
pub type AdbResult<T> = Result<T, AdbError>;
