//! Forward-spec grammar: `tcp:<port>`, `localabstract:<name>`,
//! `localreserved:<name>`, `localfilesystem:<name>`, `dev:<path>`,
//! `jdwp:<pid>`. The textual form is canonical and round-trips (spec.md
//! §3 Invariant, §8 Invariant 2).
//!
//! Grounded on `examples/JerryQ17-adbr/src/socket.rs`'s `AdbSocketFamily`
//! (same enum-of-newtypes shape and `Display`/`FromStr` round-trip
//! contract), narrowed to the families spec.md actually names.

use std::fmt;
use std::str::FromStr;

use crate::error::AdbError;

/// One side of a host↔device port forward.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ForwardSpec {
    Tcp(u16),
    LocalAbstract(String),
    LocalReserved(String),
    LocalFileSystem(String),
    Dev(String),
    Jdwp(u32),
}

impl fmt::Display for ForwardSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardSpec::Tcp(port) => write!(f, "tcp:{}", port),
            ForwardSpec::LocalAbstract(name) => write!(f, "localabstract:{}", name),
            ForwardSpec::LocalReserved(name) => write!(f, "localreserved:{}", name),
            ForwardSpec::LocalFileSystem(name) => write!(f, "localfilesystem:{}", name),
            ForwardSpec::Dev(path) => write!(f, "dev:{}", path),
            ForwardSpec::Jdwp(pid) => write!(f, "jdwp:{}", pid),
        }
    }
}

impl FromStr for ForwardSpec {
    type Err = AdbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AdbError::InvalidArgument(format!("invalid forward spec: {:?}", s));

        if let Some(tail) = s.strip_prefix("tcp:") {
            let port: u16 = tail.parse().map_err(|_| invalid())?;
            Ok(ForwardSpec::Tcp(port))
        } else if let Some(tail) = s.strip_prefix("localabstract:") {
            if tail.is_empty() {
                return Err(invalid());
            }
            Ok(ForwardSpec::LocalAbstract(tail.to_string()))
        } else if let Some(tail) = s.strip_prefix("localreserved:") {
            if tail.is_empty() {
                return Err(invalid());
            }
            Ok(ForwardSpec::LocalReserved(tail.to_string()))
        } else if let Some(tail) = s.strip_prefix("localfilesystem:") {
            if tail.is_empty() {
                return Err(invalid());
            }
            Ok(ForwardSpec::LocalFileSystem(tail.to_string()))
        } else if let Some(tail) = s.strip_prefix("dev:") {
            if tail.is_empty() {
                return Err(invalid());
            }
            Ok(ForwardSpec::Dev(tail.to_string()))
        } else if let Some(tail) = s.strip_prefix("jdwp:") {
            let pid: u32 = tail.parse().map_err(|_| invalid())?;
            Ok(ForwardSpec::Jdwp(pid))
        } else {
            Err(invalid())
        }
    }
}

/// A created or listed host↔device forward, as returned by `ListForward`/
/// `ListReverseForward`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardData {
    pub serial: String,
    pub local: ForwardSpec,
    pub remote: ForwardSpec,
}

impl ForwardData {
    /// Parses one line of `host-serial:<s>:list-forward` output:
    /// `<serial> <local> <remote>`.
    pub fn parse_line(line: &str) -> Option<ForwardData> {
        let mut parts = line.split_whitespace();
        let serial = parts.next()?.to_string();
        let local = parts.next()?.parse().ok()?;
        let remote = parts.next()?.parse().ok()?;
        Some(ForwardData { serial, local, remote })
    }
}
