//! `AdbClient`: the host-side façade over every `host:` service request
//! (spec.md §4.2).
//!
//! Every method here follows the same shape the teacher's
//! `Host::connect`/`Client::connect` pair uses
//! (`examples/jmgao-adb/src/host/mod.rs`, `src/client/mod.rs`): open one
//! fresh connection via [`Endpoint::connect`], run the service's request/
//! response script against it with helpers from [`crate::protocol`], and
//! let the connection drop. No connection pooling — matches the "one
//! request, one connection" model the wire protocol assumes.

use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tracing::instrument;

use crate::cancellation::CancelHandle;
use crate::device::DeviceData;
use crate::endpoint::Endpoint;
use crate::error::{AdbError, AdbResult};
use crate::forward::{ForwardData, ForwardSpec};
use crate::framebuffer::Framebuffer;
use crate::log::{LogId, LogReader};
use crate::protocol::{
    encode_request_bytes, read_forward_port, read_length_prefixed_string, read_status,
    select_any_device, select_device, write_request,
};
use crate::receiver::Receiver;
use crate::shell::output::execute_remote_command;
use crate::shell::ShellSession;

/// The full feature set of a device, as reported by `host:features` or a
/// transport-scoped `host-serial:<s>:features` request.
pub type FeatureSet = std::collections::BTreeSet<String>;

/// How long [`AdbClient::root`]/[`AdbClient::unroot`] wait after a
/// successful restart for adbd to come back up. A fixed pause, not a
/// readiness probe: a network-attached device may never reconnect, and
/// polling for it is out of scope here.
const POST_ROOT_RESTART_DELAY: std::time::Duration = std::time::Duration::from_millis(3000);

/// The host-side client façade. Cheap to clone — it only carries the
/// server [`Endpoint`], not a live connection.
#[derive(Clone, Debug)]
pub struct AdbClient {
    endpoint: Endpoint,
}

impl AdbClient {
    /// A client targeting the default local adb server (`127.0.0.1:5037`).
    pub fn new() -> Self {
        AdbClient {
            endpoint: Endpoint::default_local(),
        }
    }

    /// A client targeting an explicit server endpoint.
    pub fn with_endpoint(endpoint: Endpoint) -> Self {
        AdbClient { endpoint }
    }

    async fn connect(&self) -> AdbResult<TcpStream> {
        self.endpoint.connect().await
    }

    /// `host:version` — the adb server's protocol version.
    #[instrument(skip(self))]
    pub async fn get_adb_version(&self) -> AdbResult<u32> {
        let mut stream = self.connect().await?;
        write_request(&mut stream, "host:version").await?;
        read_status(&mut stream).await?;
        let version_str = read_length_prefixed_string(&mut stream).await?;
        u32::from_str_radix(version_str.trim(), 16)
            .map_err(|_| AdbError::ProtocolFault(format!("non-hex version string: {:?}", version_str)))
    }

    /// `host:kill` — asks the server to terminate.
    #[instrument(skip(self))]
    pub async fn kill_adb(&self) -> AdbResult<()> {
        let mut stream = self.connect().await?;
        write_request(&mut stream, "host:kill").await?;
        read_status(&mut stream).await
    }

    /// `host:devices-l` — every attached device and its metadata.
    #[instrument(skip(self))]
    pub async fn get_devices(&self) -> AdbResult<Vec<DeviceData>> {
        let mut stream = self.connect().await?;
        write_request(&mut stream, "host:devices-l").await?;
        read_status(&mut stream).await?;
        let text = read_length_prefixed_string(&mut stream).await?;
        Ok(DeviceData::parse_list(&text))
    }

    /// `host-serial:<serial>:forward:<spec>` — creates a host→device
    /// port forward, returning the bound local port (0 if the server
    /// didn't report one, e.g. a fixed `tcp:` local spec).
    #[instrument(skip(self))]
    pub async fn create_forward(
        &self,
        serial: &str,
        local: &ForwardSpec,
        remote: &ForwardSpec,
    ) -> AdbResult<u16> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        let request = format!("host-serial:{}:forward:{};{}", serial, local, remote);
        write_request(&mut stream, &request).await?;
        read_forward_port(&mut stream).await
    }

    /// `host-serial:<serial>:reverse:forward:<spec>` — creates a
    /// device→host port forward.
    #[instrument(skip(self))]
    pub async fn create_reverse_forward(
        &self,
        serial: &str,
        remote: &ForwardSpec,
        local: &ForwardSpec,
    ) -> AdbResult<u16> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        let request = format!("reverse:forward:{};{}", remote, local);
        write_request(&mut stream, &request).await?;
        read_forward_port(&mut stream).await
    }

    /// `host-serial:<serial>:killforward:<spec>` — removes one forward.
    #[instrument(skip(self))]
    pub async fn remove_forward(&self, serial: &str, local: &ForwardSpec) -> AdbResult<()> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        let request = format!("host-serial:{}:killforward:{}", serial, local);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await
    }

    /// `host-serial:<serial>:killforward-all` — removes every forward for
    /// this device.
    #[instrument(skip(self))]
    pub async fn remove_all_forwards(&self, serial: &str) -> AdbResult<()> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        let request = format!("host-serial:{}:killforward-all", serial);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await
    }

    /// `host-serial:<serial>:list-forward` — every active host→device
    /// forward for this device.
    #[instrument(skip(self))]
    pub async fn list_forward(&self, serial: &str) -> AdbResult<Vec<ForwardData>> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        let request = format!("host-serial:{}:list-forward", serial);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        let text = read_length_prefixed_string(&mut stream).await?;
        Ok(text.lines().filter_map(ForwardData::parse_line).collect())
    }

    /// `reverse:list-forward` — every active device→host forward for the
    /// selected device.
    #[instrument(skip(self))]
    pub async fn list_reverse_forward(&self, serial: &str) -> AdbResult<Vec<ForwardData>> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        write_request(&mut stream, "reverse:list-forward").await?;
        read_status(&mut stream).await?;
        let text = read_length_prefixed_string(&mut stream).await?;
        Ok(text.lines().filter_map(ForwardData::parse_line).collect())
    }

    /// `host:connect:<host>:<port>` — connects the server to a
    /// network-attached device.
    #[instrument(skip(self))]
    pub async fn connect_device(&self, host: &str, port: u16) -> AdbResult<String> {
        let mut stream = self.connect().await?;
        let request = format!("host:connect:{}:{}", host, port);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        read_length_prefixed_string(&mut stream).await
    }

    /// `host:disconnect:<host>:<port>` — disconnects a network device.
    #[instrument(skip(self))]
    pub async fn disconnect_device(&self, host: &str, port: u16) -> AdbResult<String> {
        let mut stream = self.connect().await?;
        let request = format!("host:disconnect:{}:{}", host, port);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        read_length_prefixed_string(&mut stream).await
    }

    /// `host:pair:<pairing_code>:<host>:<port>` — pairs with a
    /// network device over Wi-Fi debugging. A `Failed:`-prefixed reply is
    /// a typed failure, not a successful status string.
    #[instrument(skip(self, pairing_code))]
    pub async fn pair(&self, host: &str, port: u16, pairing_code: &str) -> AdbResult<String> {
        let mut stream = self.connect().await?;
        let request = format!("host:pair:{}:{}:{}", pairing_code, host, port);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        let text = read_length_prefixed_string(&mut stream).await?;
        if let Some(reason) = text.strip_prefix("Failed:") {
            return Err(AdbError::ServerFail(reason.trim().to_string()));
        }
        Ok(text)
    }

    /// `reboot:<target>` — reboots the selected device into `target`
    /// (empty string for a normal reboot, or `bootloader`/`recovery`/`sideload`).
    #[instrument(skip(self))]
    pub async fn reboot(&self, serial: &str, target: &str) -> AdbResult<()> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        let request = format!("reboot:{}", target);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await
    }

    /// `root:` — restarts the device's adbd as root. The terminal token
    /// is strictly UTF-8 (spec.md's encoding exception for this operation).
    /// Waits [`POST_ROOT_RESTART_DELAY`] afterwards for adbd to come back,
    /// matching the source's fixed post-root pause rather than inventing
    /// a readiness probe.
    #[instrument(skip(self))]
    pub async fn root(&self, serial: &str) -> AdbResult<String> {
        let response = self.root_or_unroot(serial, "root:").await?;
        tokio::time::sleep(POST_ROOT_RESTART_DELAY).await;
        Ok(response)
    }

    /// `unroot:` — restarts the device's adbd unprivileged. Same
    /// post-restart pause as [`AdbClient::root`].
    #[instrument(skip(self))]
    pub async fn unroot(&self, serial: &str) -> AdbResult<String> {
        let response = self.root_or_unroot(serial, "unroot:").await?;
        tokio::time::sleep(POST_ROOT_RESTART_DELAY).await;
        Ok(response)
    }

    async fn root_or_unroot(&self, serial: &str, request: &str) -> AdbResult<String> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        write_request(&mut stream, request).await?;
        read_status(&mut stream).await?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes).await?;
        let text = String::from_utf8(bytes)
            .map_err(|_| AdbError::ProtocolFault("root/unroot response was not valid UTF-8".into()))?;
        if text.trim().to_ascii_lowercase() != "restarting" {
            return Err(AdbError::ServerFail(text.trim().to_string()));
        }
        Ok(text)
    }

    /// `host-serial:<serial>:features` — the device's supported feature set.
    #[instrument(skip(self))]
    pub async fn get_feature_set(&self, serial: &str) -> AdbResult<FeatureSet> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        let request = format!("host-serial:{}:features", serial);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        let text = read_length_prefixed_string(&mut stream).await?;
        Ok(text
            .trim()
            .split(|c| c == ',' || c == '\n')
            .filter(|f| !f.is_empty())
            .map(|f| f.to_string())
            .collect())
    }

    /// `Install` — uploads `apk_path` to the selected device via
    /// `exec:cmd package 'install'  -S <size>` (the double space before
    /// `-S` matches what the package manager's argument parser expects
    /// when no extra install flags are given) and validates the
    /// installer's UTF-8 status line.
    #[instrument(skip(self))]
    pub async fn install(&self, serial: &str, apk_path: &Path) -> AdbResult<()> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let size = tokio::fs::metadata(apk_path).await?.len();
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        let request = format!("exec:cmd package 'install'  -S {}", size);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        crate::install::install(&mut stream, apk_path).await
    }

    /// `ExecuteRemoteCommand` — runs `command` via `shell:<command>`,
    /// streaming decoded lines to `receiver` until EOF or `cancel`.
    #[instrument(skip(self, receiver, cancel))]
    pub async fn execute_remote_command<R: Receiver>(
        &self,
        serial: &str,
        command: &str,
        receiver: &mut R,
        cancel: &CancelHandle,
    ) -> AdbResult<()> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        let request = format!("shell:{}", command);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        execute_remote_command(&mut stream, receiver, cancel).await
    }

    /// `StartShell` — opens an interactive, prompt-synchronised
    /// `shell:` session on the selected device.
    #[instrument(skip(self))]
    pub async fn start_shell(&self, serial: &str) -> AdbResult<ShellSession> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        write_request(&mut stream, "shell:").await?;
        read_status(&mut stream).await?;
        Ok(ShellSession::new(stream))
    }

    /// `RunLogService` — opens `log:<buffer>` on the selected device and
    /// returns a reader that yields successive [`crate::log::LogEntry`]
    /// records until EOF.
    #[instrument(skip(self))]
    pub async fn run_log_service(
        &self,
        serial: &str,
        log_id: LogId,
    ) -> AdbResult<LogReader<TcpStream>> {
        let buffer_name = match log_id {
            LogId::Main => "main",
            LogId::Radio => "radio",
            LogId::Events => "events",
            LogId::System => "system",
            LogId::Crash => "crash",
            LogId::Stats => "stats",
            LogId::Security => "security",
            LogId::Kernel => "kernel",
        };
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        let request = format!("log:{}", buffer_name);
        write_request(&mut stream, &request).await?;
        read_status(&mut stream).await?;
        Ok(LogReader::new(stream))
    }

    /// `CreateRefreshableFramebuffer` — opens `framebuffer:` on the
    /// selected device and reads one snapshot. Call again to refresh;
    /// each call opens its own fresh connection, so refreshing is
    /// idempotent and never observes a partially-updated prior snapshot.
    #[instrument(skip(self))]
    pub async fn create_framebuffer(&self, serial: &str) -> AdbResult<Framebuffer> {
        if serial.is_empty() {
            return Err(AdbError::InvalidArgument("device serial must not be empty".into()));
        }
        let mut stream = self.connect().await?;
        select_device(&mut stream, serial).await?;
        write_request(&mut stream, "framebuffer:").await?;
        read_status(&mut stream).await?;
        Framebuffer::read(&mut stream).await
    }
}

impl Default for AdbClient {
    fn default() -> Self {
        AdbClient::new()
    }
}

/// Writes `payload` to `stream` using the raw framed encoding, bypassing
/// the UTF-8-assuming [`crate::protocol::write_request`] helper. Used by
/// [`crate::install`] for the chunked binary upload body.
#[allow(dead_code)]
pub(crate) fn encode_raw(payload: &[u8]) -> Vec<u8> {
    encode_request_bytes(payload)
}
