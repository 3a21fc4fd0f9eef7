//! Command-line front end over [`adbhost::client::AdbClient`].
//!
//! Grounded on `examples/p47t-rust-52-projects/adb-client/src/main.rs`
//! (clap v4 derive `Cli`/`Commands`, `tracing_subscriber::fmt::init`) and
//! the teacher's subcommand inventory in
//! `examples/jmgao-adb/src/binary/main.rs` (`clap_app!` macro, same
//! version/devices/shell/forward/install/logcat/root/unroot/connect/
//! disconnect/reboot surface, rewritten to the derive API).

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use adbhost::cancellation::CancelHandle;
use adbhost::client::AdbClient;
use adbhost::endpoint::Endpoint;
use adbhost::forward::ForwardSpec;
use adbhost::log::LogId;
use adbhost::receiver::ConsoleOutputReceiver;

#[derive(Parser)]
#[command(name = "adbhost-cli")]
#[command(about = "Host-side client for the ADB wire protocol")]
struct Cli {
    /// adb server host address.
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// adb server port.
    #[arg(short = 'P', long, default_value_t = 5037)]
    port: u16,

    /// Target device serial number.
    #[arg(short, long)]
    serial: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the adb server's protocol version.
    Version,

    /// List attached devices.
    Devices,

    /// Run a one-shot shell command and stream its output.
    Shell {
        /// Command to run.
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Create a host -> device port forward.
    Forward { local: String, remote: String },

    /// Create a device -> host port forward.
    ReverseForward { remote: String, local: String },

    /// Install an APK on the device.
    Install {
        /// Path to the APK file.
        apk: PathBuf,
    },

    /// Stream the device log (logcat).
    Logcat {
        /// Log buffer to read from.
        #[arg(default_value = "main")]
        buffer: String,
    },

    /// Restart adbd with root privileges.
    Root,

    /// Restart adbd without root privileges.
    Unroot,

    /// Connect to a network-attached device.
    Connect { host: String, port: u16 },

    /// Disconnect a network-attached device.
    Disconnect { host: String, port: u16 },

    /// Reboot the device.
    Reboot {
        /// Target to reboot into: empty, "bootloader", "recovery", or "sideload".
        #[arg(default_value = "")]
        target: String,
    },
}

fn log_id_from_buffer_name(name: &str) -> Option<LogId> {
    match name {
        "main" => Some(LogId::Main),
        "radio" => Some(LogId::Radio),
        "events" => Some(LogId::Events),
        "system" => Some(LogId::System),
        "crash" => Some(LogId::Crash),
        "stats" => Some(LogId::Stats),
        "security" => Some(LogId::Security),
        "kernel" => Some(LogId::Kernel),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            Cli::command().print_help()?;
            println!();
            return Ok(());
        }
    };

    let client = AdbClient::with_endpoint(Endpoint::new(cli.host, cli.port));
    let serial = cli.serial.unwrap_or_default();

    match command {
        Commands::Version => {
            let version = client.get_adb_version().await?;
            println!("adb server version: {:#06x}", version);
        }
        Commands::Devices => {
            let devices = client.get_devices().await?;
            if devices.is_empty() {
                println!("no devices connected");
            } else {
                println!("{:<24} state", "serial");
                for device in &devices {
                    println!("{:<24} {}", device.serial, device.state);
                }
            }
        }
        Commands::Shell { command } => {
            let cmd = command.join(" ");
            let mut receiver = ConsoleOutputReceiver::new(true);
            let cancel = CancelHandle::new();
            client
                .execute_remote_command(&serial, &cmd, &mut receiver, &cancel)
                .await?;
            for line in receiver.lines() {
                println!("{}", line);
            }
        }
        Commands::Forward { local, remote } => {
            let local: ForwardSpec = local.parse()?;
            let remote: ForwardSpec = remote.parse()?;
            let port = client.create_forward(&serial, &local, &remote).await?;
            println!("forwarded on port {}", port);
        }
        Commands::ReverseForward { remote, local } => {
            let remote: ForwardSpec = remote.parse()?;
            let local: ForwardSpec = local.parse()?;
            let port = client
                .create_reverse_forward(&serial, &remote, &local)
                .await?;
            println!("reverse-forwarded on port {}", port);
        }
        Commands::Install { apk } => {
            client.install(&serial, &apk).await?;
            println!("install succeeded");
        }
        Commands::Logcat { buffer } => {
            let log_id = log_id_from_buffer_name(&buffer)
                .ok_or_else(|| format!("unknown log buffer: {}", buffer))?;
            let mut reader = client.run_log_service(&serial, log_id).await?;
            while let Some(entry) = reader.read_entry().await? {
                println!("{:?} {}/{}: {}", entry.priority, entry.tag, entry.pid, entry.message);
            }
        }
        Commands::Root => println!("{}", client.root(&serial).await?.trim_end()),
        Commands::Unroot => println!("{}", client.unroot(&serial).await?.trim_end()),
        Commands::Connect { host, port } => {
            println!("{}", client.connect_device(&host, port).await?.trim_end());
        }
        Commands::Disconnect { host, port } => {
            println!("{}", client.disconnect_device(&host, port).await?.trim_end());
        }
        Commands::Reboot { target } => {
            client.reboot(&serial, &target).await?;
            println!("rebooting into {:?}", if target.is_empty() { "<default>" } else { &target });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shell_with_trailing_command_words() {
        let cli = Cli::try_parse_from(["adbhost-cli", "-s", "ABCD", "shell", "ls", "-la"]).unwrap();
        assert_eq!(cli.serial.as_deref(), Some("ABCD"));
        assert!(matches!(cli.command, Some(Commands::Shell { .. })));
    }

    #[test]
    fn defaults_host_and_port_when_omitted() {
        let cli = Cli::try_parse_from(["adbhost-cli", "devices"]).unwrap();
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, 5037);
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["adbhost-cli", "not-a-real-command"]).is_err());
    }

    #[test]
    fn log_id_lookup_rejects_unknown_buffer_names() {
        assert!(log_id_from_buffer_name("bogus").is_none());
        assert!(log_id_from_buffer_name("main").is_some());
    }
}
