//! `DeviceData`/`DeviceState` and the `host:devices`/`host:devices-l`
//! line parser.
//!
//! Grounded on `examples/p47t-rust-52-projects/adb-client/src/device.rs`
//! (same `parse`/`Display` shape for the state enum and a whitespace-
//! tolerant line parser), extended to the full state inventory spec.md
//! §3 names and to the long (`-l`) `key:value` tail format.

use std::collections::BTreeSet;
use std::fmt;

/// Connection state of an attached device, as reported by the adb server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Online,
    Offline,
    Bootloader,
    Recovery,
    Unauthorized,
    Authorizing,
    Sideload,
    Host,
    NoPermissions,
    Unknown(String),
}

impl DeviceState {
    pub fn parse(s: &str) -> Self {
        match s {
            "device" => DeviceState::Online,
            "offline" => DeviceState::Offline,
            "bootloader" => DeviceState::Bootloader,
            "recovery" => DeviceState::Recovery,
            "unauthorized" => DeviceState::Unauthorized,
            "authorizing" => DeviceState::Authorizing,
            "sideload" => DeviceState::Sideload,
            "host" => DeviceState::Host,
            "no permissions" | "no permission" => DeviceState::NoPermissions,
            other => DeviceState::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::Online => write!(f, "device"),
            DeviceState::Offline => write!(f, "offline"),
            DeviceState::Bootloader => write!(f, "bootloader"),
            DeviceState::Recovery => write!(f, "recovery"),
            DeviceState::Unauthorized => write!(f, "unauthorized"),
            DeviceState::Authorizing => write!(f, "authorizing"),
            DeviceState::Sideload => write!(f, "sideload"),
            DeviceState::Host => write!(f, "host"),
            DeviceState::NoPermissions => write!(f, "no permissions"),
            DeviceState::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Information about one attached device, as returned by `GetDevices`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceData {
    pub serial: String,
    pub state: DeviceState,
    pub product: Option<String>,
    pub model: Option<String>,
    pub device: Option<String>,
    pub features: BTreeSet<String>,
    pub transport_id: Option<u64>,
}

impl DeviceData {
    fn new(serial: String, state: DeviceState) -> Self {
        DeviceData {
            serial,
            state,
            product: None,
            model: None,
            device: None,
            features: BTreeSet::new(),
            transport_id: None,
        }
    }

    /// Parses one line of `host:devices`/`host:devices-l` output.
    ///
    /// Short format: `<serial>\t<state>`.
    /// Long format: `<serial>  <state> product:<p> model:<m> device:<d>
    /// features:<f1,f2,...> transport_id:<n>`.
    ///
    /// Returns `None` for blank lines or lines with no recognisable serial.
    pub fn parse_line(line: &str) -> Option<DeviceData> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut fields = line.split_whitespace();
        let serial = fields.next()?.to_string();
        let state_str = fields.next()?;
        let mut data = DeviceData::new(serial, DeviceState::parse(state_str));

        for field in fields {
            if let Some((key, value)) = field.split_once(':') {
                match key {
                    "product" => data.product = Some(value.to_string()),
                    "model" => data.model = Some(value.to_string()),
                    "device" => data.device = Some(value.to_string()),
                    "features" => {
                        data.features = value
                            .split(',')
                            .filter(|f| !f.is_empty())
                            .map(|f| f.to_string())
                            .collect();
                    }
                    "transport_id" => data.transport_id = value.parse().ok(),
                    _ => {}
                }
            }
        }

        Some(data)
    }

    /// Splits `host:devices`/`host:devices-l` response text into
    /// individual [`DeviceData`] entries, tolerating both `\r\n` and `\n`
    /// line endings and ignoring blank lines.
    pub fn parse_list(text: &str) -> Vec<DeviceData> {
        text.split(['\n', '\r'])
            .filter_map(DeviceData::parse_line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_format_line() {
        let devices = DeviceData::parse_list("0123456789ABCDEF\tdevice\r\n");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "0123456789ABCDEF");
        assert_eq!(devices[0].state, DeviceState::Online);
    }

    #[test]
    fn parses_long_format_line_with_all_fields() {
        let line = "0123456789ABCDEF          device product:walleye model:Pixel_2 device:walleye features:cmd,shell_v2 transport_id:3";
        let data = DeviceData::parse_line(line).unwrap();
        assert_eq!(data.serial, "0123456789ABCDEF");
        assert_eq!(data.state, DeviceState::Online);
        assert_eq!(data.product.as_deref(), Some("walleye"));
        assert_eq!(data.model.as_deref(), Some("Pixel_2"));
        assert_eq!(data.device.as_deref(), Some("walleye"));
        assert!(data.features.contains("cmd"));
        assert!(data.features.contains("shell_v2"));
        assert_eq!(data.transport_id, Some(3));
    }

    #[test]
    fn unknown_state_token_maps_to_unknown() {
        let data = DeviceData::parse_line("serial\tstrange-state").unwrap();
        assert_eq!(data.state, DeviceState::Unknown("strange-state".into()));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let devices = DeviceData::parse_list("\n0123456789ABCDEF\tdevice\n\n");
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn parse_list_is_whitespace_tolerant_across_both_formats() {
        let text = "one\tdevice\r\ntwo          offline product:p model:m device:d features:a,b transport_id:7\r\n";
        let devices = DeviceData::parse_list(text);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "one");
        assert_eq!(devices[1].serial, "two");
        assert_eq!(devices[1].transport_id, Some(7));
    }

    #[test]
    fn every_device_data_produced_has_non_empty_serial() {
        // §8 Invariant 3.
        for line in ["a\tdevice", "b\toffline", "c\tsideload"] {
            let data = DeviceData::parse_line(line).unwrap();
            assert!(!data.serial.is_empty());
        }
    }
}
