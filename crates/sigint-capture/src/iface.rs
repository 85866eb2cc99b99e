//! Best-guess selection of the wireless interface

use network_interface::{NetworkInterface, NetworkInterfaceConfig};
use tracing::debug;

use crate::error::CaptureError;

/// Name prefixes, most likely first
pub const IFACE_GUESSES: &[&str] = &["wlan", "wlp", "wlx", "w"];

/// Pick the first name matching the most likely prefix
pub fn guess_from_names<'a>(names: &[&'a str]) -> Option<&'a str> {
    IFACE_GUESSES
        .iter()
        .find_map(|guess| names.iter().find(|name| name.starts_with(guess)).copied())
}

/// Guess the wireless interface from the interfaces present on this host
pub fn best_guess_wifi_iface() -> Result<String, CaptureError> {
    let interfaces = NetworkInterface::show().map_err(|e| CaptureError::Interfaces(e.to_string()))?;
    let names: Vec<&str> = interfaces.iter().map(|i| i.name.as_str()).collect();
    debug!(interfaces = ?names, "Guessing wireless interface");
    guess_from_names(&names)
        .map(str::to_string)
        .ok_or(CaptureError::NoInterface)
}
