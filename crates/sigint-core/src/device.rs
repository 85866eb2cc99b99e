//! Device and observation types passed from capture to storage

use chrono::{DateTime, Utc};
use pnet::util::MacAddr;
use serde::{Deserialize, Serialize};

/// Geolocation of the collector when an observation was made.
///
/// Both coordinates zero means the location is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f32,
    pub lon: f32,
}

/// A single observation of a transmitting radio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Antenna signal (dBm)
    pub signal: i32,
    /// Center frequency (MHz)
    pub frequency: u32,
    /// Capture time in nanoseconds since the unix epoch
    pub timestamp: u64,
    /// Collector location, zero if unknown
    #[serde(default)]
    pub location: Coordinates,
}

impl DataPoint {
    pub fn new(signal: i32, frequency: u32, timestamp: u64) -> Self {
        Self {
            signal,
            frequency,
            timestamp,
            location: Coordinates::default(),
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp as i64)
    }
}

/// A physical radio, identified by its hardware address, and everything
/// observed from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Canonical colon-hex hardware address
    pub mac: String,
    /// Observations in arrival order
    pub data_points: Vec<DataPoint>,
}

impl Device {
    pub fn new(addr: MacAddr, data_point: DataPoint) -> Self {
        Self {
            mac: addr.to_string(),
            data_points: vec![data_point],
        }
    }

    pub fn push(&mut self, data_point: DataPoint) {
        self.data_points.push(data_point);
    }

    /// Devices without an address must never reach storage
    pub fn has_address(&self) -> bool {
        !self.mac.is_empty()
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} data points)", self.mac, self.data_points.len())
    }
}

/// Acknowledgement for a batch accepted into the persistence queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub devices: usize,
    pub data_points: usize,
}

impl Ack {
    pub fn for_devices(devices: &[Device]) -> Self {
        Self {
            devices: devices.len(),
            data_points: devices.iter().map(|d| d.data_points.len()).sum(),
        }
    }
}

/// Association of a human operator with the radios they carry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanMapping {
    pub name: String,
    pub devices: Vec<String>,
}
