//! Link-layer dissection of captured frames
//!
//! Frames arrive as radiotap + 802.11. The radiotap header carries the
//! signal and channel frequency, the 802.11 MAC header carries the frame
//! type, the DS flags and up to four addresses. Anything that does not parse
//! is noise on a shared channel and is dropped without complaint.

use radiotap::Radiotap;
use sigint_core::{DataPoint, DsFlags, HeaderAddresses, MacAddr};

/// 802.11 frame types (frame control bits 2-3)
pub const TYPE_MGMT: u8 = 0;
pub const TYPE_CTRL: u8 = 1;
pub const TYPE_DATA: u8 = 2;

/// Management subtype for beacons
pub const SUBTYPE_BEACON: u8 = 8;

/// Control subtypes that carry a transmitter address (addr2)
const CTRL_WITH_TA: &[u8] = &[4, 5, 8, 9, 10, 11, 14, 15];

/// Frame control + duration + addr1
const MIN_HEADER_LEN: usize = 10;
/// Management and data header up to and including the sequence control
const FULL_HEADER_LEN: usize = 24;

/// A frame as delivered by the capture source
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Vec<u8>,
    /// Capture time in nanoseconds since the unix epoch
    pub timestamp: u64,
}

/// Decoded frame control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub frame_type: u8,
    pub subtype: u8,
    pub flags: DsFlags,
}

impl FrameControl {
    pub fn parse(fc: [u8; 2]) -> Option<Self> {
        // protocol version is always 0
        if fc[0] & 0x03 != 0 {
            return None;
        }
        let frame_type = (fc[0] >> 2) & 0x03;
        if frame_type > TYPE_DATA {
            return None;
        }
        Some(Self {
            frame_type,
            subtype: fc[0] >> 4,
            flags: DsFlags::new(fc[1] & 0x02 != 0, fc[1] & 0x01 != 0),
        })
    }

    pub fn is_beacon(&self) -> bool {
        self.frame_type == TYPE_MGMT && self.subtype == SUBTYPE_BEACON
    }
}

/// The parts of the 802.11 MAC header we interpret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dot11Header {
    pub control: FrameControl,
    pub addresses: HeaderAddresses,
}

fn addr_at(frame: &[u8], offset: usize) -> Option<MacAddr> {
    let octets: [u8; 6] = frame.get(offset..offset + 6)?.try_into().ok()?;
    Some(MacAddr::from(octets))
}

impl Dot11Header {
    /// Parse the MAC header of a raw 802.11 frame.
    ///
    /// Address fields the frame type does not carry are left `None`.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() < MIN_HEADER_LEN {
            return None;
        }
        let control = FrameControl::parse([frame[0], frame[1]])?;
        let mut addresses = HeaderAddresses {
            addr1: addr_at(frame, 4),
            ..Default::default()
        };

        match control.frame_type {
            TYPE_CTRL => {
                if CTRL_WITH_TA.contains(&control.subtype) {
                    addresses.addr2 = addr_at(frame, 10);
                }
            }
            _ => {
                if frame.len() < FULL_HEADER_LEN {
                    return None;
                }
                addresses.addr2 = addr_at(frame, 10);
                addresses.addr3 = addr_at(frame, 16);
                if control.frame_type == TYPE_DATA && control.flags.from_ds && control.flags.to_ds {
                    addresses.addr4 = addr_at(frame, 24);
                }
            }
        }

        Some(Self { control, addresses })
    }
}

/// Signal and channel as reported by the radio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RadioInfo {
    /// Antenna signal (dBm), 0 if not reported
    pub signal: i32,
    /// Channel center frequency (MHz), 0 if not reported
    pub frequency: u32,
}

/// A frame that carries everything needed to attribute it to a device
#[derive(Debug, Clone, Copy)]
pub struct InterestingFrame {
    pub radio: RadioInfo,
    pub header: Dot11Header,
    pub timestamp: u64,
}

impl InterestingFrame {
    /// Dissect a radiotap-encapsulated 802.11 frame.
    ///
    /// Returns `None` for frames without a radiotap or 802.11 header.
    pub fn dissect(raw: &RawFrame) -> Option<Self> {
        let (radiotap, rest) = Radiotap::parse(&raw.data).ok()?;
        let header = Dot11Header::parse(rest)?;
        let radio = RadioInfo {
            signal: radiotap
                .antenna_signal
                .map(|s| i32::from(s.value))
                .unwrap_or_default(),
            frequency: radiotap
                .channel
                .map(|c| u32::from(c.freq))
                .unwrap_or_default(),
        };
        Some(Self {
            radio,
            header,
            timestamp: raw.timestamp,
        })
    }

    /// Beacons are access point chatter, not stations
    pub fn is_boring(&self) -> bool {
        self.header.control.is_beacon()
    }

    pub fn data_point(&self) -> DataPoint {
        DataPoint::new(self.radio.signal, self.radio.frequency, self.timestamp)
    }
}

/// Build a minimal radiotap header (channel + antenna signal) in front of an
/// 802.11 frame. Used to replay synthetic traffic.
pub fn radiotap_encapsulate(signal: i8, frequency: u16, dot11: &[u8]) -> Vec<u8> {
    // present: bit 3 (channel), bit 5 (antenna signal)
    let present: u32 = (1 << 3) | (1 << 5);
    let len: u16 = 13;
    let mut out = Vec::with_capacity(len as usize + dot11.len());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&present.to_le_bytes());
    out.extend_from_slice(&frequency.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.push(signal as u8);
    out.extend_from_slice(dot11);
    out
}

/// Build a 24 (or 30, for WDS) byte 802.11 header
pub fn dot11_header(fc0: u8, flags: DsFlags, addrs: &[MacAddr]) -> Vec<u8> {
    let mut fc1 = 0u8;
    if flags.to_ds {
        fc1 |= 0x01;
    }
    if flags.from_ds {
        fc1 |= 0x02;
    }
    let mut out = vec![fc0, fc1, 0, 0];
    for (i, addr) in addrs.iter().enumerate() {
        if i == 3 {
            // sequence control precedes addr4
            out.extend_from_slice(&[0, 0]);
        }
        out.extend_from_slice(&addr.octets());
    }
    if addrs.len() < 4 {
        out.extend_from_slice(&[0, 0]);
    }
    out
}
