//! Frame sources
//!
//! A source turns into a channel of [`RawFrame`]s. The channel closing means
//! the source is exhausted.

use chrono::DateTime;
use pcap::{Activated, Capture, Linktype};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::CaptureError;
use crate::frame::RawFrame;

/// Read timeout for live captures, bounds how long cancellation takes to
/// reach the capture thread
const READ_TIMEOUT_MS: i32 = 500;

/// Nanoseconds since the unix epoch for a pcap `timeval`. Out of range
/// times map to 0.
pub fn capture_timestamp(secs: i64, micros: i64) -> u64 {
    let nanos = u32::try_from(micros.clamp(0, 999_999)).unwrap_or_default() * 1_000;
    DateTime::from_timestamp(secs, nanos)
        .and_then(|t| t.timestamp_nanos_opt())
        .map_or(0, |n| n.max(0) as u64)
}

pub trait FrameSource: Send + 'static {
    /// Start producing frames until exhausted or `token` is cancelled
    fn into_frames(self, capacity: usize, token: CancellationToken) -> mpsc::Receiver<RawFrame>;
}

/// Frames fed by another task
impl FrameSource for mpsc::Receiver<RawFrame> {
    fn into_frames(self, _capacity: usize, _token: CancellationToken) -> mpsc::Receiver<RawFrame> {
        self
    }
}

/// A libpcap handle, live or replaying a capture file
pub struct PcapSource {
    capture: Capture<dyn Activated>,
}

impl PcapSource {
    /// Open a live capture on a monitor-mode interface
    pub fn open_live(iface: &str, snaplen: i32, promiscuous: bool) -> Result<Self, CaptureError> {
        let capture = Capture::from_device(iface)?
            .promisc(promiscuous)
            .snaplen(snaplen)
            .timeout(READ_TIMEOUT_MS)
            .open()?;
        info!(iface, snaplen, promiscuous, "Opened live capture");
        Ok(Self::new(capture.into()))
    }

    /// Replay a capture file
    pub fn open_file(path: &Path) -> Result<Self, CaptureError> {
        let capture = Capture::from_file(path)?;
        info!(path = %path.display(), "Opened capture file");
        Ok(Self::new(capture.into()))
    }

    fn new(capture: Capture<dyn Activated>) -> Self {
        let linktype = capture.get_datalink();
        if linktype != Linktype::IEEE802_11_RADIOTAP {
            warn!(
                linktype = ?linktype,
                "Capture is not radiotap encapsulated, no frames will be attributable"
            );
        }
        Self { capture }
    }
}

impl FrameSource for PcapSource {
    fn into_frames(self, capacity: usize, token: CancellationToken) -> mpsc::Receiver<RawFrame> {
        let (tx, rx) = mpsc::channel(capacity);
        let mut capture = self.capture;

        tokio::task::spawn_blocking(move || {
            while !token.is_cancelled() {
                match capture.next_packet() {
                    Ok(packet) => {
                        let ts = packet.header.ts;
                        let frame = RawFrame {
                            data: packet.data.to_vec(),
                            timestamp: capture_timestamp(ts.tv_sec as i64, ts.tv_usec as i64),
                        };
                        if tx.blocking_send(frame).is_err() {
                            break;
                        }
                    }
                    Err(pcap::Error::TimeoutExpired) => continue,
                    Err(pcap::Error::NoMorePackets) => {
                        info!("Packet source exhausted");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "Capture failed");
                        break;
                    }
                }
            }
        });

        rx
    }
}
