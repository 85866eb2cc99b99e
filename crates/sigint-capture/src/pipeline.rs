//! Capture pipeline
//!
//! Reads frames, dissects them, and hands each interesting frame to its own
//! task for station resolution and filtering. Surviving devices are offered
//! to a bounded output channel; when it is full the device is dropped rather
//! than stalling capture.

use sigint_core::{resolve_station, Device, IgnoreList};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::frame::{InterestingFrame, RawFrame};
use crate::stats::{PacketStats, DROPPED, INTERESTING, TOTAL};

/// What happened to a single frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Administratively uninteresting (beacon)
    Filtered,
    /// Matched the ignore table, or had no attributable station
    Ignored(String),
    Enqueued,
    /// Output channel full
    Dropped,
    /// Nobody is listening anymore
    Closed,
}

/// Per-frame work: resolve, filter, hand off
#[derive(Clone)]
struct FrameUnit {
    ignore: Arc<IgnoreList>,
    stats: Arc<PacketStats>,
    output: mpsc::Sender<Device>,
}

impl FrameUnit {
    async fn process(&self, frame: InterestingFrame) -> Outcome {
        if frame.is_boring() {
            return Outcome::Filtered;
        }

        let res = resolve_station(&frame.header.addresses, frame.header.control.flags);
        if res.is_ambiguous() {
            // every ACK and CTS lands here, info would drown the log
            let (da, sa) = res.candidates();
            debug!(
                da = ?da,
                sa = ?sa,
                bssid = ?res.roles.bssid,
                "IBSS: unsupported, frame has two candidate stations"
            );
        } else if res.is_bridge() {
            info!(
                da = ?res.roles.destination,
                sa = ?res.roles.source,
                ta = ?res.roles.transmitter,
                ra = ?res.roles.receiver,
                "WDS bridge somewhere, action required?"
            );
        }

        if let Some(reason) = self.ignore.ignore_reason(res.station.as_ref()) {
            debug!(mac = ?res.station, reason, "Skipping address");
            return Outcome::Ignored(reason.to_string());
        }
        let Some(station) = res.station else {
            return Outcome::Ignored(sigint_core::ignore::ABSENT.to_string());
        };

        self.stats.inc(INTERESTING).await;
        self.push(Device::new(station, frame.data_point())).await
    }

    async fn push(&self, device: Device) -> Outcome {
        match self.output.try_send(device) {
            Ok(()) => Outcome::Enqueued,
            Err(TrySendError::Full(device)) => {
                warn!(mac = %device.mac, "Device channel full, dropping device");
                self.stats.inc(DROPPED).await;
                Outcome::Dropped
            }
            Err(TrySendError::Closed(device)) => {
                debug!(mac = %device.mac, "Device channel closed");
                Outcome::Closed
            }
        }
    }
}

pub struct CapturePipeline {
    unit: FrameUnit,
    max_in_flight: usize,
}

impl CapturePipeline {
    pub fn new(
        ignore: Arc<IgnoreList>,
        stats: Arc<PacketStats>,
        output: mpsc::Sender<Device>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            unit: FrameUnit {
                ignore,
                stats,
                output,
            },
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Consume frames until the source is exhausted or `token` is cancelled.
    ///
    /// On exit the token is cancelled, in-flight frames are finished, and
    /// then the output channel is closed.
    pub async fn run(self, mut frames: mpsc::Receiver<RawFrame>, token: CancellationToken) {
        let tracker = TaskTracker::new();
        let permits = Arc::new(Semaphore::new(self.max_in_flight));

        loop {
            let raw = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!("Capture cancelled");
                    break;
                }
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => {
                        info!("Packet source closed");
                        break;
                    }
                },
            };

            self.unit.stats.inc(TOTAL).await;
            let Some(frame) = InterestingFrame::dissect(&raw) else {
                continue;
            };

            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let unit = self.unit.clone();
            tracker.spawn(async move {
                unit.process(frame).await;
                drop(permit);
            });
        }

        // stop hopping and accounting too when the source ran dry
        token.cancel();
        drop(frames);

        tracker.close();
        tracker.wait().await;
        info!("Capture pipeline done");
        // dropping the last sender closes the output channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{dot11_header, radiotap_encapsulate};
    use sigint_core::{DataPoint, DsFlags, MacAddr};

    const DATA: u8 = 0x08;
    const BEACON: u8 = 0x80;

    fn station() -> MacAddr {
        "11:22:33:44:55:66".parse().unwrap()
    }

    fn ap() -> MacAddr {
        "aa:aa:aa:aa:aa:aa".parse().unwrap()
    }

    fn raw(fc0: u8, flags: DsFlags, addrs: &[MacAddr], timestamp: u64) -> RawFrame {
        RawFrame {
            data: radiotap_encapsulate(1, 2, &dot11_header(fc0, flags, addrs)),
            timestamp,
        }
    }

    fn unit(capacity: usize) -> (FrameUnit, mpsc::Receiver<Device>) {
        let (tx, rx) = mpsc::channel(capacity);
        let unit = FrameUnit {
            ignore: Arc::new(IgnoreList::builtin()),
            stats: Arc::new(PacketStats::default()),
            output: tx,
        };
        (unit, rx)
    }

    fn interesting(frame: RawFrame) -> InterestingFrame {
        InterestingFrame::dissect(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_uplink_frame_becomes_device() {
        let (unit, mut rx) = unit(4);
        let frame = raw(DATA, DsFlags::new(false, true), &[ap(), station(), ap()], 42);

        assert_eq!(unit.process(interesting(frame)).await, Outcome::Enqueued);
        let device = rx.recv().await.unwrap();
        assert_eq!(device.mac, "11:22:33:44:55:66");
        assert_eq!(device.data_points, vec![DataPoint::new(1, 2, 42)]);
        assert_eq!(unit.stats.get(INTERESTING).await, 1);
    }

    #[tokio::test]
    async fn test_filters() {
        let (unit, _rx) = unit(4);

        let beacon = raw(BEACON, DsFlags::default(), &[MacAddr::broadcast(), ap(), ap()], 1);
        assert_eq!(unit.process(interesting(beacon)).await, Outcome::Filtered);

        let ibss = raw(DATA, DsFlags::new(false, false), &[station(), ap(), ap()], 1);
        assert_eq!(
            unit.process(interesting(ibss)).await,
            Outcome::Ignored("absent".to_string())
        );

        let broadcast = raw(DATA, DsFlags::new(true, false), &[MacAddr::broadcast(), ap(), ap()], 1);
        assert_eq!(
            unit.process(interesting(broadcast)).await,
            Outcome::Ignored("broadcast".to_string())
        );

        // bridge frames name no station even with a usable source address
        let wds = raw(DATA, DsFlags::new(true, true), &[ap(), ap(), ap(), station()], 1);
        assert_eq!(
            unit.process(interesting(wds)).await,
            Outcome::Ignored("absent".to_string())
        );

        assert_eq!(unit.stats.get(INTERESTING).await, 0);
    }

    #[tokio::test]
    async fn test_full_channel_drops_without_blocking() {
        let (unit, mut rx) = unit(2);
        let mut outcomes = Vec::new();
        for ts in 0..5 {
            let frame = raw(DATA, DsFlags::new(false, true), &[ap(), station(), ap()], ts);
            outcomes.push(unit.process(interesting(frame)).await);
        }

        assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Enqueued).count(), 2);
        assert_eq!(outcomes.iter().filter(|o| **o == Outcome::Dropped).count(), 3);
        assert_eq!(unit.stats.get(DROPPED).await, 3);
        assert_eq!(unit.stats.get(INTERESTING).await, 5);

        assert_eq!(rx.recv().await.unwrap().data_points[0].timestamp, 0);
        assert_eq!(rx.recv().await.unwrap().data_points[0].timestamp, 1);
    }

    #[tokio::test]
    async fn test_run_closes_output_after_source_exhausted() {
        let (frame_tx, frame_rx) = mpsc::channel(16);
        let (dev_tx, mut dev_rx) = mpsc::channel(16);
        let stats = Arc::new(PacketStats::default());
        let pipeline = CapturePipeline::new(Arc::new(IgnoreList::builtin()), stats.clone(), dev_tx, 4);

        for ts in 0..3 {
            frame_tx
                .send(raw(DATA, DsFlags::new(false, true), &[ap(), station(), ap()], ts))
                .await
                .unwrap();
        }
        frame_tx
            .send(raw(BEACON, DsFlags::default(), &[MacAddr::broadcast(), ap(), ap()], 9))
            .await
            .unwrap();
        frame_tx
            .send(RawFrame { data: vec![0xde, 0xad], timestamp: 10 })
            .await
            .unwrap();
        drop(frame_tx);

        let token = CancellationToken::new();
        pipeline.run(frame_rx, token.clone()).await;
        assert!(token.is_cancelled());

        let mut timestamps = Vec::new();
        while let Some(device) = dev_rx.recv().await {
            timestamps.push(device.data_points[0].timestamp);
        }
        timestamps.sort();
        assert_eq!(timestamps, vec![0, 1, 2]);
        assert_eq!(stats.get(TOTAL).await, 5);
        assert_eq!(stats.get(INTERESTING).await, 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let (_frame_tx, frame_rx) = mpsc::channel::<RawFrame>(16);
        let (dev_tx, mut dev_rx) = mpsc::channel(16);
        let pipeline = CapturePipeline::new(
            Arc::new(IgnoreList::builtin()),
            Arc::new(PacketStats::default()),
            dev_tx,
            4,
        );
        let token = CancellationToken::new();
        token.cancel();
        pipeline.run(frame_rx, token).await;
        assert!(dev_rx.recv().await.is_none());
    }
}
