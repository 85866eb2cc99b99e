//! Collection lifecycle
//!
//! Starts channel hopping, the capture pipeline and accounting under one
//! cancellation token and hands back the device channel.

use sigint_core::{Device, IgnoreList};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CaptureError;
use crate::hop::{ChannelHopper, DEFAULT_HOP_INTERVAL};
use crate::pipeline::CapturePipeline;
use crate::radio::{ChannelControl, WirelessExtensions};
use crate::source::FrameSource;
use crate::stats::{log_accounting, PacketStats};

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Interface to capture on and hop
    pub interface: String,
    /// Bytes captured per frame
    pub snaplen: i32,
    pub promiscuous: bool,
    /// Capacity of the output device channel
    pub device_channel_capacity: usize,
    /// Capacity of the raw frame channel between source and pipeline
    pub frame_channel_capacity: usize,
    /// Maximum concurrently processed frames
    pub max_in_flight: usize,
    /// How often packet stats are logged
    pub accounting_interval: Duration,
    /// Dwell time per channel
    pub hop_interval: Duration,
    pub hop_enabled: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: String::new(),
            snaplen: 1600,
            promiscuous: true,
            device_channel_capacity: 0x1000,
            frame_channel_capacity: 0x400,
            max_in_flight: 256,
            accounting_interval: Duration::from_secs(60),
            hop_interval: DEFAULT_HOP_INTERVAL,
            hop_enabled: true,
        }
    }
}

pub struct Collector {
    config: CaptureConfig,
    ignore: Arc<IgnoreList>,
    stats: Arc<PacketStats>,
    control: Arc<dyn ChannelControl>,
}

impl Collector {
    pub fn new(config: CaptureConfig, ignore: IgnoreList) -> Self {
        Self {
            config,
            ignore: Arc::new(ignore),
            stats: Arc::new(PacketStats::default()),
            control: Arc::new(WirelessExtensions),
        }
    }

    /// Use a different radio backend for hopping
    pub fn with_channel_control(mut self, control: Arc<dyn ChannelControl>) -> Self {
        self.control = control;
        self
    }

    pub fn stats(&self) -> Arc<PacketStats> {
        self.stats.clone()
    }

    /// Start collecting, channel hopping and accounting.
    ///
    /// The returned channel closes once the session has ended and every
    /// in-flight frame has been handled.
    pub fn start(
        self,
        source: impl FrameSource,
        parent: &CancellationToken,
    ) -> (mpsc::Receiver<Device>, Session) {
        let token = parent.child_token();
        let (tx, rx) = mpsc::channel(self.config.device_channel_capacity.max(1));
        let mut tasks = Vec::new();

        if self.config.hop_enabled {
            let hopper = ChannelHopper::new(
                self.control.clone(),
                self.config.interface.clone(),
                self.config.hop_interval,
            );
            tasks.push(tokio::spawn(hopper.run(token.clone())));
        }

        let frames = source.into_frames(self.config.frame_channel_capacity.max(1), token.clone());
        let pipeline = CapturePipeline::new(self.ignore, self.stats.clone(), tx, self.config.max_in_flight);
        tasks.push(tokio::spawn(pipeline.run(frames, token.clone())));

        let accounting = log_accounting(self.stats, self.config.accounting_interval, token.clone());
        tasks.push(tokio::spawn(async move {
            accounting.await;
        }));

        info!(
            iface = %self.config.interface,
            hopping = self.config.hop_enabled,
            "Collection started"
        );
        (rx, Session { token, tasks })
    }
}

/// Handle on a running collection
pub struct Session {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for hopping, capture and accounting to finish
    pub async fn join(self) -> Result<(), CaptureError> {
        for task in self.tasks {
            task.await?;
        }
        Ok(())
    }
}
