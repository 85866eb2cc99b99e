//! Sigint Capture - passive 802.11 collection
//!
//! This crate turns a live (or replayed) radiotap capture into a stream of
//! [`sigint_core::Device`] observations:
//! - Frame dissection (radiotap + 802.11 MAC header)
//! - Capture pipeline with per-frame resolution and a lossy output channel
//! - Channel hopping across the 2.4 GHz band
//! - Packet accounting, logged periodically
//! - Lifecycle coordination of the above under one cancellation token

pub mod collector;
pub mod error;
pub mod frame;
pub mod hop;
pub mod iface;
pub mod pipeline;
pub mod radio;
pub mod source;
pub mod stats;

pub use collector::{CaptureConfig, Collector, Session};
pub use error::CaptureError;
pub use frame::{InterestingFrame, RawFrame};
pub use hop::ChannelHopper;
pub use pipeline::CapturePipeline;
pub use radio::{ChannelControl, RadioError, WirelessExtensions};
pub use source::{FrameSource, PcapSource};
pub use stats::PacketStats;
