//! Capture error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Capture error: {0}")]
    Pcap(#[from] pcap::Error),
    #[error("Failed to list interfaces: {0}")]
    Interfaces(String),
    #[error("No wireless interface found")]
    NoInterface,
    #[error("Capture task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
