//! Storage error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Device has no hardware address")]
    EmptyAddress,
    #[error("Persistence queue is closed")]
    QueueClosed,
    #[error("Persistence worker exited before flushing")]
    WorkerGone,
    #[error("Not supported: {0}")]
    Unsupported(&'static str),
}
