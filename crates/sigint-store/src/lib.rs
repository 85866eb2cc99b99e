//! Sigint Store - local persistence of observed devices
//!
//! Devices are queued and written by a single worker task. On shutdown the
//! worker drains whatever is still queued before it reports the flush as
//! complete, so callers can wait for durability before exiting.

pub mod backend;
pub mod error;
pub mod schema;
pub mod sqlite;
pub mod worker;

pub use backend::NodeStore;
pub use error::StoreError;
pub use sqlite::SqliteStore;
pub use worker::{LocalStore, StoreConfig};
