//! Persistence worker
//!
//! A single task owns the storage handle and writes queued devices one at a
//! time. When its token is cancelled it stops waiting for new work, stores
//! everything still queued, closes the handle and signals the flush as done.
//! Call [`LocalStore::wait`] before exiting to make sure data is persisted.

use sigint_core::{Ack, Device, HumanMapping};
use std::path::PathBuf;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::NodeStore;
use crate::error::StoreError;
use crate::sqlite::SqliteStore;

/// Local storage configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    pub path: PathBuf,
    /// Capacity of the persistence queue
    pub queue_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sigint-wifi-devices.db"),
            queue_capacity: 0x100,
        }
    }
}

/// Write one device. Observation failures are logged and do not stop the
/// remaining observations. Returns the number of rows added.
pub async fn store_device<S: NodeStore>(store: &mut S, device: &Device) -> Result<usize, StoreError> {
    if !device.has_address() {
        return Err(StoreError::EmptyAddress);
    }
    let node_id = store.find_or_create_node(&device.mac).await?;

    let mut inserted = 0;
    for dp in &device.data_points {
        match store.insert_data_point(node_id, dp).await {
            Ok(true) => inserted += 1,
            Ok(false) => debug!(mac = %device.mac, time = %dp.captured_at(), "Duplicate data point"),
            Err(e) => warn!(mac = %device.mac, time = %dp.captured_at(), error = %e, "Insert data point failed"),
        }
    }
    Ok(inserted)
}

struct Worker<S> {
    store: S,
    queue: mpsc::Receiver<Device>,
    flushed: watch::Sender<bool>,
}

impl<S: NodeStore> Worker<S> {
    async fn run(mut self, token: CancellationToken) {
        loop {
            tokio::select! {
                device = self.queue.recv() => match device {
                    Some(device) => self.store(&device).await,
                    None => {
                        debug!("Persistence queue closed");
                        break;
                    }
                },
                _ = token.cancelled() => break,
            }
        }
        self.shutdown().await;
    }

    async fn store(&mut self, device: &Device) {
        debug!(mac = %device.mac, "store");
        if let Err(e) = store_device(&mut self.store, device).await {
            warn!(device = %device, error = %e, "Failed to store, data is lost now");
        }
    }

    async fn shutdown(mut self) {
        let mut drained = 0;
        while let Ok(device) = self.queue.try_recv() {
            self.store(&device).await;
            drained += 1;
        }
        info!(drained, "Closing db");
        self.store.close().await;
        let _ = self.flushed.send(true);
    }
}

/// Queue-fronted local storage
pub struct LocalStore {
    push: mpsc::Sender<Device>,
    flushed: watch::Receiver<bool>,
}

impl LocalStore {
    /// Open the SQLite database and start the worker. The worker shuts down
    /// when `token` is cancelled.
    pub async fn open(config: &StoreConfig, token: CancellationToken) -> Result<Self, StoreError> {
        let store = SqliteStore::open(&config.path).await?;
        Ok(Self::spawn(store, config.queue_capacity, token))
    }

    /// Start a worker over any backend
    pub fn spawn<S: NodeStore>(store: S, queue_capacity: usize, token: CancellationToken) -> Self {
        let (push, queue) = mpsc::channel(queue_capacity.max(1));
        let (flushed_tx, flushed) = watch::channel(false);
        let worker = Worker {
            store,
            queue,
            flushed: flushed_tx,
        };
        tokio::spawn(worker.run(token));
        Self { push, flushed }
    }

    /// Queue devices for persistence. Waits for queue space.
    pub async fn new_devices(&self, devices: Vec<Device>) -> Result<Ack, StoreError> {
        let ack = Ack::for_devices(&devices);
        for device in devices {
            self.push.send(device).await.map_err(|_| StoreError::QueueClosed)?;
        }
        Ok(ack)
    }

    /// Associating humans with devices is not supported yet
    pub async fn new_mapping(&self, _mapping: &HumanMapping) -> Result<Ack, StoreError> {
        Err(StoreError::Unsupported("human to device mapping"))
    }

    /// Wait until the worker has drained its queue and closed the database
    pub async fn wait(&self) -> Result<(), StoreError> {
        let mut flushed = self.flushed.clone();
        flushed
            .wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| StoreError::WorkerGone)
    }
}
