//! Collect loop: capture into local storage until the session ends

use anyhow::{Context, Result};
use sigint_capture::{Collector, FrameSource};
use sigint_store::{LocalStore, SqliteStore, StoreConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run a collection session against `source`, persisting every device.
///
/// Returns once the session has ended (source exhausted or `root`
/// cancelled) and the store has flushed everything it accepted.
pub async fn collect(
    collector: Collector,
    source: impl FrameSource,
    store_config: &StoreConfig,
    root: &CancellationToken,
) -> Result<()> {
    // the store outlives capture so the last devices can still be queued
    let store_token = CancellationToken::new();
    let store = LocalStore::open(store_config, store_token.clone())
        .await
        .with_context(|| format!("Failed to open storage at {}", store_config.path.display()))?;

    let stats = collector.stats();
    let (mut devices, session) = collector.start(source, root);

    let mut forwarded = 0u64;
    while let Some(device) = devices.recv().await {
        match store.new_devices(vec![device]).await {
            Ok(_) => forwarded += 1,
            Err(e) => {
                warn!(error = %e, "Storage rejected device, stopping capture");
                session.cancel();
                break;
            }
        }
    }
    drop(devices);

    session.join().await?;
    info!(forwarded, "Capture finished, flushing storage");

    store_token.cancel();
    store.wait().await?;

    let db = SqliteStore::open(&store_config.path).await?;
    info!(
        nodes = db.node_count().await?,
        observations = db.observation_count().await?,
        stats = ?stats.snapshot().await,
        "Session summary"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigint_capture::frame::{dot11_header, radiotap_encapsulate};
    use sigint_capture::{CaptureConfig, RawFrame};
    use sigint_core::{DsFlags, IgnoreList, MacAddr};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    fn uplink(station: MacAddr, ts: u64) -> RawFrame {
        let ap = MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff);
        RawFrame {
            data: radiotap_encapsulate(-60, 2437, &dot11_header(0x08, DsFlags::new(false, true), &[ap, station, ap])),
            timestamp: ts,
        }
    }

    fn collector() -> Collector {
        let config = CaptureConfig {
            interface: "test0".to_string(),
            hop_enabled: false,
            ..Default::default()
        };
        Collector::new(config, IgnoreList::builtin())
    }

    #[tokio::test]
    async fn test_collect_until_source_exhausted() {
        let dir = TempDir::new().unwrap();
        let store_config = StoreConfig {
            path: dir.path().join("collect.db"),
            ..Default::default()
        };

        let (tx, rx) = mpsc::channel(16);
        for i in 0..4u8 {
            tx.send(uplink(MacAddr::new(2, 0, 0, 0, 0, i % 2), u64::from(i))).await.unwrap();
        }
        // broadcast source address never becomes a node
        tx.send(uplink(MacAddr::broadcast(), 9)).await.unwrap();
        drop(tx);

        let root = CancellationToken::new();
        collect(collector(), rx, &store_config, &root).await.unwrap();

        let db = SqliteStore::open(&store_config.path).await.unwrap();
        assert_eq!(db.node_count().await.unwrap(), 2);
        assert_eq!(db.observation_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_collect_stops_on_cancel() {
        let dir = TempDir::new().unwrap();
        let store_config = StoreConfig {
            path: dir.path().join("collect.db"),
            ..Default::default()
        };

        let (tx, rx) = mpsc::channel(16);
        tx.send(uplink(MacAddr::new(2, 0, 0, 0, 0, 1), 1)).await.unwrap();

        let root = CancellationToken::new();
        let cancel = root.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel.cancel();
        });

        collect(collector(), rx, &store_config, &root).await.unwrap();
        drop(tx);

        let db = SqliteStore::open(&store_config.path).await.unwrap();
        assert_eq!(db.node_count().await.unwrap(), 1);
    }
}
