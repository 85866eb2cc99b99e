//! Packet accounting
//!
//! Named counters, fixed at construction and incremented by the pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Every frame read from the source
pub const TOTAL: &str = "total";
/// Frames that survived the beacon and ignore filters
pub const INTERESTING: &str = "interesting";
/// Devices dropped because the output channel was full
pub const DROPPED: &str = "dropped";

#[derive(Debug)]
pub struct PacketStats {
    stats: RwLock<BTreeMap<&'static str, u64>>,
}

impl PacketStats {
    pub fn new(keys: &[&'static str]) -> Self {
        Self {
            stats: RwLock::new(keys.iter().map(|k| (*k, 0)).collect()),
        }
    }

    pub async fn inc(&self, which: &'static str) {
        let mut stats = self.stats.write().await;
        match stats.get_mut(which) {
            Some(count) => *count += 1,
            None => warn!(counter = which, "Unknown counter"),
        }
    }

    pub async fn get(&self, which: &str) -> u64 {
        self.stats.read().await.get(which).copied().unwrap_or(0)
    }

    pub async fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.stats.read().await.clone()
    }

    pub async fn log(&self) {
        let stats = self.stats.read().await;
        info!("PacketStats{:?}", *stats);
    }
}

impl Default for PacketStats {
    fn default() -> Self {
        Self::new(&[TOTAL, INTERESTING, DROPPED])
    }
}

/// Log the counters every `every` and once more when cancelled. Returns the
/// number of snapshots logged.
pub async fn log_accounting(stats: Arc<PacketStats>, every: Duration, token: CancellationToken) -> u64 {
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reports = 0;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                stats.log().await;
                reports += 1;
            }
            _ = token.cancelled() => {
                stats.log().await;
                return reports + 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters() {
        let stats = PacketStats::default();
        stats.inc(TOTAL).await;
        stats.inc(TOTAL).await;
        stats.inc(INTERESTING).await;
        stats.inc("unknown").await;

        assert_eq!(stats.get(TOTAL).await, 2);
        assert_eq!(stats.get(INTERESTING).await, 1);
        assert_eq!(stats.get(DROPPED).await, 0);

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        assert!(!snapshot.contains_key("unknown"));
    }

    #[tokio::test]
    async fn test_concurrent_increments() {
        let stats = Arc::new(PacketStats::default());
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..50 {
            let stats = stats.clone();
            tasks.spawn(async move { stats.inc(TOTAL).await });
        }
        while tasks.join_next().await.is_some() {}
        assert_eq!(stats.get(TOTAL).await, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accounting_logs_again_on_cancel() {
        let token = CancellationToken::new();
        let task = tokio::spawn(log_accounting(
            Arc::new(PacketStats::default()),
            Duration::from_secs(60),
            token.clone(),
        ));
        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();
        // ticks at 60s and 120s, plus the final snapshot
        assert_eq!(task.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accounting_cancelled_before_first_tick() {
        let token = CancellationToken::new();
        token.cancel();
        let reports = log_accounting(Arc::new(PacketStats::default()), Duration::from_secs(60), token).await;
        assert_eq!(reports, 1);
    }
}
