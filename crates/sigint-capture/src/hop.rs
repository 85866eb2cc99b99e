//! Channel hopping across the 2.4 GHz band

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::radio::ChannelControl;

/// WiFi channels to cycle through
pub const WIFI_CHANNELS: &[u8] = &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13];

/// Default dwell time per channel
pub const DEFAULT_HOP_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one radio through [`WIFI_CHANNELS`] on a fixed interval
pub struct ChannelHopper {
    control: Arc<dyn ChannelControl>,
    iface: String,
    interval: Duration,
}

impl ChannelHopper {
    pub fn new(control: Arc<dyn ChannelControl>, iface: impl Into<String>, interval: Duration) -> Self {
        Self {
            control,
            iface: iface.into(),
            interval,
        }
    }

    /// Hop until cancelled. A failed hop is logged and the next tick moves on
    /// to the next channel.
    pub async fn run(self, token: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut idx = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let channel = WIFI_CHANNELS[idx];
                    debug!(iface = %self.iface, channel, "Hopping");
                    if let Err(e) = self.control.set_channel(&self.iface, channel) {
                        warn!(iface = %self.iface, channel, error = %e, "Channel hop failed");
                    }
                    idx = (idx + 1) % WIFI_CHANNELS.len();
                }
                _ = token.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radio::RadioError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        channels: Mutex<Vec<u8>>,
    }

    impl ChannelControl for Recorder {
        fn set_channel(&self, iface: &str, channel: u8) -> Result<(), RadioError> {
            assert_eq!(iface, "wlan0");
            self.channels.lock().unwrap().push(channel);
            if channel == 3 {
                return Err(RadioError::InvalidChannel(channel));
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hops_and_wraps() {
        let recorder = Arc::new(Recorder::default());
        let token = CancellationToken::new();
        let hopper = ChannelHopper::new(recorder.clone(), "wlan0", Duration::from_secs(1));
        let task = tokio::spawn(hopper.run(token.clone()));

        tokio::time::sleep(Duration::from_millis(15_500)).await;
        token.cancel();
        task.await.unwrap();

        let channels = recorder.channels.lock().unwrap().clone();
        assert!(channels.len() >= 14, "{:?}", channels);
        // a failed hop on channel 3 does not stop the cycle
        assert_eq!(&channels[..13], WIFI_CHANNELS);
        assert_eq!(channels[13], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_tick() {
        let recorder = Arc::new(Recorder::default());
        let token = CancellationToken::new();
        token.cancel();
        ChannelHopper::new(recorder.clone(), "wlan0", Duration::from_secs(1))
            .run(token)
            .await;
        assert!(recorder.channels.lock().unwrap().is_empty());
    }
}
