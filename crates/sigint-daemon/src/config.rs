//! Configuration loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sigint_capture::CaptureConfig;
use sigint_core::{IgnoreList, IgnoreRule};
use sigint_store::StoreConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub session: SessionSection,
    /// Extra addresses to ignore, checked after the builtin table
    #[serde(default)]
    pub ignore: Vec<IgnoreRuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSection {
    /// Monitor-mode interface; guessed when empty
    #[serde(default)]
    pub interface: String,
    #[serde(default = "default_snaplen")]
    pub snaplen: i32,
    #[serde(default = "default_true")]
    pub promiscuous: bool,
    #[serde(default = "default_device_channel_capacity")]
    pub device_channel_capacity: usize,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Seconds between packet stats log lines
    #[serde(default = "default_accounting_secs")]
    pub accounting_interval_secs: u64,
    /// Milliseconds spent on each channel
    #[serde(default = "default_hop_ms")]
    pub hop_interval_ms: u64,
    #[serde(default = "default_true")]
    pub hop: bool,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            interface: String::new(),
            snaplen: default_snaplen(),
            promiscuous: true,
            device_channel_capacity: default_device_channel_capacity(),
            max_in_flight: default_max_in_flight(),
            accounting_interval_secs: default_accounting_secs(),
            hop_interval_ms: default_hop_ms(),
            hop: true,
        }
    }
}

fn default_snaplen() -> i32 {
    1600
}

fn default_true() -> bool {
    true
}

fn default_device_channel_capacity() -> usize {
    0x1000
}

fn default_max_in_flight() -> usize {
    256
}

fn default_accounting_secs() -> u64 {
    60
}

fn default_hop_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("sigint-wifi-devices.db")
}

fn default_queue_capacity() -> usize {
    0x100
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSection {
    /// Stop after this many seconds (0 runs until interrupted)
    #[serde(default)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreRuleConfig {
    pub reason: String,
    pub low: String,
    /// Upper bound; without it `low` is matched exactly
    #[serde(default)]
    pub high: Option<String>,
}

impl Config {
    pub fn to_capture_config(&self) -> CaptureConfig {
        let c = &self.capture;
        CaptureConfig {
            interface: c.interface.clone(),
            snaplen: c.snaplen,
            promiscuous: c.promiscuous,
            device_channel_capacity: c.device_channel_capacity,
            max_in_flight: c.max_in_flight,
            accounting_interval: Duration::from_secs(c.accounting_interval_secs.max(1)),
            hop_interval: Duration::from_millis(c.hop_interval_ms.max(1)),
            hop_enabled: c.hop,
            ..Default::default()
        }
    }

    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.store.path.clone(),
            queue_capacity: self.store.queue_capacity,
        }
    }

    /// Builtin ignore table extended by the configured rules
    pub fn ignore_list(&self) -> Result<IgnoreList> {
        let extra = self
            .ignore
            .iter()
            .map(|r| {
                IgnoreRule::parse(&r.reason, &r.low, r.high.as_deref())
                    .with_context(|| format!("Invalid ignore rule '{}'", r.reason))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(IgnoreList::with_rules(extra))
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        match self.session.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
