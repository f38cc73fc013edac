//! YAML configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Command-line flags are applied on top by the binary.
//!
//! ```yaml
//! serial:
//!   device: /dev/ttyAMA0
//!   baud_rate: 2400
//!   drain_ms: 200
//! publish:
//!   topic: powerMeter/house
//!   name: Grid
//!   hass_name: grid
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::types::UpdateRate;
use crate::{MeterError, Result};

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KraftConfig {
    pub serial: SerialConfig,
    pub publish: PublishConfig,
    /// Read a capture file instead of the serial port.
    pub replay: Option<ReplayConfig>,
    /// `tracing` filter directive, e.g. `kraft=debug`.
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    /// How long to discard input after opening the port.
    pub drain_ms: u64,
    /// How often the meter sends a list. Kaifa meters push every 2 to 10
    /// seconds depending on the list.
    pub frame_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 2400,
            drain_ms: 200,
            frame_interval_ms: 2000,
        }
    }
}

impl SerialConfig {
    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishConfig {
    /// Base topic for per-feature updates. Empty disables them.
    pub topic: String,
    /// Human readable device name.
    pub name: String,
    /// Home Assistant device name. Empty disables discovery and state.
    pub hass_name: String,
    /// Rate at which readings are published.
    pub update_rate: UpdateRate,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            topic: "powerMeter/house".to_string(),
            name: "Grid".to_string(),
            hass_name: "grid".to_string(),
            update_rate: UpdateRate::Native,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    pub path: PathBuf,
    /// Delay between frames. Zero replays as fast as possible.
    #[serde(default)]
    pub frame_interval_ms: u64,
    /// Bytes handed to the extractor per read.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    64
}

impl ReplayConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), frame_interval_ms: 0, chunk_size: default_chunk_size() }
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        (self.frame_interval_ms > 0).then(|| Duration::from_millis(self.frame_interval_ms))
    }
}

impl KraftConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| MeterError::file_error(path, e))?;
        let config = Self::from_yaml(&contents)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)
                .map_err(|e| MeterError::config_with_source("could not parse YAML", e))?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.replay.is_none() && self.serial.device.trim().is_empty() {
            return Err(MeterError::config("serial.device must not be empty"));
        }
        if self.serial.baud_rate == 0 {
            return Err(MeterError::config("serial.baud_rate must be positive"));
        }
        if let Some(replay) = &self.replay {
            if replay.chunk_size == 0 {
                return Err(MeterError::config("replay.chunk_size must be positive"));
            }
        }
        for (key, value) in
            [("publish.topic", &self.publish.topic), ("publish.hass_name", &self.publish.hass_name)]
        {
            if value.contains(['#', '+']) {
                return Err(MeterError::config(format!("{key} must not contain MQTT wildcards")));
            }
        }
        Ok(())
    }
}
