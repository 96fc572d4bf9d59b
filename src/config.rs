//! TOML configuration shared by the binaries
//!
//! ```toml
//! [server]
//! port = 4321
//!
//! [capture]
//! buffers = 4
//! driver = "sun6i-csi"
//!
//! [params]
//! modules = "BAYER | BDNF"
//!
//! [params.bayer]
//! gains = [300, 256, 256, 280]
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::device::Selector;
use crate::error::{Error, Result};
use crate::format::FourCC;
use crate::params::ParamsConfig;
use crate::protocol::{
    FragmentReader, FragmentWriter, DEFAULT_PORT, FRAGMENT_SIZE, MAX_FRAGMENT_SIZE,
};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub capture: CaptureConfig,
    pub transfer: TransferConfig,
    pub params: ParamsSection,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Config::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| Error::invalid(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot work
    pub fn validate(&self) -> Result<()> {
        if self.capture.buffers < 3 {
            return Err(Error::invalid(format!(
                "capture needs at least 3 buffers, got {}",
                self.capture.buffers
            )));
        }
        if self.capture.preload == 0 || self.capture.preload >= self.capture.buffers {
            return Err(Error::invalid(format!(
                "preload of {} does not fit {} buffers",
                self.capture.preload, self.capture.buffers
            )));
        }
        if self.params.buffers == 0 {
            return Err(Error::invalid("params need at least one buffer"));
        }
        if self.transfer.fragment_size == 0 || self.transfer.fragment_size > MAX_FRAGMENT_SIZE {
            return Err(Error::invalid(format!(
                "fragment size {} must be between 1 and {}",
                self.transfer.fragment_size, MAX_FRAGMENT_SIZE
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    pub buffers: u32,
    /// Buffers kept queued ahead of the one being read
    pub preload: u32,
    pub dequeue_timeout_ms: u64,
    pub driver: Option<String>,
    pub card: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            buffers: 3,
            preload: 2,
            dequeue_timeout_ms: 300,
            driver: None,
            card: None,
        }
    }
}

impl CaptureConfig {
    pub fn selector(&self) -> Selector {
        selector(&self.driver, &self.card)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    pub fragment_size: usize,
    pub write_timeout_ms: u64,
    pub read_idle_timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            fragment_size: FRAGMENT_SIZE,
            write_timeout_ms: 300,
            read_idle_timeout_ms: 2000,
        }
    }
}

impl TransferConfig {
    pub fn writer(&self) -> FragmentWriter {
        FragmentWriter::new(
            self.fragment_size,
            Duration::from_millis(self.write_timeout_ms),
        )
    }

    pub fn reader(&self) -> FragmentReader {
        FragmentReader::new(Duration::from_millis(self.read_idle_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParamsSection {
    pub buffers: u32,
    pub dataformat: FourCC,
    pub driver: Option<String>,
    pub card: Option<String>,
    #[serde(flatten)]
    pub block: ParamsConfig,
}

impl Default for ParamsSection {
    fn default() -> Self {
        ParamsSection {
            buffers: 3,
            dataformat: FourCC::S6IP,
            driver: Some("sun6i-isp".to_string()),
            card: Some("sun6i-isp-params".to_string()),
            block: ParamsConfig::default(),
        }
    }
}

impl ParamsSection {
    pub fn selector(&self) -> Selector {
        selector(&self.driver, &self.card)
    }
}

fn selector(driver: &Option<String>, card: &Option<String>) -> Selector {
    Selector {
        driver: driver.clone(),
        card: card.clone(),
    }
}
