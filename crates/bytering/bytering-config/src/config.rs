use bytering_fifo::{Capacity, FifoError};
use serde::Deserialize;
use std::path::Path;

/// Settings for the loopback host: ring size, simulated traffic, logging.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoopbackConfig {
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Bytes the simulated receive interrupt produces before the run ends.
    #[serde(default = "defaults::total_bytes")]
    pub total_bytes: u64,
    /// Bytes offered to the ring per simulated interrupt.
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "defaults::report_interval_ms")]
    pub report_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid ring capacity")]
    Capacity(#[from] FifoError),

    #[error("chunk_size must be at least 1")]
    ChunkSize,
}

mod defaults {
    pub fn capacity() -> usize {
        256
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn total_bytes() -> u64 {
        1 << 20
    }

    pub fn chunk_size() -> usize {
        16
    }

    pub fn report_interval_ms() -> u64 {
        1000
    }
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::capacity(),
            log_level: defaults::log_level(),
            total_bytes: defaults::total_bytes(),
            chunk_size: defaults::chunk_size(),
            report_interval_ms: defaults::report_interval_ms(),
        }
    }
}

impl LoopbackConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&toml_to_str)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: LoopbackConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capacity()?;
        if self.chunk_size == 0 {
            return Err(ConfigError::ChunkSize);
        }
        Ok(())
    }

    /// The configured ring size, checked against the power-of-two rule.
    pub fn capacity(&self) -> Result<Capacity, ConfigError> {
        Ok(Capacity::new(self.capacity)?)
    }
}
