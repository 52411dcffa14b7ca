mod config;

pub use config::{ConfigError, LoopbackConfig};
