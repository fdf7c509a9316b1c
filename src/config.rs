use motion::TrackerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub tracker: TrackerConfig,
    pub serial: SerialConfig,
    pub sensors: SensorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baudrate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    pub address_1: u8,
    pub address_2: u8,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        // Try external file first
        let config: Config = if Path::new("config.toml").exists() {
            let config_content = fs::read_to_string("config.toml")?;
            let config = toml::from_str(&config_content)?;
            log::info!("Loaded configuration from file");
            config
        } else {
            // Fallback to embedded defaults
            let config = toml::from_str(include_str!("../config.toml.example"))?;
            log::warn!("Using embedded default configuration");
            config
        };

        config.tracker.validate()?;
        Ok(config)
    }
}
