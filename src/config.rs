//! Configuration file handling

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BridgeError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Log at debug level
    #[serde(default)]
    pub debug: bool,

    /// Serial number of the control surface to use
    pub device_serial: String,

    /// Source toggled together with `audio_source`, shown on the audio key
    pub mic_source: String,

    /// Music/desktop audio source muted while the microphone is live
    pub audio_source: String,

    /// Directory with `<name>_<true|false>.png` key images
    #[serde(default = "default_asset_dir")]
    pub asset_dir: PathBuf,

    #[serde(default = "default_brightness")]
    pub brightness: u8,

    /// One entry per row of keys, in row order
    pub instances: Vec<InstanceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub password: Option<String>,
}

fn default_asset_dir() -> PathBuf {
    PathBuf::from("assets")
}

fn default_brightness() -> u8 {
    50
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    4455
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path).map_err(|source| BridgeError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, BridgeError> {
        let mut config: Config = toml::from_str(content)?;
        config.brightness = config.brightness.min(100);
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), BridgeError> {
        let required = [
            ("device_serial", &self.device_serial),
            ("mic_source", &self.mic_source),
            ("audio_source", &self.audio_source),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(BridgeError::Config(format!("{} must not be empty", field)));
            }
        }

        if self.instances.is_empty() {
            return Err(BridgeError::Config(
                "at least one instance must be configured".to_string(),
            ));
        }

        Ok(())
    }

    /// Checks that every instance gets its own row on a device with `rows` rows
    pub fn check_rows(&self, rows: u8) -> Result<(), BridgeError> {
        if self.instances.len() > rows as usize {
            return Err(BridgeError::Config(format!(
                "{} instances configured but the device only has {} rows",
                self.instances.len(),
                rows
            )));
        }

        Ok(())
    }
}
