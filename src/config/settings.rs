//! Simulator settings persisted between runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Serial device the simulator answers on (e.g. `/dev/ttyUSB0`).
    pub device: String,
    /// Baud rate for the device.
    pub baud_rate: u32,
    /// Directory holding the `.bin` frame logs. `None` uses the data dir.
    pub log_dir: Option<PathBuf>,
    /// Selected frame log, by file name. Takes effect on the next start.
    pub log_file: String,
    /// Initial diagnostic toggle states.
    pub diagnostics: DiagnosticsConfig,
}

/// Startup states for the two diagnostic toggles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Trace all traffic as hex/ASCII dumps.
    pub dump: bool,
    /// Corrupt the checksum bytes of every transmitted frame.
    pub checksum_error: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            log_dir: None,
            log_file: "sample.bin".to_string(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load config from file, falling back to defaults when absent.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let config_path = super::config_dir()
            .ok_or("Could not determine config directory")?
            .join("config.toml");

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    /// Resolved frame-log directory: the explicit setting, or `logs/` under
    /// the application data dir.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            super::data_dir()
                .map(|d| d.join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roundtrips_through_toml() {
        let config = SimConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let back: SimConfig = toml::from_str(&text).unwrap();

        assert_eq!(back.device, config.device);
        assert_eq!(back.baud_rate, config.baud_rate);
        assert_eq!(back.log_file, config.log_file);
        assert_eq!(back.diagnostics.dump, config.diagnostics.dump);
    }

    #[test]
    fn explicit_log_dir_wins() {
        let config = SimConfig {
            log_dir: Some(PathBuf::from("/tmp/imu-logs")),
            ..SimConfig::default()
        };
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/imu-logs"));
    }
}
