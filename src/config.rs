//! YAML configuration.
//!
//! [`Config`] mirrors the file on disk. [`Config::validate`] turns it into the immutable
//! [`MonitorConfig`] the monitor runs with; any error here is fatal at startup.

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use crate::modbus::RegisterType;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("modbus.ip or hostname cannot be resolved: {host:?} ({reason})")]
    UnresolvableHost { host: String, reason: String },
    #[error("modbus.port must be set")]
    MissingPort,
    #[error("threshold must be between 1 and 100, got {0}")]
    ThresholdOutOfRange(u16),
    #[error("poll_interval must be between 1 and 3600 seconds, got {0}")]
    PollIntervalOutOfRange(u64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub modbus: ModbusConfig,
    pub threshold: u16,
    pub poll_interval: u64,
    #[serde(default)]
    pub alert_threshold: u16,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub cold_start: ColdStartConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModbusConfig {
    pub ip: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default = "default_slave_id")]
    pub slave_id: u8,
    pub battery_register: u16,
    pub register_type: RegisterType,
    /// Grid state register, 0 when grid monitoring is off.
    #[serde(default)]
    pub input_register: u16,
    /// Grid register value meaning "not connected", 0 when grid monitoring is off.
    #[serde(default)]
    pub not_connected_input_value: u16,
}

fn default_slave_id() -> u8 {
    1
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_server: String,
    #[serde(default)]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub subject: String,
}

impl EmailConfig {
    pub fn is_complete(&self) -> bool {
        !self.smtp_server.is_empty() && !self.from.is_empty() && !self.to.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ColdStartConfig {
    /// Boot ages below this count as a cold start.
    #[serde(default = "default_boot_age")]
    pub boot_age_seconds: u64,
    /// Upper bound on how long a cold start may watch for recovery.
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
}

fn default_boot_age() -> u64 {
    180
}

fn default_max_wait() -> u64 {
    600
}

impl Default for ColdStartConfig {
    fn default() -> Self {
        Self {
            boot_age_seconds: default_boot_age(),
            max_wait_seconds: default_max_wait(),
        }
    }
}

impl ColdStartConfig {
    pub fn boot_age(&self) -> Duration {
        Duration::from_secs(self.boot_age_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    pub register: u16,
    pub not_connected_value: u16,
}

/// Validated settings the monitor runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub endpoint: SocketAddr,
    pub unit: u8,
    pub battery_register: u16,
    pub register_type: RegisterType,
    pub threshold: u16,
    /// 0 disables alerting.
    pub alert_threshold: u16,
    pub poll_interval: Duration,
    /// `None` when grid monitoring is off.
    pub grid: Option<GridConfig>,
    pub cold_start: ColdStartConfig,
}

impl MonitorConfig {
    pub fn grid_monitoring_enabled(&self) -> bool {
        self.grid.is_some()
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Problems that do not stop the monitor but should be logged at startup.
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if !self.email.is_complete() {
            warnings.push("email settings incomplete, email sending may fail");
        }
        warnings
    }

    pub fn validate(&self) -> Result<MonitorConfig, ConfigError> {
        let m = &self.modbus;
        let endpoint = (m.ip.as_str(), m.port)
            .to_socket_addrs()
            .map_err(|e| e.to_string())
            .and_then(|mut addrs| addrs.next().ok_or_else(|| "no addresses".to_owned()))
            .map_err(|reason| ConfigError::UnresolvableHost {
                host: m.ip.clone(),
                reason,
            })?;
        if m.port == 0 {
            return Err(ConfigError::MissingPort);
        }
        if !(1..=100).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        if !(1..=3600).contains(&self.poll_interval) {
            return Err(ConfigError::PollIntervalOutOfRange(self.poll_interval));
        }
        let grid_enabled = m.input_register != 0 && m.not_connected_input_value != 0;
        let grid = grid_enabled.then_some(GridConfig {
            register: m.input_register,
            not_connected_value: m.not_connected_input_value,
        });

        Ok(MonitorConfig {
            endpoint,
            unit: m.slave_id,
            battery_register: m.battery_register,
            register_type: m.register_type,
            threshold: self.threshold,
            alert_threshold: self.alert_threshold,
            poll_interval: Duration::from_secs(self.poll_interval),
            grid,
            cold_start: self.cold_start,
        })
    }
}
