//! Configuration System using Figment
//!
//! Configuration is layered, lowest priority first:
//! 1. built-in defaults (the stock CO2 monitor)
//! 2. a TOML file (`config/co2mini.toml` unless another path is given)
//! 3. environment variables prefixed with `CO2MINI_`, nested keys split on `__`
//!
//! CLI flags are applied on top by the binary.
//!
//! # Example
//! ```no_run
//! use co2mini::config::MonitorConfig;
//!
//! let config = MonitorConfig::load()?;
//! config.validate()?;
//! let protocol = config.protocol()?;
//! # Ok::<(), co2mini::error::MonitorError>(())
//! ```

use crate::error::{AppResult, MonitorError};
use crate::logging::{parse_log_level, LogFormat};
use crate::output::OutputFormat;
use crate::protocol::{DeviceIdentifier, DeviceKey, ProtocolConfig};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/co2mini.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CO2MINI_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Device settings
    #[serde(default)]
    pub device: DeviceConfig,
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Device protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `vendor:product:revision:interface` to match during discovery
    #[serde(default = "default_identifier")]
    pub identifier: String,
    /// 16 hex digit key written to the device and used to descramble reports
    #[serde(default = "default_key")]
    pub key: String,
    /// Timeout of a single poll in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (plain or json)
    #[serde(default = "default_format")]
    pub format: String,
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    LogFormat::default().to_string()
}

fn default_identifier() -> String {
    DeviceIdentifier::CO2_MINI.to_string()
}

fn default_key() -> String {
    DeviceKey::default().to_string()
}

fn default_read_timeout() -> u64 {
    1000
}

fn default_format() -> String {
    OutputFormat::Plain.to_string()
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            key: default_key(),
            read_timeout_ms: default_read_timeout(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the default file and environment variables
    ///
    /// A missing file is not an error; defaults apply.
    /// Example override: `CO2MINI_DEVICE__READ_TIMEOUT_MS=500`
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        Ok(Self::figment(path).extract()?)
    }

    /// The provider stack used by [`load_from`](Self::load_from).
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(MonitorConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        parse_log_level(&self.application.log_level)?;
        self.application.log_format.parse::<LogFormat>()?;

        if !(1..=60_000).contains(&self.device.read_timeout_ms) {
            return Err(MonitorError::Configuration(format!(
                "Invalid read_timeout_ms {}. Must be 1-60000",
                self.device.read_timeout_ms
            )));
        }

        self.output_format()?;
        self.protocol()?;
        Ok(())
    }

    /// Parsed output format.
    pub fn output_format(&self) -> AppResult<OutputFormat> {
        self.output.format.parse()
    }

    /// Build the immutable protocol settings.
    pub fn protocol(&self) -> AppResult<ProtocolConfig> {
        Ok(ProtocolConfig {
            key: self.device.key.parse()?,
            identifier: self.device.identifier.parse()?,
            read_timeout: Duration::from_millis(self.device.read_timeout_ms),
            ..ProtocolConfig::default()
        })
    }
}
