//! Configuration for a simulation run.
//!
//! Runs can be described in YAML or JSON; every section and field is
//! optional and falls back to the defaults used by the hardware testbench.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! simulation:
//!   max_sim_time: 200000000
//!   reset_cycles: 5
//!   log_level: info
//!
//! bus:
//!   stall_warn_ticks: 10000
//!
//! logging:
//!   header_interval: 15
//!   time_units_per_cycle: 2
//!
//! output:
//!   csv: run.csv
//!   trace: run.vcd
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::bus::DEFAULT_STALL_WARN_TICKS;
use crate::logger::{DEFAULT_HEADER_INTERVAL, DEFAULT_TIME_UNITS_PER_CYCLE};
use crate::types::{SimTime, DEFAULT_MAX_SIM_TIME};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Global simulation parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Time ceiling after which the clock stops
    #[serde(default = "default_max_sim_time")]
    pub max_sim_time: SimTime,

    /// Clock cycles spent in reset, and again after reset is released
    #[serde(default = "default_reset_cycles")]
    pub reset_cycles: u64,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_sim_time() -> SimTime {
    DEFAULT_MAX_SIM_TIME
}

fn default_reset_cycles() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            max_sim_time: default_max_sim_time(),
            reset_cycles: default_reset_cycles(),
            log_level: default_log_level(),
        }
    }
}

/// Bus protocol parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusParams {
    /// Stalled ticks before a slow handshake is reported
    #[serde(default = "default_stall_warn_ticks")]
    pub stall_warn_ticks: u64,
}

fn default_stall_warn_ticks() -> u64 {
    DEFAULT_STALL_WARN_TICKS
}

impl Default for BusParams {
    fn default() -> Self {
        Self { stall_warn_ticks: default_stall_warn_ticks() }
    }
}

/// Event log formatting parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogParams {
    /// Records between column hint lines
    #[serde(default = "default_header_interval")]
    pub header_interval: u64,

    /// Divisor converting simulation time into the logged cycle column
    #[serde(default = "default_time_units_per_cycle")]
    pub time_units_per_cycle: SimTime,
}

fn default_header_interval() -> u64 {
    DEFAULT_HEADER_INTERVAL
}

fn default_time_units_per_cycle() -> SimTime {
    DEFAULT_TIME_UNITS_PER_CYCLE
}

impl Default for LogParams {
    fn default() -> Self {
        Self {
            header_interval: default_header_interval(),
            time_units_per_cycle: default_time_units_per_cycle(),
        }
    }
}

/// Output file selection. Absent entries disable that output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputParams {
    /// Event log path
    #[serde(default)]
    pub csv: Option<PathBuf>,

    /// Waveform trace path
    #[serde(default)]
    pub trace: Option<PathBuf>,
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub simulation: SimulationParams,

    #[serde(default)]
    pub bus: BusParams,

    #[serde(default)]
    pub logging: LogParams,

    #[serde(default)]
    pub output: OutputParams,
}

impl SimConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.simulation.max_sim_time == 0 {
            return Err(ConfigError::Validation("max_sim_time must be non-zero".to_string()));
        }
        if self.bus.stall_warn_ticks == 0 {
            return Err(ConfigError::Validation("stall_warn_ticks must be non-zero".to_string()));
        }
        if self.logging.header_interval == 0 {
            return Err(ConfigError::Validation("header_interval must be non-zero".to_string()));
        }
        if self.logging.time_units_per_cycle == 0 {
            return Err(ConfigError::Validation(
                "time_units_per_cycle must be non-zero".to_string(),
            ));
        }
        if let (Some(csv), Some(trace)) = (&self.output.csv, &self.output.trace) {
            if csv == trace {
                return Err(ConfigError::Validation(format!(
                    "Event log and trace share the same path: {}",
                    csv.display()
                )));
            }
        }
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating SimConfig programmatically.
#[derive(Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_sim_time(mut self, time: SimTime) -> Self {
        self.config.simulation.max_sim_time = time;
        self
    }

    pub fn reset_cycles(mut self, cycles: u64) -> Self {
        self.config.simulation.reset_cycles = cycles;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    pub fn stall_warn_ticks(mut self, ticks: u64) -> Self {
        self.config.bus.stall_warn_ticks = ticks;
        self
    }

    pub fn header_interval(mut self, interval: u64) -> Self {
        self.config.logging.header_interval = interval;
        self
    }

    pub fn time_units_per_cycle(mut self, units: SimTime) -> Self {
        self.config.logging.time_units_per_cycle = units;
        self
    }

    /// Enables the event log at `path`.
    pub fn csv_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.csv = Some(path.into());
        self
    }

    /// Enables the waveform trace at `path`.
    pub fn trace_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output.trace = Some(path.into());
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<SimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
