//! Simulation assembly.
//!
//! [`SimulationBuilder`] wires a model to the clock driver, the optional
//! event logger and trace sink, and the bus transactor, then takes the
//! model through its power-on reset.
//!
//! ```rust,ignore
//! let config = SimConfig::from_yaml_file("run.yaml")?;
//! let mut bus = SimulationBuilder::new(RegisterFileModel::new())
//!     .config(config)
//!     .build()?;
//! bus.write_reg(0, 0x1234)?;
//! ```

use thiserror::Error;

use crate::bus::BusTransactor;
use crate::clock::ClockDriver;
use crate::config::{ConfigError, SimConfig};
use crate::diagnostic::DiagnosticSink;
use crate::logger::{EventLogger, LogError};
use crate::port::SignalPort;
use crate::trace::{TraceSink, VcdTraceSink};
use crate::types::SimTime;

/// Errors raised while assembling a simulation.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event log error: {0}")]
    Log(#[from] LogError),

    #[error("Failed to open trace {path}: {source}")]
    Trace {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Simulation time exhausted during reset at {time}")]
    Exhausted { time: SimTime },
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Assembles a ready-to-use [`BusTransactor`] around a model.
pub struct SimulationBuilder<P: SignalPort> {
    port: P,
    config: SimConfig,
    logger: Option<EventLogger>,
    trace: Option<Box<dyn TraceSink>>,
    diagnostics: Option<Box<dyn DiagnosticSink>>,
}

impl<P: SignalPort> SimulationBuilder<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            config: SimConfig::default(),
            logger: None,
            trace: None,
            diagnostics: None,
        }
    }

    /// Uses `config` for limits, thresholds and output paths.
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches an event logger, taking precedence over `output.csv`.
    pub fn logger(mut self, logger: EventLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Attaches a trace sink, taking precedence over `output.trace`.
    pub fn trace(mut self, trace: Box<dyn TraceSink>) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Builds the simulation and runs the power-on reset sequence.
    pub fn build(self) -> BuildResult<BusTransactor<P>> {
        let reset_cycles = self.config.simulation.reset_cycles;
        let mut bus = self.build_without_reset()?;
        power_on_reset(bus.clock_mut(), reset_cycles)?;
        Ok(bus)
    }

    /// Builds the simulation leaving the model pins untouched.
    pub fn build_without_reset(self) -> BuildResult<BusTransactor<P>> {
        let SimulationBuilder {
            port,
            config,
            logger,
            trace,
            diagnostics,
        } = self;
        config.validate()?;

        let logger = match (logger, &config.output.csv) {
            (Some(logger), _) => Some(logger),
            (None, Some(path)) => {
                let logger = EventLogger::create(path)?
                    .with_header_interval(config.logging.header_interval)
                    .with_time_units_per_cycle(config.logging.time_units_per_cycle);
                Some(logger)
            }
            (None, None) => None,
        };

        let trace = match (trace, &config.output.trace) {
            (Some(trace), _) => Some(trace),
            (None, Some(path)) => {
                let sink = VcdTraceSink::create(path).map_err(|source| BuildError::Trace {
                    path: path.display().to_string(),
                    source,
                })?;
                Some(Box::new(sink) as Box<dyn TraceSink>)
            }
            (None, None) => None,
        };

        let mut clock = ClockDriver::new(port, config.simulation.max_sim_time);
        if let Some(logger) = logger {
            clock = clock.with_logger(logger);
        }
        if let Some(trace) = trace {
            clock = clock.with_trace(trace);
        }

        let mut bus = BusTransactor::new(clock).with_stall_threshold(config.bus.stall_warn_ticks);
        if let Some(sink) = diagnostics {
            bus = bus.with_diagnostics(sink);
        }

        tracing::debug!(
            max_sim_time = config.simulation.max_sim_time,
            stall_warn_ticks = config.bus.stall_warn_ticks,
            "simulation assembled"
        );
        Ok(bus)
    }
}

/// Holds the model in reset for `cycles` clock cycles, then releases it
/// with the write response always accepted and idles another `cycles`.
///
/// The clock is left high, matching its level before the first toggle.
pub fn power_on_reset<P: SignalPort>(clock: &mut ClockDriver<P>, cycles: u64) -> BuildResult<()> {
    clock.port_mut().pins_mut().reset_inputs();
    run_cycles(clock, cycles)?;

    let pins = clock.port_mut().pins_mut();
    pins.aresetn = true;
    pins.bready = true;
    run_cycles(clock, cycles)?;

    tracing::info!(time = clock.time(), "reset released");
    Ok(())
}

fn run_cycles<P: SignalPort>(clock: &mut ClockDriver<P>, cycles: u64) -> BuildResult<()> {
    if clock.tick_n(cycles * 2)?.is_exhausted() {
        return Err(BuildError::Exhausted { time: clock.time() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfigBuilder;
    use crate::models::RegisterFileModel;

    #[test]
    fn test_build_runs_reset() {
        let bus = SimulationBuilder::new(RegisterFileModel::new()).build().unwrap();
        let clock = bus.clock();
        // 5 cycles in reset + 5 cycles after release
        assert_eq!(clock.ticks(), 20);
        assert_eq!(clock.time(), 100);

        let pins = clock.port().pins();
        assert!(pins.aclk);
        assert!(pins.aresetn);
        assert!(pins.bready);
    }

    #[test]
    fn test_build_without_reset() {
        let bus = SimulationBuilder::new(RegisterFileModel::new())
            .build_without_reset()
            .unwrap();
        assert_eq!(bus.clock().ticks(), 0);
        assert!(!bus.clock().port().pins().aresetn);
    }

    #[test]
    fn test_reset_exhausts_budget() {
        let config = SimConfigBuilder::new().max_sim_time(50).build().unwrap();
        let err = SimulationBuilder::new(RegisterFileModel::new())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Exhausted { time: 50 }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.simulation.max_sim_time = 0;
        let err = SimulationBuilder::new(RegisterFileModel::new())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
    }

    #[test]
    fn test_missing_output_directory() {
        let config = SimConfigBuilder::new()
            .csv_output("/nonexistent/dir/run.csv")
            .build()
            .unwrap();
        let err = SimulationBuilder::new(RegisterFileModel::new())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::Log(LogError::Open { .. })));
    }
}
