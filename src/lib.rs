//! # Marga Simulation Driver
//!
//! Clock, bus and logging harness for a cycle-accurate model of the marga
//! MRI controller. The model is reached through the [`SignalPort`] trait;
//! this crate supplies everything around it.
//!
//! ## Components
//!
//! - **Clock**: [`ClockDriver`] toggles the model clock in fixed time steps
//!   under a time ceiling, feeding an optional waveform trace and event log.
//! - **Event log**: [`EventLogger`] writes a CSV record only when at least
//!   one tracked output changed since the last record.
//! - **Bus**: [`BusTransactor`] performs AXI-lite reads and writes,
//!   reporting slow handshakes without ever giving up on them.
//! - **Assembly**: [`SimulationBuilder`] wires the above from a
//!   [`SimConfig`] and runs the power-on reset.
//!
//! ## Quick Start
//!
//! ```rust
//! use marga_sim::models::RegisterFileModel;
//! use marga_sim::{EventLogger, SharedBuffer, SimulationBuilder};
//!
//! let csv = SharedBuffer::new();
//! let mut bus = SimulationBuilder::new(RegisterFileModel::new())
//!     .logger(EventLogger::new(csv.clone()).unwrap())
//!     .build()
//!     .unwrap();
//!
//! bus.write_reg(10, 0x0000_ff01).unwrap();
//! assert_eq!(bus.read_reg(10).unwrap(), 0x0000_ff01);
//!
//! let stats = bus.export_stats();
//! println!("{}", stats.summary());
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use marga_sim::config::SimConfig;
//!
//! let config = SimConfig::from_yaml_file("simulation.yaml")?;
//! let bus = SimulationBuilder::new(model).config(config).build()?;
//! ```

pub mod types;
pub mod port;
pub mod snapshot;
pub mod clock;
pub mod logger;
pub mod trace;
pub mod diagnostic;
pub mod bus;
pub mod config;
pub mod driver;
pub mod stats;
pub mod models;

// Re-export commonly used types
pub use types::{register_address, Address, RegisterIndex, SimTime, DEFAULT_MAX_SIM_TIME, TICK_STEP};
pub use port::{BusPins, OutputSignal, SignalPort};
pub use snapshot::{SignalSnapshot, TRACKED_SIGNALS};
pub use clock::{ClockDriver, TickStatus};
pub use logger::{EventLogger, LogError, LogResult, SharedBuffer};
pub use trace::{TraceSink, VcdTraceSink};
pub use diagnostic::{CollectDiagnostics, Diagnostic, DiagnosticSink, IgnoreDiagnostics, StallPhase, TracingDiagnostics};
pub use bus::{BusError, BusResult, BusTransactor, DEFAULT_STALL_WARN_TICKS};
pub use config::{ConfigError, SimConfig, SimConfigBuilder};
pub use driver::{power_on_reset, BuildError, SimulationBuilder};
pub use stats::RunStats;

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// overrides `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// marga_sim::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
