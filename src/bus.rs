//! Memory-mapped bus transactor.
//!
//! The [`BusTransactor`] performs single-outstanding AXI-lite reads and
//! writes against the model by driving the valid/ready handshakes one clock
//! toggle at a time:
//!
//! ```text
//! read:  Idle -> AddressPhase -> DataPhase -> Settle -> Idle
//! write: Idle -> AddressPhase ------------> Settle -> Idle
//! ```
//!
//! Each waiting phase loops until the peer's ready (or data-valid) signal
//! appears. A phase that waits longer than the stall threshold emits a
//! [`Diagnostic`] and keeps waiting; a slow peer is never an error. Running
//! out of simulation time is: any transaction that needs a tick after the
//! clock is exhausted fails with [`BusError::Exhausted`].

use thiserror::Error;

use crate::clock::{ClockDriver, TickStatus};
use crate::diagnostic::{Diagnostic, DiagnosticSink, StallPhase, TracingDiagnostics};
use crate::logger::LogError;
use crate::port::{BusPins, SignalPort};
use crate::stats::RunStats;
use crate::types::{register_address, Address, RegisterIndex, SimTime, TICK_STEP};

/// Default number of stalled ticks before a slow handshake is reported.
pub const DEFAULT_STALL_WARN_TICKS: u64 = 10_000;

/// Errors raised by bus transactions.
#[derive(Error, Debug)]
pub enum BusError {
    #[error("Simulation time exhausted at {time}")]
    Exhausted { time: SimTime },

    #[error("Register {index} is outside the 32-bit address space")]
    RegisterOutOfRange { index: RegisterIndex },

    #[error("Output error: {0}")]
    Output(#[from] LogError),
}

/// Result type for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Drives read and write transactions over the clock.
pub struct BusTransactor<P: SignalPort> {
    clock: ClockDriver<P>,
    diagnostics: Box<dyn DiagnosticSink>,
    stall_warn_ticks: u64,
    reads: u64,
    writes: u64,
    stall_warnings: u64,
}

impl<P: SignalPort> std::fmt::Debug for BusTransactor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusTransactor")
            .field("stall_warn_ticks", &self.stall_warn_ticks)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .field("stall_warnings", &self.stall_warnings)
            .finish()
    }
}

impl<P: SignalPort> BusTransactor<P> {
    /// Creates a transactor reporting stalls through `tracing`.
    pub fn new(clock: ClockDriver<P>) -> Self {
        Self {
            clock,
            diagnostics: Box::new(TracingDiagnostics),
            stall_warn_ticks: DEFAULT_STALL_WARN_TICKS,
            reads: 0,
            writes: 0,
            stall_warnings: 0,
        }
    }

    /// Replaces the diagnostic sink.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Sets the stall threshold in ticks.
    pub fn with_stall_threshold(mut self, ticks: u64) -> Self {
        self.stall_warn_ticks = ticks.max(1);
        self
    }

    /// Reads the 32-bit word at `address`.
    pub fn read(&mut self, address: Address) -> BusResult<u32> {
        let start = self.clock.time();
        self.step()?;

        let pins = self.pins_mut();
        pins.arvalid = true;
        pins.araddr = address;

        self.wait_for(StallPhase::ReadAddress, address, |p| p.arready)?;
        self.wait_for(StallPhase::ReadData, address, |p| p.rvalid)?;

        self.step()?;
        let data = self.clock.port().pins().rdata;

        let pins = self.pins_mut();
        pins.arvalid = false;
        pins.rready = true;
        self.step()?;
        self.step()?;
        self.pins_mut().rready = false;

        self.reads += 1;
        tracing::debug!(
            address = format_args!("{:#x}", address),
            data = format_args!("{:#010x}", data),
            ticks = (self.clock.time() - start) / TICK_STEP,
            "read"
        );
        Ok(data)
    }

    /// Writes `data` to `address`.
    ///
    /// Completion of the address/data handshake is taken as success; the
    /// write response channel is not inspected.
    pub fn write(&mut self, address: Address, data: u32) -> BusResult<()> {
        let start = self.clock.time();
        self.step()?;

        let pins = self.pins_mut();
        pins.wdata = data;
        pins.awaddr = address;
        pins.awvalid = true;
        pins.wvalid = true;

        self.wait_for(StallPhase::Write, address, |p| p.awready && p.wready)?;

        self.step()?;
        self.step()?;
        let pins = self.pins_mut();
        pins.awvalid = false;
        pins.wvalid = false;

        self.step()?;

        self.writes += 1;
        tracing::debug!(
            address = format_args!("{:#x}", address),
            data = format_args!("{:#010x}", data),
            ticks = (self.clock.time() - start) / TICK_STEP,
            "write"
        );
        Ok(())
    }

    /// Reads slave register `index`.
    pub fn read_reg(&mut self, index: RegisterIndex) -> BusResult<u32> {
        let address = register_address(index).ok_or(BusError::RegisterOutOfRange { index })?;
        self.read(address)
    }

    /// Writes slave register `index`.
    ///
    /// An index past the address space fails before the bus is touched.
    pub fn write_reg(&mut self, index: RegisterIndex, data: u32) -> BusResult<()> {
        let address = register_address(index).ok_or(BusError::RegisterOutOfRange { index })?;
        self.write(address, data)
    }

    /// Ticks until `ready` holds, reporting each stall-threshold crossing.
    fn wait_for<F>(&mut self, phase: StallPhase, address: Address, ready: F) -> BusResult<()>
    where
        F: Fn(&BusPins) -> bool,
    {
        let mut stalled: u64 = 0;
        while !ready(self.clock.port().pins()) {
            self.step()?;
            stalled += 1;
            if stalled > self.stall_warn_ticks {
                self.stall_warnings += 1;
                self.diagnostics.emit(Diagnostic::SlowHandshake {
                    time: self.clock.time(),
                    phase,
                    address,
                    waited_ticks: stalled,
                });
                stalled = 0;
            }
        }
        Ok(())
    }

    /// Toggles the clock once, failing if the time budget is spent.
    fn step(&mut self) -> BusResult<()> {
        match self.clock.tick()? {
            TickStatus::Continue => Ok(()),
            TickStatus::Exhausted => Err(BusError::Exhausted { time: self.clock.time() }),
        }
    }

    fn pins_mut(&mut self) -> &mut BusPins {
        self.clock.port_mut().pins_mut()
    }

    pub fn clock(&self) -> &ClockDriver<P> {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut ClockDriver<P> {
        &mut self.clock
    }

    /// Completed read transactions.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Completed write transactions.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Stall diagnostics emitted.
    pub fn stall_warnings(&self) -> u64 {
        self.stall_warnings
    }

    /// Collects run statistics from the transactor, clock and logger.
    pub fn export_stats(&self) -> RunStats {
        RunStats {
            ticks: self.clock.ticks(),
            final_time: self.clock.time(),
            records_written: self.clock.logger().map(|l| l.records_written()).unwrap_or(0),
            reads: self.reads,
            writes: self.writes,
            stall_warnings: self.stall_warnings,
            exhausted: self.clock.is_exhausted(),
        }
    }

    /// Releases the clock, keeping its time, logger and trace sink.
    pub fn into_clock(self) -> ClockDriver<P> {
        self.clock
    }

    /// Flushes outputs, finalizes the model and returns it.
    pub fn finish(self) -> BusResult<P> {
        Ok(self.clock.into_port()?)
    }
}
