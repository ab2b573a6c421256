//! Clock-tick scheduler.
//!
//! The [`ClockDriver`] owns the hardware model and advances simulation time
//! one clock toggle per [`tick`](ClockDriver::tick). Each toggle:
//!
//! 1. pushes the full pre-toggle state to the trace sink, if attached,
//! 2. inverts the clock and evaluates the model once,
//! 3. on a falling edge, lets the event logger sample the settled outputs,
//! 4. advances time by [`TICK_STEP`].
//!
//! Time is advanced after the logger has run, so a record carries the time
//! of the state it describes. Once time reaches the ceiling, `tick` reports
//! [`TickStatus::Exhausted`] and leaves the model untouched.

use crate::logger::{EventLogger, LogResult};
use crate::port::SignalPort;
use crate::trace::TraceSink;
use crate::types::{SimTime, DEFAULT_MAX_SIM_TIME, TICK_STEP};

/// Outcome of a tick request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    /// The clock toggled.
    Continue,
    /// The time budget is spent; nothing was done.
    Exhausted,
}

impl TickStatus {
    pub fn is_exhausted(self) -> bool {
        self == TickStatus::Exhausted
    }
}

/// Drives the model's clock and fans the settled state out to the
/// optional logger and trace sink.
pub struct ClockDriver<P: SignalPort> {
    port: P,
    /// Current simulation time
    time: SimTime,
    /// Time ceiling; no tick happens at or beyond it
    max_sim_time: SimTime,
    /// Clock toggles performed
    ticks: u64,
    logger: Option<EventLogger>,
    trace: Option<Box<dyn TraceSink>>,
}

impl<P: SignalPort> ClockDriver<P> {
    /// Creates a driver with no logger and no trace sink.
    pub fn new(port: P, max_sim_time: SimTime) -> Self {
        Self {
            port,
            time: 0,
            max_sim_time,
            ticks: 0,
            logger: None,
            trace: None,
        }
    }

    /// Attaches the change-filtered event logger.
    pub fn with_logger(mut self, logger: EventLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Attaches a full-state trace sink.
    pub fn with_trace(mut self, trace: Box<dyn TraceSink>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Toggles the clock once.
    ///
    /// Output failures are returned as errors. A failed trace dump abandons
    /// the tick before the clock toggles; a failed log write is reported
    /// after the tick has completed.
    pub fn tick(&mut self) -> LogResult<TickStatus> {
        if self.time >= self.max_sim_time {
            return Ok(TickStatus::Exhausted);
        }

        if let Some(trace) = self.trace.as_mut() {
            trace.dump(self.time, &self.port)?;
        }

        let pins = self.port.pins_mut();
        pins.aclk = !pins.aclk;
        self.port.eval();

        let falling_edge = !self.port.pins().aclk;
        let logged = match self.logger.as_mut() {
            Some(logger) if falling_edge => logger.observe(self.time, &self.port).map(|_| ()),
            _ => Ok(()),
        };

        // Log errors surface only after the step is complete
        tracing::trace!(time = self.time, falling_edge, "tick");
        self.time += TICK_STEP;
        self.ticks += 1;
        logged?;
        Ok(TickStatus::Continue)
    }

    /// Ticks up to `n` times, stopping early once exhausted.
    pub fn tick_n(&mut self, n: u64) -> LogResult<TickStatus> {
        for _ in 0..n {
            if self.tick()?.is_exhausted() {
                return Ok(TickStatus::Exhausted);
            }
        }
        Ok(TickStatus::Continue)
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn max_sim_time(&self) -> SimTime {
        self.max_sim_time
    }

    /// Returns true once no further tick will happen.
    pub fn is_exhausted(&self) -> bool {
        self.time >= self.max_sim_time
    }

    /// Number of clock toggles performed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Mutable access to the model, for driving input pins.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn logger(&self) -> Option<&EventLogger> {
        self.logger.as_ref()
    }

    /// Returns true if a trace sink is attached.
    pub fn has_trace(&self) -> bool {
        self.trace.is_some()
    }

    /// Flushes the logger and trace sink.
    pub fn flush(&mut self) -> LogResult<()> {
        if let Some(logger) = self.logger.as_mut() {
            logger.flush()?;
        }
        if let Some(trace) = self.trace.as_mut() {
            trace.flush()?;
        }
        Ok(())
    }

    /// Flushes all outputs, finalizes the model and hands it back.
    pub fn into_port(mut self) -> LogResult<P> {
        self.flush()?;
        self.port.finish();
        tracing::info!(time = self.time, ticks = self.ticks, "clock released");
        Ok(self.port)
    }
}
