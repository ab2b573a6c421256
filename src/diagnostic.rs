//! Structured diagnostics raised by the bus protocol engine.
//!
//! A handshake that waits longer than its stall threshold is reported as a
//! [`Diagnostic`] through an injectable [`DiagnosticSink`]. Diagnostics are
//! never errors: the transaction keeps waiting after one is emitted.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::types::{Address, SimTime};

/// The handshake phase a transaction is waiting in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StallPhase {
    /// Waiting for the read address to be accepted
    ReadAddress,
    /// Waiting for read data to become valid
    ReadData,
    /// Waiting for write address and data to be accepted
    Write,
}

impl fmt::Display for StallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StallPhase::ReadAddress => "read-address",
            StallPhase::ReadData => "read-data",
            StallPhase::Write => "write",
        };
        f.write_str(name)
    }
}

/// A diagnostic event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A handshake phase exceeded its stall threshold.
    SlowHandshake {
        /// Simulation time when the threshold was crossed
        time: SimTime,
        phase: StallPhase,
        address: Address,
        /// Ticks waited since the phase started or the last report
        waited_ticks: u64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::SlowHandshake { time, phase, address, .. } => match phase {
                StallPhase::ReadAddress => {
                    write!(f, "{}ns: Slow to accept read address {}", time, address)
                }
                StallPhase::ReadData => {
                    write!(f, "{}ns: Slow to return data at address {}", time, address)
                }
                StallPhase::Write => write!(f, "{}ns: Slow to write to address {}", time, address),
            },
        }
    }
}

/// Receiver of protocol diagnostics.
pub trait DiagnosticSink {
    fn emit(&mut self, diagnostic: Diagnostic);
}

/// Reports diagnostics as `tracing` warnings.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::SlowHandshake { time, phase, address, waited_ticks } => {
                tracing::warn!(
                    time = *time,
                    phase = %phase,
                    address = *address,
                    waited_ticks = *waited_ticks,
                    "{}",
                    diagnostic
                );
            }
        }
    }
}

/// Discards every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct IgnoreDiagnostics;

impl DiagnosticSink for IgnoreDiagnostics {
    fn emit(&mut self, _diagnostic: Diagnostic) {}
}

/// Collects diagnostics into a shared list.
///
/// Clones share the same list, so a handle kept by the caller observes
/// everything emitted through the clone given to the transactor.
#[derive(Clone, Debug, Default)]
pub struct CollectDiagnostics {
    events: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything collected so far.
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectDiagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        self.events.borrow_mut().push(diagnostic);
    }
}
