//! Change-triggered CSV event log.
//!
//! The [`EventLogger`] samples the tracked outputs on every falling clock
//! edge and appends one record only when at least one of them differs from
//! the last record written. Unchanged cycles produce no output at all.
//!
//! # Format
//!
//! ```text
//! # clock cycles, tx0_i, tx0_q, ... , leds, csv_version_0.2
//! #  ticks, tx0_i, tx0_q, tx1_i, tx1_q, fhd_x, ...
//!       25,     0,     0,     0,     0,     0, ...
//! ```
//!
//! The first line is written once. The abridged column hint is repeated
//! before records 1, 16, 31, ... so long logs stay readable. Field widths
//! and separators are fixed; downstream tools parse them positionally.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::port::SignalPort;
use crate::snapshot::{SignalSnapshot, TRACKED_SIGNALS};
use crate::types::SimTime;

/// Log format version written into the header line.
pub const CSV_VERSION_MAJOR: u32 = 0;
pub const CSV_VERSION_MINOR: u32 = 2;

/// Default number of records between column hint lines.
pub const DEFAULT_HEADER_INTERVAL: u64 = 15;

/// Default number of time units per logged cycle.
pub const DEFAULT_TIME_UNITS_PER_CYCLE: SimTime = 2;

const COLUMN_HINT: &str = "#  ticks, tx0_i, tx0_q, tx1_i, tx1_q, fhd_x, fhd_y, fhd_z,fhd_z2,  oc1_x,  oc1_y,  oc1_z, oc1_z2, rx0r, rx1r,v0,v1,r0,r1,e0,e1,tg,rg,to,leds";

/// Errors raised by the event log.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LogError {
    /// The underlying IO error kind.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            LogError::Open { source, .. } => source.kind(),
            LogError::Io(err) => err.kind(),
        }
    }
}

/// Result type for logging operations.
pub type LogResult<T> = Result<T, LogError>;

/// Returns the full header line (without trailing newline).
pub fn header_line() -> String {
    let mut line = String::from("# clock cycles");
    for spec in &TRACKED_SIGNALS {
        line.push_str(", ");
        line.push_str(spec.header);
    }
    line.push_str(&format!(", csv_version_{}.{}", CSV_VERSION_MAJOR, CSV_VERSION_MINOR));
    line
}

/// Returns the abridged column hint line (without trailing newline).
pub fn column_hint() -> &'static str {
    COLUMN_HINT
}

/// In-memory writer whose contents stay readable after it has been handed
/// to a logger or trace sink.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer {
    inner: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Change-filtered event logger.
pub struct EventLogger {
    out: Box<dyn Write>,
    last_logged: SignalSnapshot,
    /// Records written so far
    records: u64,
    header_interval: u64,
    time_units_per_cycle: SimTime,
}

impl EventLogger {
    /// Creates a logger writing to `path`, truncating any existing file.
    ///
    /// Fails with [`LogError::Open`] if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> LogResult<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| LogError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!("Dumping event output to {}", path.display());
        Self::new(BufWriter::new(file))
    }

    /// Creates a logger over an arbitrary writer and writes the header line.
    pub fn new<W: Write + 'static>(writer: W) -> LogResult<Self> {
        let mut logger = Self {
            out: Box::new(writer),
            last_logged: SignalSnapshot::initial(),
            records: 0,
            header_interval: DEFAULT_HEADER_INTERVAL,
            time_units_per_cycle: DEFAULT_TIME_UNITS_PER_CYCLE,
        };
        writeln!(logger.out, "{}", header_line())?;
        Ok(logger)
    }

    /// Sets the number of records between column hint lines.
    pub fn with_header_interval(mut self, interval: u64) -> Self {
        self.header_interval = interval.max(1);
        self
    }

    /// Sets the divisor converting simulation time into the cycle column.
    pub fn with_time_units_per_cycle(mut self, units: SimTime) -> Self {
        self.time_units_per_cycle = units.max(1);
        self
    }

    /// Compares the outputs of `port` against the last record and appends a
    /// new record if anything changed.
    ///
    /// Returns whether a record was written. The record only counts as
    /// logged once the write succeeded, so a failed write is retried by the
    /// next observation of the same state.
    pub fn observe(&mut self, time: SimTime, port: &dyn SignalPort) -> LogResult<bool> {
        let current = SignalSnapshot::capture(port);
        if !current.changed_from(&self.last_logged) {
            return Ok(false);
        }

        let mut text = String::new();
        if self.records % self.header_interval == 0 {
            text.push_str(COLUMN_HINT);
            text.push('\n');
        }
        text.push_str(&format!("{:>8}", time / self.time_units_per_cycle));
        current.render_fields(&mut text);
        text.push('\n');
        self.out.write_all(text.as_bytes())?;

        self.last_logged = current;
        self.records += 1;
        Ok(true)
    }

    /// Number of records written.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// The snapshot most recently written to the log.
    pub fn last_logged(&self) -> &SignalSnapshot {
        &self.last_logged
    }

    pub fn flush(&mut self) -> LogResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for EventLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLogger")
            .field("records", &self.records)
            .field("header_interval", &self.header_interval)
            .field("time_units_per_cycle", &self.time_units_per_cycle)
            .finish()
    }
}
