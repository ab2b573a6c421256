//! Run statistics and export.
//!
//! This module provides the counters gathered over a simulation run and
//! export to JSON, CSV and a human-readable summary.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::types::SimTime;

/// Aggregate statistics for a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Clock toggles performed
    pub ticks: u64,
    /// Simulation time at the end of the run
    pub final_time: SimTime,
    /// Event log records written
    pub records_written: u64,
    /// Completed read transactions
    pub reads: u64,
    /// Completed write transactions
    pub writes: u64,
    /// Stall diagnostics emitted
    pub stall_warnings: u64,
    /// Whether the time budget ran out
    pub exhausted: bool,
}

impl RunStats {
    /// Full clock cycles elapsed.
    pub fn cycles(&self) -> u64 {
        self.ticks / 2
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Exports statistics as `metric,value` CSV rows.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");
        csv.push_str(&format!("ticks,{}\n", self.ticks));
        csv.push_str(&format!("final_time,{}\n", self.final_time));
        csv.push_str(&format!("records_written,{}\n", self.records_written));
        csv.push_str(&format!("reads,{}\n", self.reads));
        csv.push_str(&format!("writes,{}\n", self.writes));
        csv.push_str(&format!("stall_warnings,{}\n", self.stall_warnings));
        csv.push_str(&format!("exhausted,{}\n", self.exhausted));

        csv
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Simulation Statistics ===")?;
        writeln!(w, "Final simulation time: {}", self.final_time)?;
        writeln!(w, "Clock cycles: {}", self.cycles())?;
        writeln!(w, "Event records: {}", self.records_written)?;
        writeln!(w, "Bus reads: {}, writes: {}", self.reads, self.writes)?;
        writeln!(w, "Stall warnings: {}", self.stall_warnings)?;
        if self.exhausted {
            writeln!(w, "Time budget exhausted")?;
        }
        Ok(())
    }

    /// Returns the summary as a string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}
