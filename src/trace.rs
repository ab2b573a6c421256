//! Full-state waveform recording.
//!
//! A [`TraceSink`] receives the complete signal state on every clock toggle,
//! independent of the event log's change filter. The format is entirely the
//! sink's business; [`VcdTraceSink`] writes a value change dump readable by
//! GTKWave and similar viewers.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::port::{BusPins, SignalPort};
use crate::snapshot::TRACKED_SIGNALS;
use crate::types::SimTime;

/// Receiver of periodic full-state dumps keyed by simulation time.
pub trait TraceSink {
    /// Records the state of `port` at `time`.
    fn dump(&mut self, time: SimTime, port: &dyn SignalPort) -> io::Result<()>;

    /// Flushes any buffered output.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

type PinProbe = fn(&BusPins) -> u64;

/// Bus pins included in the waveform, with their widths.
const BUS_PROBES: &[(&str, u32, PinProbe)] = &[
    ("s0_axi_aclk", 1, |p| p.aclk as u64),
    ("s0_axi_aresetn", 1, |p| p.aresetn as u64),
    ("s0_axi_awaddr", 32, |p| p.awaddr as u64),
    ("s0_axi_awvalid", 1, |p| p.awvalid as u64),
    ("s0_axi_awready", 1, |p| p.awready as u64),
    ("s0_axi_wdata", 32, |p| p.wdata as u64),
    ("s0_axi_wvalid", 1, |p| p.wvalid as u64),
    ("s0_axi_wready", 1, |p| p.wready as u64),
    ("s0_axi_bvalid", 1, |p| p.bvalid as u64),
    ("s0_axi_bready", 1, |p| p.bready as u64),
    ("s0_axi_araddr", 32, |p| p.araddr as u64),
    ("s0_axi_arvalid", 1, |p| p.arvalid as u64),
    ("s0_axi_arready", 1, |p| p.arready as u64),
    ("s0_axi_rdata", 32, |p| p.rdata as u64),
    ("s0_axi_rvalid", 1, |p| p.rvalid as u64),
    ("s0_axi_rready", 1, |p| p.rready as u64),
    ("trig_i", 1, |p| p.trig_i as u64),
];

/// Value change dump recorder.
///
/// The header and initial values are written on the first dump; later dumps
/// only emit the signals whose value changed.
pub struct VcdTraceSink<W: Write> {
    writer: W,
    module_name: String,
    timescale: String,
    names: Vec<&'static str>,
    widths: Vec<u32>,
    ids: Vec<String>,
    prev_values: Option<Vec<u64>>,
    dumps: u64,
}

impl VcdTraceSink<BufWriter<File>> {
    /// Creates a recorder writing to `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        tracing::info!("Saving waveform trace to {}", path.display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> VcdTraceSink<W> {
    pub fn new(writer: W) -> Self {
        let mut names = Vec::new();
        let mut widths = Vec::new();
        for (name, width, _) in BUS_PROBES {
            names.push(*name);
            widths.push(*width);
        }
        for spec in &TRACKED_SIGNALS {
            names.push(spec.signal.name());
            widths.push(spec.width);
        }
        let ids = (0..names.len()).map(Self::idx_to_vcd_id).collect();

        Self {
            writer,
            module_name: "marga_model".to_string(),
            // One time unit is a nanosecond at the nominal 100 MHz clock
            timescale: "1ns".to_string(),
            names,
            widths,
            ids,
            prev_values: None,
            dumps: 0,
        }
    }

    /// Sets the scope name written to the header.
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Number of dumps recorded.
    pub fn dumps(&self) -> u64 {
        self.dumps
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Printable-ASCII identifier for signal `idx`.
    fn idx_to_vcd_id(idx: usize) -> String {
        let base = 94;
        let offset = 33u8;

        let mut result = String::new();
        let mut n = idx;
        loop {
            result.insert(0, (offset + (n % base) as u8) as char);
            n /= base;
            if n == 0 {
                break;
            }
            n -= 1;
        }
        result
    }

    fn format_value(value: u64, width: u32, vcd_id: &str) -> String {
        if width == 1 {
            format!("{}{}", value & 1, vcd_id)
        } else {
            format!("b{:b} {}", value, vcd_id)
        }
    }

    fn sample(port: &dyn SignalPort) -> Vec<u64> {
        let pins = port.pins();
        let mut values: Vec<u64> = BUS_PROBES.iter().map(|(_, _, probe)| probe(pins)).collect();
        for spec in &TRACKED_SIGNALS {
            values.push((port.output(spec.signal) & spec.mask()) as u64);
        }
        values
    }

    fn write_header(&mut self, time: SimTime, values: &[u64]) -> io::Result<()> {
        writeln!(self.writer, "$timescale {} $end", self.timescale)?;
        writeln!(self.writer, "$scope module {} $end", self.module_name)?;
        for ((name, width), id) in self.names.iter().zip(&self.widths).zip(&self.ids) {
            writeln!(self.writer, "$var wire {} {} {} $end", width, id, name)?;
        }
        writeln!(self.writer, "$upscope $end")?;
        writeln!(self.writer, "$enddefinitions $end")?;
        writeln!(self.writer, "#{}", time)?;
        writeln!(self.writer, "$dumpvars")?;
        for (idx, &value) in values.iter().enumerate() {
            writeln!(self.writer, "{}", Self::format_value(value, self.widths[idx], &self.ids[idx]))?;
        }
        writeln!(self.writer, "$end")
    }
}

impl<W: Write> TraceSink for VcdTraceSink<W> {
    fn dump(&mut self, time: SimTime, port: &dyn SignalPort) -> io::Result<()> {
        let values = Self::sample(port);
        self.dumps += 1;

        match self.prev_values.take() {
            None => self.write_header(time, &values)?,
            Some(prev) => {
                let mut stamped = false;
                for (idx, (&value, &old)) in values.iter().zip(&prev).enumerate() {
                    if value == old {
                        continue;
                    }
                    if !stamped {
                        writeln!(self.writer, "#{}", time)?;
                        stamped = true;
                    }
                    writeln!(self.writer, "{}", Self::format_value(value, self.widths[idx], &self.ids[idx]))?;
                }
            }
        }

        self.prev_values = Some(values);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
