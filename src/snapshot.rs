//! Tracked output signals and their snapshots.
//!
//! The set of logged outputs is a declarative table, [`TRACKED_SIGNALS`].
//! Each row names the output, its bit width, the value assumed before the
//! first observation and how its log column is rendered. Snapshot capture,
//! change detection and record formatting all iterate the table, so adding
//! a tracked signal is a single new row.

use crate::port::{OutputSignal, SignalPort};

/// How a value is rendered in its log column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Radix {
    /// Decimal, reinterpreted as a 32-bit signed integer
    Signed,
    /// Decimal, unsigned
    Unsigned,
}

/// Log column layout: separator emitted before the field, right-aligned
/// field width and rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    pub separator: &'static str,
    pub width: usize,
    pub radix: Radix,
}

impl Column {
    const fn signed(width: usize) -> Self {
        Self { separator: ", ", width, radix: Radix::Signed }
    }

    const fn unsigned(width: usize) -> Self {
        Self { separator: ", ", width, radix: Radix::Unsigned }
    }

    const fn tight(self) -> Self {
        Self { separator: ",", ..self }
    }

    /// Appends `value` to `out` in this column's layout.
    pub fn render(&self, out: &mut String, value: u32) {
        out.push_str(self.separator);
        let width = self.width;
        match self.radix {
            Radix::Signed => out.push_str(&format!("{:>width$}", value as i32)),
            Radix::Unsigned => out.push_str(&format!("{:>width$}", value)),
        }
    }
}

/// One row of the tracked-signal table.
#[derive(Clone, Copy, Debug)]
pub struct SignalSpec {
    pub signal: OutputSignal,
    /// Column name in the full header line
    pub header: &'static str,
    /// Bit width of the output
    pub width: u32,
    /// Value assumed before the first observation
    pub initial: u32,
    pub column: Column,
}

impl SignalSpec {
    const fn new(signal: OutputSignal, header: &'static str, width: u32, column: Column) -> Self {
        Self { signal, header, width, initial: 0, column }
    }

    const fn starting_at(self, initial: u32) -> Self {
        Self { initial, ..self }
    }

    /// Bit mask covering the declared width.
    pub fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }
}

/// Every logged output, in column order.
///
/// `ocra1_vz2` starts at a value the hardware never idles at, so the first
/// observation always differs and the initial state gets a record.
pub static TRACKED_SIGNALS: [SignalSpec; OutputSignal::COUNT] = [
    SignalSpec::new(OutputSignal::Tx0I, "tx0_i", 16, Column::signed(5)),
    SignalSpec::new(OutputSignal::Tx0Q, "tx0_q", 16, Column::signed(5)),
    SignalSpec::new(OutputSignal::Tx1I, "tx1_i", 16, Column::signed(5)),
    SignalSpec::new(OutputSignal::Tx1Q, "tx1_q", 16, Column::signed(5)),
    SignalSpec::new(OutputSignal::FhdoVoutX, "fhdo_vx", 16, Column::unsigned(5)),
    SignalSpec::new(OutputSignal::FhdoVoutY, "fhdo_vy", 16, Column::unsigned(5)),
    SignalSpec::new(OutputSignal::FhdoVoutZ, "fhdo_vz", 16, Column::unsigned(5)),
    SignalSpec::new(OutputSignal::FhdoVoutZ2, "fhdo_vz2", 16, Column::unsigned(5)),
    SignalSpec::new(OutputSignal::Ocra1VoutX, "ocra1_vx", 20, Column::signed(6)),
    SignalSpec::new(OutputSignal::Ocra1VoutY, "ocra1_vy", 20, Column::signed(6)),
    SignalSpec::new(OutputSignal::Ocra1VoutZ, "ocra1_vz", 20, Column::signed(6)),
    SignalSpec::new(OutputSignal::Ocra1VoutZ2, "ocra1_vz2", 20, Column::signed(6)).starting_at(0xfffff),
    SignalSpec::new(OutputSignal::Rx0Rate, "rx0_rate", 16, Column::unsigned(5).tight()),
    SignalSpec::new(OutputSignal::Rx1Rate, "rx1_rate", 16, Column::unsigned(5).tight()),
    SignalSpec::new(OutputSignal::Rx0RateValid, "rx0_rate_valid", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Rx1RateValid, "rx1_rate_valid", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Rx0RstN, "rx0_rst_n", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Rx1RstN, "rx1_rst_n", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Rx0En, "rx0_en", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Rx1En, "rx1_en", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::TxGate, "tx_gate", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::RxGate, "rx_gate", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Trig, "trig_out", 1, Column::signed(1)),
    SignalSpec::new(OutputSignal::Leds, "leds", 8, Column::unsigned(3)),
];

/// Values of all tracked outputs at one sampled instant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignalSnapshot {
    values: [u32; OutputSignal::COUNT],
}

impl SignalSnapshot {
    /// The "nothing logged yet" snapshot built from the table's initial values.
    pub fn initial() -> Self {
        let mut values = [0; OutputSignal::COUNT];
        for spec in &TRACKED_SIGNALS {
            values[spec.signal.index()] = spec.initial;
        }
        Self { values }
    }

    /// Samples every tracked output of `port`.
    pub fn capture(port: &dyn SignalPort) -> Self {
        let mut values = [0; OutputSignal::COUNT];
        for spec in &TRACKED_SIGNALS {
            values[spec.signal.index()] = port.output(spec.signal) & spec.mask();
        }
        Self { values }
    }

    pub fn get(&self, signal: OutputSignal) -> u32 {
        self.values[signal.index()]
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Returns true if any tracked field differs from `other`.
    pub fn changed_from(&self, other: &SignalSnapshot) -> bool {
        self.values != other.values
    }

    /// Appends every field, each with its column separator, to `out`.
    pub fn render_fields(&self, out: &mut String) {
        for spec in &TRACKED_SIGNALS {
            spec.column.render(out, self.values[spec.signal.index()]);
        }
    }
}

impl Default for SignalSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
