//! Tests for the change-triggered event log.

use std::cell::Cell;
use std::io::{self, Write};
use std::rc::Rc;

use marga_sim::logger::{column_hint, header_line};
use marga_sim::{BusPins, EventLogger, OutputSignal, SharedBuffer, SignalPort};

// ============================================================================
// Test Port
// ============================================================================

/// Outputs set directly by the test.
struct Outputs {
    pins: BusPins,
    values: [u32; OutputSignal::COUNT],
}

impl Outputs {
    /// All outputs at their idle level, which differs from the logger's
    /// initial snapshot only in `ocra1_vz2`.
    fn idle() -> Self {
        Self {
            pins: BusPins::default(),
            values: [0; OutputSignal::COUNT],
        }
    }

    fn set(&mut self, signal: OutputSignal, value: u32) {
        self.values[signal.index()] = value;
    }
}

impl SignalPort for Outputs {
    fn pins(&self) -> &BusPins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut BusPins {
        &mut self.pins
    }

    fn output(&self, signal: OutputSignal) -> u32 {
        self.values[signal.index()]
    }

    fn eval(&mut self) {}
}

/// Writer that fails while `failing` is set.
#[derive(Clone, Default)]
struct FlakyWriter {
    inner: SharedBuffer,
    failing: Rc<Cell<bool>>,
}

impl Write for FlakyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failing.get() {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn records(buf: &SharedBuffer) -> Vec<String> {
    buf.lines().into_iter().filter(|l| !l.starts_with('#')).collect()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_first_observation_is_logged() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let port = Outputs::idle();

    assert!(logger.observe(0, &port).unwrap());
    assert_eq!(logger.records_written(), 1);
}

#[test]
fn test_unchanged_state_not_logged() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let port = Outputs::idle();

    logger.observe(10, &port).unwrap();
    let lines = buf.lines().len();

    for time in (20..2000).step_by(10) {
        assert!(!logger.observe(time, &port).unwrap());
    }
    assert_eq!(buf.lines().len(), lines);
    assert_eq!(logger.records_written(), 1);
}

#[test]
fn test_any_single_change_logs_full_state() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let mut port = Outputs::idle();
    logger.observe(0, &port).unwrap();

    for (n, signal) in OutputSignal::ALL.iter().enumerate() {
        port.set(*signal, 1);
        assert!(logger.observe(10 * (n as u64 + 1), &port).unwrap(), "{}", signal);
        assert_eq!(logger.records_written(), n as u64 + 2);

        let last = records(&buf).pop().unwrap();
        let fields: Vec<&str> = last.split(',').map(str::trim).collect();
        assert_eq!(fields.len(), OutputSignal::COUNT + 1);
        assert_eq!(fields[signal.index() + 1], "1");
    }
}

#[test]
fn test_values_outside_width_ignored() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let mut port = Outputs::idle();
    logger.observe(0, &port).unwrap();

    // Bit 16 is beyond tx0_i's 16-bit width
    port.set(OutputSignal::Tx0I, 0x1_0000);
    assert!(!logger.observe(10, &port).unwrap());
}

#[test]
fn test_hint_before_every_fifteenth_record() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let mut port = Outputs::idle();

    for n in 0..31u32 {
        port.set(OutputSignal::Leds, n);
        port.set(OutputSignal::Ocra1VoutZ2, 1);
        assert!(logger.observe(u64::from(n) * 10, &port).unwrap());
    }

    let lines = buf.lines();
    assert_eq!(lines.len(), 1 + 3 + 31);
    assert_eq!(lines[0], header_line());
    let hints: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.as_str() == column_hint())
        .map(|(i, _)| i)
        .collect();
    // Before records 1, 16 and 31
    assert_eq!(hints, vec![1, 17, 33]);
}

#[test]
fn test_custom_header_interval() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap().with_header_interval(2);
    let mut port = Outputs::idle();

    for n in 0..4u32 {
        port.set(OutputSignal::Trig, n % 2);
        logger.observe(u64::from(n), &port).unwrap();
    }

    let hint_count = buf.lines().iter().filter(|l| l.as_str() == column_hint()).count();
    assert_eq!(hint_count, 2);
}

#[test]
fn test_cycle_column_is_half_time() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let mut port = Outputs::idle();

    for (n, time) in [0u64, 5, 1_000, 123_457].into_iter().enumerate() {
        port.set(OutputSignal::Leds, n as u32 + 1);
        logger.observe(time, &port).unwrap();
    }

    let cycles: Vec<u64> = records(&buf)
        .iter()
        .map(|r| r.split(',').next().unwrap().trim().parse().unwrap())
        .collect();
    assert_eq!(cycles, vec![0, 2, 500, 61_728]);
}

#[test]
fn test_legacy_cycle_divisor() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone())
        .unwrap()
        .with_time_units_per_cycle(10);
    logger.observe(12_345, &Outputs::idle()).unwrap();

    let record = records(&buf).pop().unwrap();
    assert!(record.starts_with("    1234,"));
}

#[test]
fn test_exact_record_format() {
    let buf = SharedBuffer::new();
    let mut logger = EventLogger::new(buf.clone()).unwrap();
    let mut port = Outputs::idle();

    let values = [
        (OutputSignal::Tx0I, 1234),
        (OutputSignal::Tx0Q, 65535),
        (OutputSignal::Tx1Q, 7),
        (OutputSignal::FhdoVoutX, 100),
        (OutputSignal::FhdoVoutY, 200),
        (OutputSignal::FhdoVoutZ, 300),
        (OutputSignal::FhdoVoutZ2, 400),
        (OutputSignal::Ocra1VoutX, 0xfffff),
        (OutputSignal::Ocra1VoutZ, 5),
        (OutputSignal::Ocra1VoutZ2, 12),
        (OutputSignal::Rx0Rate, 9999),
        (OutputSignal::Rx1Rate, 12345),
        (OutputSignal::Rx0RateValid, 1),
        (OutputSignal::Rx0RstN, 1),
        (OutputSignal::Rx0En, 1),
        (OutputSignal::TxGate, 1),
        (OutputSignal::Trig, 1),
        (OutputSignal::Leds, 255),
    ];
    for (signal, value) in values {
        port.set(signal, value);
    }
    logger.observe(100, &port).unwrap();

    assert_eq!(
        buf.contents(),
        format!(
            "{}\n{}\n{}\n",
            header_line(),
            column_hint(),
            "      50,  1234, 65535,     0,     7,   100,   200,   300,   400, \
             1048575,      0,      5,     12, 9999,12345, 1, 0, 1, 0, 1, 0, 1, 0, 1, 255"
        )
    );
}

#[test]
fn test_failed_write_is_retried() {
    let writer = FlakyWriter::default();
    let mut logger = EventLogger::new(writer.clone()).unwrap();
    let mut port = Outputs::idle();
    logger.observe(0, &port).unwrap();

    port.set(OutputSignal::Leds, 7);
    writer.failing.set(true);
    assert!(logger.observe(10, &port).is_err());
    assert_eq!(logger.records_written(), 1);
    assert_eq!(logger.last_logged().get(OutputSignal::Leds), 0);

    writer.failing.set(false);
    assert!(logger.observe(20, &port).unwrap());
    assert_eq!(logger.records_written(), 2);

    let logged = records(&writer.inner);
    assert_eq!(logged.len(), 2);
    assert!(logged[1].starts_with("      10,"));
    assert_eq!(logged[1].rsplit(',').next().unwrap().trim(), "7");

    // Nothing changed since the retried record
    assert!(!logger.observe(30, &port).unwrap());
}

#[test]
fn test_hint_retried_with_failed_first_record() {
    let writer = FlakyWriter::default();
    let mut logger = EventLogger::new(writer.clone()).unwrap();
    let port = Outputs::idle();

    writer.failing.set(true);
    assert!(logger.observe(0, &port).is_err());
    writer.failing.set(false);
    assert!(logger.observe(10, &port).unwrap());

    let lines = writer.inner.lines();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], column_hint());
}

#[test]
fn test_last_logged_tracks_record() {
    let mut logger = EventLogger::new(Vec::new()).unwrap();
    let mut port = Outputs::idle();
    port.set(OutputSignal::Rx1Rate, 42);

    logger.observe(0, &port).unwrap();
    assert_eq!(logger.last_logged().get(OutputSignal::Rx1Rate), 42);
    assert_eq!(logger.last_logged().get(OutputSignal::Ocra1VoutZ2), 0);
}

#[test]
fn test_create_file_backed_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.csv");

    let mut logger = EventLogger::create(&path).unwrap();
    let mut port = Outputs::idle();
    logger.observe(0, &port).unwrap();
    port.set(OutputSignal::RxGate, 1);
    logger.observe(10, &port).unwrap();
    logger.flush().unwrap();
    drop(logger);

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], header_line());
    assert_eq!(lines[1], column_hint());
    assert!(lines[3].starts_with("       5,"));
}

#[test]
fn test_create_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.csv");
    std::fs::write(&path, "stale contents\nfrom an older run\n").unwrap();

    let mut logger = EventLogger::create(&path).unwrap();
    logger.flush().unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, format!("{}\n", header_line()));
}
