//! Tests for bus read and write transactions against scripted peers.

use marga_sim::{
    BusError, BusPins, BusTransactor, ClockDriver, CollectDiagnostics, Diagnostic, OutputSignal,
    SignalPort, StallPhase,
};

// ============================================================================
// Test Ports
// ============================================================================

/// Read peer: raises `arready` once `arvalid` has been seen for
/// `accept_after` evaluations and `rvalid` after `data_after` more.
struct ScriptedReader {
    pins: BusPins,
    accept_after: u64,
    data_after: u64,
    since_valid: u64,
    data: u32,
}

impl ScriptedReader {
    fn new(accept_after: u64, data_after: u64, data: u32) -> Self {
        Self {
            pins: BusPins::default(),
            accept_after,
            data_after,
            since_valid: 0,
            data,
        }
    }
}

impl SignalPort for ScriptedReader {
    fn pins(&self) -> &BusPins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut BusPins {
        &mut self.pins
    }

    fn output(&self, _signal: OutputSignal) -> u32 {
        0
    }

    fn eval(&mut self) {
        if self.pins.arvalid {
            self.since_valid += 1;
        } else {
            self.since_valid = 0;
        }
        self.pins.arready = self.since_valid >= self.accept_after;
        self.pins.rvalid = self.since_valid >= self.accept_after + self.data_after;
        self.pins.rdata = if self.pins.rvalid { self.data } else { 0 };
    }
}

/// Write peer: raises both ready signals once `awvalid` has been seen for
/// `accept_after` evaluations, and checks the address and data stay put
/// while valid is held.
struct ScriptedWriter {
    pins: BusPins,
    accept_after: u64,
    since_valid: u64,
    held: Option<(u32, u32)>,
    unstable: bool,
    accepted: Vec<(u32, u32)>,
}

impl ScriptedWriter {
    fn new(accept_after: u64) -> Self {
        Self {
            pins: BusPins::default(),
            accept_after,
            since_valid: 0,
            held: None,
            unstable: false,
            accepted: Vec::new(),
        }
    }
}

impl SignalPort for ScriptedWriter {
    fn pins(&self) -> &BusPins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut BusPins {
        &mut self.pins
    }

    fn output(&self, _signal: OutputSignal) -> u32 {
        0
    }

    fn eval(&mut self) {
        let p = &mut self.pins;
        if p.awvalid && p.wvalid {
            let current = (p.awaddr, p.wdata);
            match self.held {
                Some(held) if held != current => self.unstable = true,
                Some(_) => {}
                None => self.held = Some(current),
            }
            self.since_valid += 1;
        } else {
            self.since_valid = 0;
            self.held = None;
        }

        let ready = self.since_valid >= self.accept_after;
        if ready && !p.awready {
            self.accepted.push((p.awaddr, p.wdata));
        }
        p.awready = ready;
        p.wready = ready;
    }
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_read_tick_count() {
    for (accept, data) in [(1, 0), (1, 1), (3, 2), (10, 25)] {
        let clock = ClockDriver::new(ScriptedReader::new(accept, data, 0xdead_beef), 100_000);
        let mut bus = BusTransactor::new(clock);

        assert_eq!(bus.read(0x40).unwrap(), 0xdead_beef);
        assert_eq!(bus.clock().ticks(), accept + data + 4, "accept={accept} data={data}");

        let pins = bus.clock().port().pins();
        assert!(!pins.arvalid);
        assert!(!pins.rready);
        assert_eq!(pins.araddr, 0x40);
    }
}

#[test]
fn test_back_to_back_reads() {
    let clock = ClockDriver::new(ScriptedReader::new(2, 3, 7), 100_000);
    let mut bus = BusTransactor::new(clock);

    for n in 1..=4u64 {
        assert_eq!(bus.read_reg(n as u32).unwrap(), 7);
        assert_eq!(bus.clock().ticks(), n * (2 + 3 + 4));
    }
    assert_eq!(bus.reads(), 4);
    assert_eq!(bus.clock().port().pins().araddr, 16);
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn test_write_tick_count() {
    for accept in [1, 2, 9, 40] {
        let clock = ClockDriver::new(ScriptedWriter::new(accept), 100_000);
        let mut bus = BusTransactor::new(clock);

        bus.write(0x24, 0x0102_0304).unwrap();
        assert_eq!(bus.clock().ticks(), accept + 4, "accept={accept}");

        let port = bus.clock().port();
        assert!(!port.unstable);
        assert_eq!(port.accepted, vec![(0x24, 0x0102_0304)]);
        assert!(!port.pins.awvalid);
        assert!(!port.pins.wvalid);
    }
}

#[test]
fn test_register_write_address() {
    let clock = ClockDriver::new(ScriptedWriter::new(1), 100_000);
    let mut bus = BusTransactor::new(clock);

    bus.write_reg(0, 1).unwrap();
    bus.write_reg(5, 2).unwrap();
    bus.write_reg(15, 3).unwrap();

    assert_eq!(
        bus.clock().port().accepted,
        vec![(0x00, 1), (0x14, 2), (0x3c, 3)]
    );
    assert_eq!(bus.writes(), 3);
}

// ============================================================================
// Stalls and exhaustion
// ============================================================================

#[test]
fn test_slow_read_data_warns() {
    let diags = CollectDiagnostics::new();
    let clock = ClockDriver::new(ScriptedReader::new(1, 45, 3), 100_000);
    let mut bus = BusTransactor::new(clock)
        .with_stall_threshold(20)
        .with_diagnostics(Box::new(diags.clone()));

    assert_eq!(bus.read(0x8).unwrap(), 3);

    // 45 ticks waiting on data cross a threshold of 20 twice
    let events = diags.events();
    assert_eq!(events.len(), 2);
    for event in &events {
        let Diagnostic::SlowHandshake { phase, address, .. } = event;
        assert_eq!(*phase, StallPhase::ReadData);
        assert_eq!(*address, 0x8);
    }
    assert_eq!(bus.export_stats().stall_warnings, 2);
}

#[test]
fn test_slow_write_warns_then_completes() {
    let diags = CollectDiagnostics::new();
    let clock = ClockDriver::new(ScriptedWriter::new(30), 100_000);
    let mut bus = BusTransactor::new(clock)
        .with_stall_threshold(10)
        .with_diagnostics(Box::new(diags.clone()));

    bus.write(0x4, 9).unwrap();

    let events = diags.events();
    assert_eq!(events.len(), 2);
    let Diagnostic::SlowHandshake { phase, time, .. } = events[0];
    assert_eq!(phase, StallPhase::Write);
    // One settle tick plus 11 waiting ticks
    assert_eq!(time, 12 * 5);
    assert!(events[0].to_string().contains("Slow to write to address"));
    assert_eq!(bus.writes(), 1);
}

#[test]
fn test_default_threshold_is_quiet_for_short_waits() {
    let diags = CollectDiagnostics::new();
    let clock = ClockDriver::new(ScriptedReader::new(500, 500, 1), 1_000_000);
    let mut bus = BusTransactor::new(clock).with_diagnostics(Box::new(diags.clone()));

    bus.read(0).unwrap();
    assert!(diags.is_empty());
    assert_eq!(bus.stall_warnings(), 0);
}

#[test]
fn test_exhaustion_mid_transaction() {
    let clock = ClockDriver::new(ScriptedReader::new(100, 0, 1), 200);
    let mut bus = BusTransactor::new(clock);

    match bus.read(0x10) {
        Err(BusError::Exhausted { time }) => assert_eq!(time, 200),
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert_eq!(bus.reads(), 0);
    assert_eq!(bus.clock().ticks(), 40);

    let stats = bus.export_stats();
    assert!(stats.exhausted);
    assert_eq!(stats.final_time, 200);
}
