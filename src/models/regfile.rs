//! AXI-lite register-file model.
//!
//! The `RegisterFileModel` answers bus transactions on rising clock edges
//! with a configurable number of wait cycles, and drives the controller
//! outputs straight from its registers:
//!
//! | Register | Outputs |
//! |---|---|
//! | 0 | `tx0_i` (bits 15:0), `tx0_q` (31:16) |
//! | 1 | `tx1_i`, `tx1_q` |
//! | 2 | `fhdo_voutx`, `fhdo_vouty` |
//! | 3 | `fhdo_voutz`, `fhdo_voutz2` |
//! | 4-7 | `ocra1_voutx` .. `ocra1_voutz2` (bits 19:0) |
//! | 8 | `rx0_rate`, `rx1_rate` |
//! | 9 | rate-valid, reset-n and enable flags, bits 0-5 |
//! | 10 | `tx_gate` (0), `rx_gate` (1), `trig` (2), `leds` (15:8) |
//! | 11-15 | scratch |

use crate::port::{BusPins, OutputSignal, SignalPort};
use crate::types::{Address, REGISTER_STRIDE};

/// Number of registers in the file.
pub const REGISTER_COUNT: usize = 16;

const RESP_OKAY: u8 = 0b00;
const RESP_SLVERR: u8 = 0b10;

/// Register indices.
pub mod reg {
    pub const TX0: usize = 0;
    pub const TX1: usize = 1;
    pub const FHDO_XY: usize = 2;
    pub const FHDO_ZZ2: usize = 3;
    pub const OCRA1_X: usize = 4;
    pub const OCRA1_Y: usize = 5;
    pub const OCRA1_Z: usize = 6;
    pub const OCRA1_Z2: usize = 7;
    pub const RX_RATE: usize = 8;
    pub const RX_CTRL: usize = 9;
    pub const GPIO: usize = 10;
}

/// Handshake wait cycles, counted in rising clock edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LatencyProfile {
    /// Edges a valid address waits before ready is raised
    pub accept: u32,
    /// Edges between read address acceptance and read data valid
    pub data: u32,
}

impl LatencyProfile {
    pub fn new(accept: u32, data: u32) -> Self {
        Self { accept, data }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReadState {
    Idle { waited: u32 },
    Fetch { address: Address, remaining: u32 },
    Valid,
}

/// Behavioral AXI-lite slave backed by a register file.
#[derive(Clone, Debug)]
pub struct RegisterFileModel {
    pins: BusPins,
    regs: [u32; REGISTER_COUNT],
    latency: LatencyProfile,
    prev_clk: bool,
    read_state: ReadState,
    write_waited: u32,
    write_taken: bool,
    /// Accepted writes in order, as (address, data)
    write_log: Vec<(Address, u32)>,
    evals: u64,
    finished: bool,
}

impl RegisterFileModel {
    /// Creates a model that accepts every handshake on the first edge.
    pub fn new() -> Self {
        Self::with_latency(LatencyProfile::default())
    }

    pub fn with_latency(latency: LatencyProfile) -> Self {
        Self {
            pins: BusPins::default(),
            regs: [0; REGISTER_COUNT],
            latency,
            prev_clk: false,
            read_state: ReadState::Idle { waited: 0 },
            write_waited: 0,
            write_taken: false,
            write_log: Vec::new(),
            evals: 0,
            finished: false,
        }
    }

    /// Current value of register `index`.
    pub fn register(&self, index: usize) -> Option<u32> {
        self.regs.get(index).copied()
    }

    /// Sets register `index` directly, bypassing the bus.
    pub fn set_register(&mut self, index: usize, value: u32) {
        if let Some(slot) = self.regs.get_mut(index) {
            *slot = value;
        }
    }

    pub fn write_log(&self) -> &[(Address, u32)] {
        &self.write_log
    }

    /// Number of evaluation steps performed.
    pub fn evals(&self) -> u64 {
        self.evals
    }

    /// Returns true once the driver has released the model.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn decode(address: Address) -> Option<usize> {
        if address % REGISTER_STRIDE != 0 {
            return None;
        }
        let index = (address / REGISTER_STRIDE) as usize;
        (index < REGISTER_COUNT).then_some(index)
    }

    fn reset(&mut self) {
        let p = &mut self.pins;
        p.awready = false;
        p.wready = false;
        p.bvalid = false;
        p.bresp = RESP_OKAY;
        p.arready = false;
        p.rvalid = false;
        p.rdata = 0;
        p.rresp = RESP_OKAY;
        self.regs = [0; REGISTER_COUNT];
        self.read_state = ReadState::Idle { waited: 0 };
        self.write_waited = 0;
        self.write_taken = false;
    }

    fn rising_edge(&mut self) {
        if !self.pins.aresetn {
            self.reset();
            return;
        }
        self.write_channel();
        self.read_channel();
    }

    fn write_channel(&mut self) {
        // Response completes on the edge after it was raised
        if self.pins.bvalid && self.pins.bready {
            self.pins.bvalid = false;
        }

        if self.pins.awready {
            self.pins.awready = false;
            self.pins.wready = false;
        } else if self.pins.awvalid && self.pins.wvalid && !self.write_taken {
            if self.write_waited >= self.latency.accept {
                let (address, data) = (self.pins.awaddr, self.pins.wdata);
                let resp = match Self::decode(address) {
                    Some(index) => {
                        self.regs[index] = data;
                        RESP_OKAY
                    }
                    None => RESP_SLVERR,
                };
                self.write_log.push((address, data));
                self.write_taken = true;
                self.pins.awready = true;
                self.pins.wready = true;
                self.pins.bvalid = true;
                self.pins.bresp = resp;
            } else {
                self.write_waited += 1;
            }
        }

        if !self.pins.awvalid {
            self.write_taken = false;
            self.write_waited = 0;
        }
    }

    fn read_channel(&mut self) {
        let state = self.read_state;
        self.read_state = match state {
            ReadState::Idle { waited } => {
                if !self.pins.arvalid {
                    ReadState::Idle { waited: 0 }
                } else if waited >= self.latency.accept {
                    self.pins.arready = true;
                    let address = self.pins.araddr;
                    if self.latency.data == 0 {
                        self.present(address);
                        ReadState::Valid
                    } else {
                        ReadState::Fetch { address, remaining: self.latency.data }
                    }
                } else {
                    ReadState::Idle { waited: waited + 1 }
                }
            }
            ReadState::Fetch { address, remaining } => {
                self.pins.arready = false;
                if remaining <= 1 {
                    self.present(address);
                    ReadState::Valid
                } else {
                    ReadState::Fetch { address, remaining: remaining - 1 }
                }
            }
            ReadState::Valid => {
                self.pins.arready = false;
                if self.pins.rready {
                    self.pins.rvalid = false;
                    ReadState::Idle { waited: 0 }
                } else {
                    ReadState::Valid
                }
            }
        };
    }

    fn present(&mut self, address: Address) {
        let (data, resp) = match Self::decode(address) {
            Some(index) => (self.regs[index], RESP_OKAY),
            None => (0, RESP_SLVERR),
        };
        self.pins.rvalid = true;
        self.pins.rdata = data;
        self.pins.rresp = resp;
    }
}

impl Default for RegisterFileModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalPort for RegisterFileModel {
    fn pins(&self) -> &BusPins {
        &self.pins
    }

    fn pins_mut(&mut self) -> &mut BusPins {
        &mut self.pins
    }

    fn output(&self, signal: OutputSignal) -> u32 {
        let lo = |r: usize| self.regs[r] & 0xffff;
        let hi = |r: usize| self.regs[r] >> 16;
        let bit = |r: usize, b: u32| (self.regs[r] >> b) & 1;
        match signal {
            OutputSignal::Tx0I => lo(reg::TX0),
            OutputSignal::Tx0Q => hi(reg::TX0),
            OutputSignal::Tx1I => lo(reg::TX1),
            OutputSignal::Tx1Q => hi(reg::TX1),
            OutputSignal::FhdoVoutX => lo(reg::FHDO_XY),
            OutputSignal::FhdoVoutY => hi(reg::FHDO_XY),
            OutputSignal::FhdoVoutZ => lo(reg::FHDO_ZZ2),
            OutputSignal::FhdoVoutZ2 => hi(reg::FHDO_ZZ2),
            OutputSignal::Ocra1VoutX => self.regs[reg::OCRA1_X] & 0xfffff,
            OutputSignal::Ocra1VoutY => self.regs[reg::OCRA1_Y] & 0xfffff,
            OutputSignal::Ocra1VoutZ => self.regs[reg::OCRA1_Z] & 0xfffff,
            OutputSignal::Ocra1VoutZ2 => self.regs[reg::OCRA1_Z2] & 0xfffff,
            OutputSignal::Rx0Rate => lo(reg::RX_RATE),
            OutputSignal::Rx1Rate => hi(reg::RX_RATE),
            OutputSignal::Rx0RateValid => bit(reg::RX_CTRL, 0),
            OutputSignal::Rx1RateValid => bit(reg::RX_CTRL, 1),
            OutputSignal::Rx0RstN => bit(reg::RX_CTRL, 2),
            OutputSignal::Rx1RstN => bit(reg::RX_CTRL, 3),
            OutputSignal::Rx0En => bit(reg::RX_CTRL, 4),
            OutputSignal::Rx1En => bit(reg::RX_CTRL, 5),
            OutputSignal::TxGate => bit(reg::GPIO, 0),
            OutputSignal::RxGate => bit(reg::GPIO, 1),
            OutputSignal::Trig => bit(reg::GPIO, 2),
            OutputSignal::Leds => (self.regs[reg::GPIO] >> 8) & 0xff,
        }
    }

    fn eval(&mut self) {
        self.evals += 1;
        let clk = self.pins.aclk;
        if clk && !self.prev_clk {
            self.rising_edge();
        }
        self.prev_clk = clk;
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
