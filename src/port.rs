//! The simulated device's signal interface.
//!
//! A [`SignalPort`] is the boundary between the driver and the hardware
//! model. It exposes the memory-mapped slave bus as a block of plain pin
//! fields ([`BusPins`]), the observable controller outputs addressed by
//! [`OutputSignal`], and a single-step evaluation operation.
//!
//! The driver is the only writer of the input pins; the model is the only
//! writer of the output pins, and only from inside [`SignalPort::eval`].
//! A pin written by the driver becomes visible to the model (and its
//! effect to the driver) after exactly one `eval()`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Address;

/// Pin block of the AXI-lite slave port, clock and reset.
///
/// Field names follow the usual AXI channel naming: `aw*` write address,
/// `w*` write data, `b*` write response, `ar*` read address, `r*` read data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusPins {
    // Driver-owned inputs
    /// Bus clock
    pub aclk: bool,
    /// Active-low reset
    pub aresetn: bool,
    pub awaddr: Address,
    pub awprot: u8,
    pub awvalid: bool,
    pub wdata: u32,
    pub wstrb: u8,
    pub wvalid: bool,
    pub bready: bool,
    pub araddr: Address,
    pub arprot: u8,
    pub arvalid: bool,
    pub rready: bool,
    /// External trigger input
    pub trig_i: bool,

    // Model-owned outputs
    pub awready: bool,
    pub wready: bool,
    pub bvalid: bool,
    pub bresp: u8,
    pub arready: bool,
    pub rdata: u32,
    pub rresp: u8,
    pub rvalid: bool,
}

impl BusPins {
    /// Drives every driver-owned input to its idle level with reset asserted.
    ///
    /// The clock is left high so that the first toggle produces a falling edge.
    pub fn reset_inputs(&mut self) {
        self.aclk = true;
        self.aresetn = false;
        self.awaddr = 0;
        self.awprot = 0;
        self.awvalid = false;
        self.wdata = 0;
        self.wstrb = 0;
        self.wvalid = false;
        self.bready = false;
        self.araddr = 0;
        self.arprot = 0;
        self.arvalid = false;
        self.rready = false;
        self.trig_i = false;
    }
}

/// Observable controller outputs, in log column order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputSignal {
    Tx0I,
    Tx0Q,
    Tx1I,
    Tx1Q,
    FhdoVoutX,
    FhdoVoutY,
    FhdoVoutZ,
    FhdoVoutZ2,
    Ocra1VoutX,
    Ocra1VoutY,
    Ocra1VoutZ,
    Ocra1VoutZ2,
    Rx0Rate,
    Rx1Rate,
    Rx0RateValid,
    Rx1RateValid,
    Rx0RstN,
    Rx1RstN,
    Rx0En,
    Rx1En,
    TxGate,
    RxGate,
    Trig,
    Leds,
}

impl OutputSignal {
    /// Number of observable outputs.
    pub const COUNT: usize = 24;

    /// All outputs in column order.
    pub const ALL: [OutputSignal; Self::COUNT] = [
        OutputSignal::Tx0I,
        OutputSignal::Tx0Q,
        OutputSignal::Tx1I,
        OutputSignal::Tx1Q,
        OutputSignal::FhdoVoutX,
        OutputSignal::FhdoVoutY,
        OutputSignal::FhdoVoutZ,
        OutputSignal::FhdoVoutZ2,
        OutputSignal::Ocra1VoutX,
        OutputSignal::Ocra1VoutY,
        OutputSignal::Ocra1VoutZ,
        OutputSignal::Ocra1VoutZ2,
        OutputSignal::Rx0Rate,
        OutputSignal::Rx1Rate,
        OutputSignal::Rx0RateValid,
        OutputSignal::Rx1RateValid,
        OutputSignal::Rx0RstN,
        OutputSignal::Rx1RstN,
        OutputSignal::Rx0En,
        OutputSignal::Rx1En,
        OutputSignal::TxGate,
        OutputSignal::RxGate,
        OutputSignal::Trig,
        OutputSignal::Leds,
    ];

    /// Position of this output in column order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// HDL name of the output port.
    pub fn name(self) -> &'static str {
        match self {
            OutputSignal::Tx0I => "tx0_i",
            OutputSignal::Tx0Q => "tx0_q",
            OutputSignal::Tx1I => "tx1_i",
            OutputSignal::Tx1Q => "tx1_q",
            OutputSignal::FhdoVoutX => "fhdo_voutx",
            OutputSignal::FhdoVoutY => "fhdo_vouty",
            OutputSignal::FhdoVoutZ => "fhdo_voutz",
            OutputSignal::FhdoVoutZ2 => "fhdo_voutz2",
            OutputSignal::Ocra1VoutX => "ocra1_voutx",
            OutputSignal::Ocra1VoutY => "ocra1_vouty",
            OutputSignal::Ocra1VoutZ => "ocra1_voutz",
            OutputSignal::Ocra1VoutZ2 => "ocra1_voutz2",
            OutputSignal::Rx0Rate => "rx0_rate",
            OutputSignal::Rx1Rate => "rx1_rate",
            OutputSignal::Rx0RateValid => "rx0_rate_valid",
            OutputSignal::Rx1RateValid => "rx1_rate_valid",
            OutputSignal::Rx0RstN => "rx0_rst_n_o",
            OutputSignal::Rx1RstN => "rx1_rst_n_o",
            OutputSignal::Rx0En => "rx0_en_o",
            OutputSignal::Rx1En => "rx1_en_o",
            OutputSignal::TxGate => "tx_gate_o",
            OutputSignal::RxGate => "rx_gate_o",
            OutputSignal::Trig => "trig_o",
            OutputSignal::Leds => "leds_o",
        }
    }
}

impl fmt::Display for OutputSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The hardware model as seen by the driver.
///
/// Implementors are typically thin wrappers over a generated RTL model; the
/// crate ships a behavioral register-file model in [`crate::models`].
pub trait SignalPort {
    /// Read access to the bus pin block.
    fn pins(&self) -> &BusPins;

    /// Write access to the bus pin block.
    ///
    /// Only driver-owned inputs should be written through this handle.
    fn pins_mut(&mut self) -> &mut BusPins;

    /// Current value of an observable output.
    fn output(&self, signal: OutputSignal) -> u32;

    /// Evaluates the model for one step with the current input pins.
    fn eval(&mut self);

    /// Called once when the driver releases the model.
    fn finish(&mut self) {}
}

impl<P: SignalPort + ?Sized> SignalPort for Box<P> {
    fn pins(&self) -> &BusPins {
        (**self).pins()
    }

    fn pins_mut(&mut self) -> &mut BusPins {
        (**self).pins_mut()
    }

    fn output(&self, signal: OutputSignal) -> u32 {
        (**self).output(signal)
    }

    fn eval(&mut self) {
        (**self).eval()
    }

    fn finish(&mut self) {
        (**self).finish()
    }
}
