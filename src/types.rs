//! Core type definitions for the simulation driver.
//!
//! This module defines the fundamental types and constants shared by the
//! clock, bus and logging layers.

/// Simulation time unit.
///
/// Time is a purely logical counter: it advances by [`TICK_STEP`] on every
/// clock toggle and never decreases. With the default step one full clock
/// cycle spans 10 units, i.e. nanoseconds for a 100 MHz clock.
pub type SimTime = u64;

/// Byte address into the simulated peripheral's register file.
///
/// Addresses are relative to the slave's own memory space: register 0 lives
/// at `0x0`, register 1 at `0x4`, and so on.
pub type Address = u32;

/// Word index of a slave register.
pub type RegisterIndex = u32;

/// Time advanced by a single clock toggle.
pub const TICK_STEP: SimTime = 5;

/// Default ceiling after which the clock refuses to tick.
pub const DEFAULT_MAX_SIM_TIME: SimTime = 200_000_000;

/// Number of bytes between consecutive slave registers.
pub const REGISTER_STRIDE: Address = 4;

/// Returns the bus address of slave register `index`, or `None` if it lies
/// beyond the 32-bit address space.
pub fn register_address(index: RegisterIndex) -> Option<Address> {
    index.checked_mul(REGISTER_STRIDE)
}
