//! Behavioral hardware models.
//!
//! These models implement [`SignalPort`](crate::port::SignalPort) without an
//! RTL backend. They are useful for exercising the driver end to end and as
//! references for wrapping a generated model.
//!
//! # Available Models
//!
//! - [`RegisterFileModel`] - AXI-lite register file with configurable
//!   handshake latency, mirroring registers onto the controller outputs

pub mod regfile;

pub use regfile::{LatencyProfile, RegisterFileModel, REGISTER_COUNT};
