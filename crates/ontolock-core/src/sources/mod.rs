//! Physical noise source implementations.
//!
//! Only the simulated source ships in this crate: real hardware drivers
//! (SRAM readout, optical capture, serial bridges) are external
//! collaborators behind the same [`crate::source::PufSource`] contract.

pub mod helpers;
pub mod simulated;

pub use simulated::SimulatedPuf;
