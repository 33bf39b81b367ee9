//! FLM Hardware Simulation
//!
//! Simulation backends for the hardware ports consumed by the control unit:
//! a digital output bank, a 12-bit ADC with injectable per-channel values,
//! and the bus frame latch that models the CAN receive path.
//!
//! All types are `Send + Sync` and internally locked, so an injector (test
//! bench or interrupt-style callback) can feed them while the cyclic tasks
//! read. Critical sections are a handful of loads and stores; nothing here
//! blocks.

pub mod bus;
pub mod sim;

pub use bus::FrameLatch;
pub use sim::{SimAdc, SimDio};
