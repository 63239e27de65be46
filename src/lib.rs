//! IntCode library.
//!
//! Provides the IntCode virtual machine, async I/O ports, and the harnesses that
//! wire several machines together (amplifier pipeline, ASCII console, NAT packet network).

pub mod network;
pub mod utils;
pub mod virtual_machine;
