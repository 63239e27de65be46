//! Concurrency harness running IntCode machines as communicating tasks.
//!
//! Engines exchange words through blocking FIFO ports. Three topologies are
//! provided on top of them.
//!
//! - [`transport`]: Inbox/Outbox traits and harness error types
//! - [`port`]: Unbounded FIFO port with async receive and idempotent close
//! - [`engine`]: Async driver for a single machine
//! - [`mux`]: Fan-in and fan-out over several ports
//! - [`pipeline`]: Amplifier chain, optionally closed into a feedback ring
//! - [`console`]: Point-to-point ASCII console around one engine
//! - [`ascii`]: Line encoding and frame decoding for console programs
//! - [`message`]: Packet types and output framing
//! - [`nat`]: Packet network with NAT idle detection

pub mod ascii;
pub mod console;
pub mod engine;
pub mod message;
pub mod mux;
pub mod nat;
pub mod pipeline;
pub mod port;
pub mod transport;
