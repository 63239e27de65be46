//! IntCode virtual machine.
//!
//! # Architecture
//!
//! - **Memory**: a single growable image of signed 64-bit words holding code and data
//! - **Instruction format**: decimal words `MMMOO` (two-digit opcode, one mode digit
//!   per parameter) followed by their parameters
//! - **Addressing**: position, immediate and relative (offset from the relative base)
//! - **Execution model**: synchronous single-step core; input is staged by the caller
//!   so the same machine runs under a plain loop or an async driver
//!
//! # Modules
//!
//! - [`errors`]: Load and execution error types
//! - [`isa`]: Instruction set definition and decoder
//! - [`operand`]: Parameter resolution
//! - [`program`]: Program image, parsing and patching
//! - [`vm`]: Core virtual machine and its configuration

pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod operand;
pub mod program;
pub mod vm;
