use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Mode, Word};
use crate::virtual_machine::program::{Program, to_address};
use std::fmt;

/// A resolved instruction parameter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// Literal value; never a write target.
    Immediate(Word),
    /// Memory cell index.
    Address(usize),
}

impl Operand {
    /// Returns the value this operand denotes, reading memory for addresses.
    pub fn value(self, program: &mut Program) -> Word {
        match self {
            Operand::Immediate(v) => v,
            Operand::Address(index) => *program.cell(index),
        }
    }

    /// Returns the cell index to write to.
    ///
    /// An immediate operand cannot be a destination and yields
    /// [`VMError::IllegalInstruction`] with `pc: 0`; the caller re-tags it.
    pub fn destination(self) -> Result<usize, VMError> {
        match self {
            Operand::Address(index) => Ok(index),
            Operand::Immediate(v) => Err(VMError::IllegalInstruction {
                word: v,
                pc: 0,
                reason: "immediate-mode destination",
            }),
        }
    }
}

/// Resolves a raw parameter against its mode and the relative base.
///
/// Pure: the same inputs always resolve to the same operand.
pub fn resolve(mode: Mode, raw: Word, relative_base: Word) -> Result<Operand, VMError> {
    match mode {
        Mode::Immediate => Ok(Operand::Immediate(raw)),
        Mode::Position => to_address(raw).map(Operand::Address),
        Mode::Relative => to_address(raw.wrapping_add(relative_base)).map(Operand::Address),
    }
}

/// Raw parameter as it appears in the program, for traces.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RawParam {
    pub mode: Mode,
    pub raw: Word,
}

impl fmt::Display for RawParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mode.sigil(), self.raw)
    }
}
