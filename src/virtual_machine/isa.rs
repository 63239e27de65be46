//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_instruction!`](crate::for_each_instruction) macro holds the
//! canonical instruction list and invokes a callback macro for code generation,
//! so opcode numbers, mnemonics and parameter layouts are written down once.
//!
//! This module generates:
//! - The [`Opcode`] enum with numeric codes
//! - `TryFrom<Word>` for decoding opcodes
//! - Mnemonic and parameter-layout lookups
//!
//! # Instruction word format
//!
//! An instruction word is a non-negative decimal number `MMMOO`:
//! - `OO`: the two low digits are the opcode
//! - `MMM`: one mode digit per parameter, least significant first
//!   (`0` position, `1` immediate, `2` relative); missing digits mean position
//!
//! Parameters are the words that immediately follow the instruction word.

use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Machine word. Programs use values beyond 32-bit range.
pub type Word = i64;

/// Maximum number of parameters any instruction takes.
pub const MAX_PARAMS: usize = 3;

/// Invokes a callback macro with the complete instruction definition list.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// ADD a, b, dst ; dst = a + b
            Add = 1, "ADD" => [a: Src, b: Src, dst: Dst],
            /// MUL a, b, dst ; dst = a * b
            Mul = 2, "MUL" => [a: Src, b: Src, dst: Dst],
            /// INP dst ; dst = next input value
            Inp = 3, "INP" => [dst: Dst],
            /// OUT a ; emit a
            Out = 4, "OUT" => [a: Src],
            /// JIT a, target ; if a != 0 then PC = target
            Jit = 5, "JIT" => [a: Src, target: Src],
            /// JIF a, target ; if a == 0 then PC = target
            Jif = 6, "JIF" => [a: Src, target: Src],
            /// LT a, b, dst ; dst = (a < b) as 1 or 0
            Lt = 7, "LT" => [a: Src, b: Src, dst: Dst],
            /// EQ a, b, dst ; dst = (a == b) as 1 or 0
            Eq = 8, "EQ" => [a: Src, b: Src, dst: Dst],
            /// RBO a ; relative_base += a
            Rbo = 9, "RBO" => [a: Src],
            /// HLT ; stop the machine
            Hlt = 99, "HLT" => [],
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// Operation selected by the two low digits of an instruction word.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<Word> for Opcode {
            type Error = VMError;

            fn try_from(value: Word) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VMError::IllegalInstruction {
                        word: value,
                        pc: 0,
                        reason: "unknown opcode",
                    }),
                }
            }
        }

        impl Opcode {
            /// Returns the mnemonic used in traces.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the numeric opcode.
            pub const fn code(&self) -> Word {
                match self {
                    $( Opcode::$name => $opcode, )*
                }
            }

            /// Returns whether each parameter is read from or written to.
            pub const fn params(&self) -> &'static [ParamKind] {
                match self {
                    $( Opcode::$name => &[$( ParamKind::$kind ),*], )*
                }
            }

            /// Returns the number of parameter words following the instruction word.
            pub const fn arity(&self) -> usize {
                self.params().len()
            }
        }
    };
}

/// Role of a parameter within an instruction.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ParamKind {
    /// Read operand; any mode.
    Src,
    /// Write target; position or relative mode only.
    Dst,
}

for_each_instruction!(define_instructions);

/// Parameter addressing mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Mode {
    /// The parameter is an absolute address.
    #[default]
    Position,
    /// The parameter is the value itself.
    Immediate,
    /// The parameter is an offset from the relative base.
    Relative,
}

impl Mode {
    /// Prefix used for this mode in traces.
    pub const fn sigil(&self) -> &'static str {
        match self {
            Mode::Position => "$",
            Mode::Immediate => "",
            Mode::Relative => ".",
        }
    }
}

impl TryFrom<Word> for Mode {
    type Error = VMError;

    fn try_from(digit: Word) -> Result<Self, Self::Error> {
        match digit {
            0 => Ok(Mode::Position),
            1 => Ok(Mode::Immediate),
            2 => Ok(Mode::Relative),
            _ => Err(VMError::IllegalInstruction {
                word: digit,
                pc: 0,
                reason: "unknown parameter mode",
            }),
        }
    }
}

/// A decoded instruction word.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub modes: [Mode; MAX_PARAMS],
}

impl Instruction {
    /// Returns the number of words this instruction occupies, including itself.
    pub const fn width(&self) -> usize {
        1 + self.opcode.arity()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode.mnemonic())?;
        for mode in &self.modes[..self.opcode.arity()] {
            write!(f, " {:?}", mode)?;
        }
        Ok(())
    }
}

/// Splits an instruction word into its opcode and parameter modes.
///
/// Mode digits are only checked for parameters the opcode actually takes;
/// unused slots and digits above the third mode are ignored. Errors carry
/// `pc: 0` and are re-tagged by the caller.
pub fn decode(word: Word) -> Result<Instruction, VMError> {
    let illegal = |reason| VMError::IllegalInstruction {
        word,
        pc: 0,
        reason,
    };

    if word < 0 {
        return Err(illegal("negative instruction word"));
    }

    let opcode = Opcode::try_from(word % 100).map_err(|_| illegal("unknown opcode"))?;

    let mut modes = [Mode::Position; MAX_PARAMS];
    let mut digits = word / 100;
    for mode in modes.iter_mut().take(opcode.arity()) {
        *mode = Mode::try_from(digits % 10).map_err(|_| illegal("unknown parameter mode"))?;
        digits /= 10;
    }

    Ok(Instruction { opcode, modes })
}
