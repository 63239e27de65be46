use crate::virtual_machine::isa::Word;
use thiserror::Error;

/// Errors that can occur while loading or executing an IntCode program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    /// Program text contains a token that is not a signed decimal integer.
    #[error("malformed token {token:?} at position {index}")]
    ParseError { index: usize, token: String },
    /// A memory access or jump resolved to a negative address.
    #[error("address {addr} out of range")]
    OutOfRange { addr: Word },
    /// The word at `pc` does not decode to an executable instruction.
    #[error("illegal instruction {word} at pc {pc}: {reason}")]
    IllegalInstruction {
        word: Word,
        pc: usize,
        reason: &'static str,
    },
    /// Input was supplied while the machine was not stalled on an INP.
    #[error("machine at pc {pc} is not waiting for input")]
    NotWaitingForInput { pc: usize },
    /// Reading a program file failed.
    #[error("io error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for VMError {
    fn from(err: std::io::Error) -> Self {
        VMError::IoError(err.to_string())
    }
}
