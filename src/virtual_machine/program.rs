//! Program image: the machine's single, growable address space.
//!
//! [`Program`] holds code and data in one `Vec<Word>`. Any access past the end
//! grows the image to exactly `addr + 1` cells, zero filling the new ones.
//! The image never shrinks.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Word;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Converts a machine word into a memory index.
///
/// Returns [`VMError::OutOfRange`] for negative addresses.
pub fn to_address(addr: Word) -> Result<usize, VMError> {
    usize::try_from(addr).map_err(|_| VMError::OutOfRange { addr })
}

/// Mutable, 0-indexed program image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    cells: Vec<Word>,
}

impl Program {
    /// Creates an image from raw cells.
    pub fn new(cells: Vec<Word>) -> Self {
        Self { cells }
    }

    /// Parses a comma-separated list of signed decimal integers.
    ///
    /// Surrounding whitespace of the whole text and of each token is trimmed.
    pub fn parse(text: &str) -> Result<Self, VMError> {
        text.trim()
            .split(',')
            .enumerate()
            .map(|(index, token)| {
                let token = token.trim();
                token.parse::<Word>().map_err(|_| VMError::ParseError {
                    index,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    /// Reads and parses a program file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, VMError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Returns the current number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the image has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the cells as a slice.
    pub fn as_slice(&self) -> &[Word] {
        &self.cells
    }

    /// Reads the cell at `addr`, growing the image if needed.
    pub fn read(&mut self, addr: Word) -> Result<Word, VMError> {
        let index = to_address(addr)?;
        Ok(*self.cell(index))
    }

    /// Writes `value` at `addr`, growing the image if needed.
    pub fn write(&mut self, addr: Word, value: Word) -> Result<(), VMError> {
        let index = to_address(addr)?;
        *self.cell(index) = value;
        Ok(())
    }

    /// Applies absolute overwrites before execution.
    pub fn patch<I>(&mut self, overrides: I) -> Result<(), VMError>
    where
        I: IntoIterator<Item = (Word, Word)>,
    {
        for (addr, value) in overrides {
            self.write(addr, value)?;
        }
        Ok(())
    }

    /// Builder form of [`Program::patch`].
    pub fn patched<I>(mut self, overrides: I) -> Result<Self, VMError>
    where
        I: IntoIterator<Item = (Word, Word)>,
    {
        self.patch(overrides)?;
        Ok(self)
    }

    /// Returns the cell at an already validated index, growing the image if needed.
    pub(crate) fn cell(&mut self, index: usize) -> &mut Word {
        if index >= self.cells.len() {
            self.cells.resize(index + 1, 0);
        }
        &mut self.cells[index]
    }
}

impl FromStr for Program {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<Word>> for Program {
    fn from(cells: Vec<Word>) -> Self {
        Self::new(cells)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", cell)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn parse_signed_values() {
        let program = Program::parse("1,-2,3,104,1125899906842624\n").unwrap();
        assert_eq!(program.as_slice(), &[1, -2, 3, 104, 1125899906842624]);
    }

    #[test]
    fn parse_trims_tokens() {
        let program: Program = " 1, 2 ,3 ".parse().unwrap();
        assert_eq!(program.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn parse_reports_bad_token() {
        assert_eq!(
            Program::parse("1,x2,3"),
            Err(VMError::ParseError {
                index: 1,
                token: "x2".to_string()
            })
        );
        assert!(matches!(
            Program::parse("1,2,"),
            Err(VMError::ParseError { index: 2, .. })
        ));
        assert!(Program::parse("").is_err());
    }

    #[test]
    fn read_past_end_grows_with_zeros() {
        let mut program = Program::new(vec![7]);
        assert_eq!(program.read(4).unwrap(), 0);
        assert_eq!(program.as_slice(), &[7, 0, 0, 0, 0]);
    }

    #[test]
    fn write_grows_to_exactly_addr_plus_one() {
        let mut program = Program::new(vec![1, 2, 3]);
        program.write(10, 42).unwrap();
        assert_eq!(program.len(), 11);
        assert_eq!(&program.as_slice()[..3], &[1, 2, 3]);
        assert!(program.as_slice()[3..10].iter().all(|&c| c == 0));
        assert_eq!(program.read(10).unwrap(), 42);
    }

    #[test]
    fn write_inside_does_not_grow() {
        let mut program = Program::new(vec![1, 2, 3]);
        program.write(1, 9).unwrap();
        assert_eq!(program.as_slice(), &[1, 9, 3]);
    }

    #[test]
    fn negative_address_is_out_of_range() {
        let mut program = Program::new(vec![1]);
        assert_eq!(program.read(-1), Err(VMError::OutOfRange { addr: -1 }));
        assert_eq!(
            program.write(-5, 0),
            Err(VMError::OutOfRange { addr: -5 })
        );
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn patch_applies_overrides() {
        let overrides: BTreeMap<Word, Word> = [(1, 12), (2, 2)].into_iter().collect();
        let program = Program::parse("1,0,0,3,99")
            .unwrap()
            .patched(overrides)
            .unwrap();
        assert_eq!(program.as_slice(), &[1, 12, 2, 3, 99]);
    }

    #[test]
    fn clone_is_independent() {
        let original = Program::new(vec![1, 2, 3]);
        let mut copy = original.clone();
        copy.write(0, 100).unwrap();
        copy.write(5, 1).unwrap();
        assert_eq!(original.as_slice(), &[1, 2, 3]);
        assert_eq!(copy.len(), 6);
    }

    #[test]
    fn display_round_trips() {
        let text = "109,1,204,-1,99";
        assert_eq!(Program::parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn load_file_reads_program() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3,0,4,0,99").unwrap();
        let program = Program::load_file(file.path()).unwrap();
        assert_eq!(program.as_slice(), &[3, 0, 4, 0, 99]);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Program::load_file(dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, VMError::IoError(_)));
    }
}
