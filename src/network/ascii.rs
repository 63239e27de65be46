//! ASCII line protocol used by console programs.
//!
//! Words in `0..=255` are characters and `10` ends a line. Any other word is a
//! raw value, typically a program's final answer.

use crate::virtual_machine::isa::Word;
use std::fmt;

pub const NEWLINE: Word = 10;

/// A unit read from a console program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A line of text, without its terminating newline.
    Text(String),
    /// A word outside the ASCII range.
    Value(Word),
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Text(line) => write!(f, "{}", line),
            Frame::Value(value) => write!(f, "{}", value),
        }
    }
}

/// Returns the character for `word` if it is in the ASCII range.
pub fn to_char(word: Word) -> Option<char> {
    u8::try_from(word).ok().map(char::from)
}

/// Encodes `text` one word per byte, followed by a newline.
pub fn encode_line(text: &str) -> Vec<Word> {
    text.bytes()
        .map(Word::from)
        .chain(std::iter::once(NEWLINE))
        .collect()
}

/// Splits a finished output stream into frames.
///
/// Trailing text without a newline becomes a final [`Frame::Text`].
pub fn frames(words: &[Word]) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut line = String::new();

    for &word in words {
        match to_char(word) {
            Some('\n') => frames.push(Frame::Text(std::mem::take(&mut line))),
            Some(c) => line.push(c),
            None => {
                if !line.is_empty() {
                    frames.push(Frame::Text(std::mem::take(&mut line)));
                }
                frames.push(Frame::Value(word));
            }
        }
    }
    if !line.is_empty() {
        frames.push(Frame::Text(line));
    }
    frames
}
