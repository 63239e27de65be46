//! Packet types exchanged between network nodes.
//!
//! A node sends a packet as three consecutive outputs `(dest, x, y)` and
//! receives one as two consecutive inputs `x, y`.

use crate::virtual_machine::isa::Word;
use std::fmt;

/// Payload of a network packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Packet {
    pub x: Word,
    pub y: Word,
}

impl Packet {
    pub fn new(x: Word, y: Word) -> Self {
        Self { x, y }
    }

    /// Returns the words delivered to the receiving node, in order.
    pub fn words(&self) -> [Word; 2] {
        [self.x, self.y]
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x={}, y={})", self.x, self.y)
    }
}

/// A packet together with its routing information.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub src: usize,
    pub dest: Word,
    pub packet: Packet,
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.src, self.dest, self.packet)
    }
}

/// Groups a node's output stream into envelopes.
#[derive(Clone, Debug, Default)]
pub struct Framer {
    src: usize,
    partial: Vec<Word>,
}

impl Framer {
    pub fn new(src: usize) -> Self {
        Self {
            src,
            partial: Vec::with_capacity(3),
        }
    }

    /// Adds one output word, returning an envelope once three have arrived.
    pub fn push(&mut self, word: Word) -> Option<Envelope> {
        self.partial.push(word);
        if self.partial.len() < 3 {
            return None;
        }

        let envelope = Envelope {
            src: self.src,
            dest: self.partial[0],
            packet: Packet::new(self.partial[1], self.partial[2]),
        };
        self.partial.clear();
        Some(envelope)
    }

    /// Returns `true` while a packet is partially received.
    pub fn is_mid_packet(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Discards a partially received packet, returning its words.
    pub fn reset(&mut self) -> Vec<Word> {
        std::mem::take(&mut self.partial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framer_emits_every_third_word() {
        let mut framer = Framer::new(4);
        assert_eq!(framer.push(255), None);
        assert!(framer.is_mid_packet());
        assert_eq!(framer.push(-3), None);

        let envelope = framer.push(9).unwrap();
        assert_eq!(
            envelope,
            Envelope {
                src: 4,
                dest: 255,
                packet: Packet::new(-3, 9)
            }
        );
        assert!(!framer.is_mid_packet());
        assert_eq!(envelope.to_string(), "4 -> 255: (x=-3, y=9)");
    }

    #[test]
    fn reset_discards_partial_packet() {
        let mut framer = Framer::new(1);
        framer.push(2);
        framer.push(3);
        assert_eq!(framer.reset(), vec![2, 3]);
        assert!(!framer.is_mid_packet());

        // Framing restarts from the next word.
        framer.push(0);
        framer.push(5);
        assert_eq!(framer.push(6).map(|e| e.packet), Some(Packet::new(5, 6)));
    }

    #[test]
    fn packet_words_are_x_then_y() {
        assert_eq!(Packet::new(1, 2).words(), [1, 2]);
    }
}
