//! Point-to-point console: one engine talking to a driver over two ports.

use crate::network::ascii::{self, Frame, NEWLINE};
use crate::network::engine::{Engine, EngineHandle};
use crate::network::port::Port;
use crate::network::transport::NetworkError;
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{VM, VmConfig};

/// Driver side of a single running engine.
pub struct Console {
    input: Port,
    output: Port,
    engine: EngineHandle,
    /// Non-ASCII word read while a line was in progress.
    held: Option<Word>,
}

impl Console {
    /// Spawns an engine running `program`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(program: Program, config: VmConfig) -> Self {
        let input = Port::new();
        let output = Port::new();
        let vm = VM::with_config(program, config);
        let engine = Engine::new(vm, input.clone(), output.clone()).spawn();

        Self {
            input,
            output,
            engine,
            held: None,
        }
    }

    /// Returns a handle to the engine's input, for feeding it from another task.
    pub fn input(&self) -> Port {
        self.input.clone()
    }

    /// Sends one word to the engine.
    ///
    /// Returns `false` if the input was already closed.
    pub fn write(&self, value: Word) -> bool {
        self.input.send(value)
    }

    /// Sends `text` as ASCII followed by a newline.
    pub fn write_line(&self, text: &str) -> bool {
        ascii::encode_line(text)
            .into_iter()
            .all(|word| self.input.send(word))
    }

    /// Receives the next word, or `None` once the engine has finished.
    pub async fn read(&mut self) -> Option<Word> {
        match self.held.take() {
            Some(word) => Some(word),
            None => self.output.recv().await,
        }
    }

    /// Receives the next line of text or raw value.
    ///
    /// A line cut short by a raw value is returned first; the value follows
    /// on the next call. Returns `None` once the engine has finished.
    pub async fn read_line(&mut self) -> Option<Frame> {
        let mut line = String::new();

        loop {
            let Some(word) = self.read().await else {
                return (!line.is_empty()).then_some(Frame::Text(line));
            };

            if word == NEWLINE {
                return Some(Frame::Text(line));
            }
            match ascii::to_char(word) {
                Some(c) => line.push(c),
                None if line.is_empty() => return Some(Frame::Value(word)),
                None => {
                    self.held = Some(word);
                    return Some(Frame::Text(line));
                }
            }
        }
    }

    /// Returns `true` while the engine waits for input with its output drained.
    pub fn is_idle(&self) -> bool {
        self.held.is_none() && self.engine.is_idle()
    }

    /// Closes the engine's input and waits for it to finish.
    pub async fn shutdown(self) -> Result<VM, NetworkError> {
        self.input.close();
        self.engine.join().await
    }

    /// Waits for the engine to finish on its own.
    pub async fn wait(self) -> Result<VM, NetworkError> {
        self.engine.join().await
    }
}
