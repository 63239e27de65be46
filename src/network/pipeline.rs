//! Amplifier pipeline: engines chained output to input.
//!
//! Every engine runs a clone of the same program and is seeded with its phase.
//! With feedback the tail feeds the head, forming a ring; without it the tail
//! feeds a sink. Either way a [`Tap`] on the tail records its last output.

use crate::info;
use crate::network::engine::{Engine, EngineHandle};
use crate::network::port::Port;
use crate::network::transport::{NetworkError, Outbox};
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{VM, VmConfig};
use std::sync::{Arc, Mutex, PoisonError};

/// Outbox on the tail engine that remembers the last value it saw.
#[derive(Clone, Debug, Default)]
pub struct Tap {
    last: Arc<Mutex<Option<Word>>>,
    forward: Option<Port>,
}

impl Tap {
    /// Creates a tap that forwards values to `forward`, or discards them if `None`.
    pub fn new(forward: Option<Port>) -> Self {
        Self {
            last: Arc::default(),
            forward,
        }
    }

    /// Returns the last value delivered, if any.
    pub fn last(&self) -> Option<Word> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Outbox for Tap {
    fn deliver(&self, value: Word) -> bool {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
        match &self.forward {
            Some(port) => port.send(value),
            None => true,
        }
    }

    fn close(&self) {
        if let Some(port) = &self.forward {
            port.close();
        }
    }

    fn pending(&self) -> usize {
        self.forward.as_ref().map_or(0, Port::len)
    }
}

/// A chain of engines running the same program.
#[derive(Clone, Debug)]
pub struct Pipeline {
    program: Program,
    phases: Vec<Word>,
    feedback: bool,
    trace: bool,
}

impl Pipeline {
    pub fn new(program: Program, phases: Vec<Word>) -> Self {
        Self {
            program,
            phases,
            feedback: false,
            trace: false,
        }
    }

    /// Connects the tail back to the head.
    pub fn with_feedback(mut self, feedback: bool) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Injects `signal` into the head and returns the tail's last output.
    ///
    /// Waits for every engine to finish. The first engine fault, in pipeline
    /// order, is returned instead of a value.
    pub async fn run(&self, signal: Word) -> Result<Word, NetworkError> {
        let stages = self.phases.len();
        if stages == 0 {
            return Err(NetworkError::EmptyNetwork);
        }

        // inputs[i] feeds engine i
        let inputs: Vec<Port> = self.phases.iter().map(|&p| Port::with_values([p])).collect();
        inputs[0].send(signal);
        if !self.feedback {
            inputs[0].close();
        }

        let tap = Tap::new(self.feedback.then(|| inputs[0].clone()));
        let handles: Vec<EngineHandle> = (0..stages)
            .map(|i| {
                let vm = self.machine(i);
                match inputs.get(i + 1) {
                    Some(next) => Engine::new(vm, inputs[i].clone(), next.clone()).spawn(),
                    None => Engine::new(vm, inputs[i].clone(), tap.clone()).spawn(),
                }
            })
            .collect();

        info!(
            "pipeline started: {} stages, feedback={}",
            stages, self.feedback
        );

        let mut fault = None;
        for handle in handles {
            if let Err(err) = handle.join().await {
                fault.get_or_insert(err);
            }
        }
        if let Some(err) = fault {
            return Err(err);
        }

        tap.last().ok_or(NetworkError::NoOutput)
    }

    fn machine(&self, id: usize) -> VM {
        let config = VmConfig::new().with_id(id).with_trace(self.trace);
        VM::with_config(self.program.clone(), config)
    }
}
