//! Async driver connecting a [`VM`] to an [`Inbox`] and an [`Outbox`].
//!
//! The engine awaits only when the machine needs input. Outputs are delivered
//! without blocking, and the output is closed on every exit path so that
//! downstream consumers always observe end of transmission.

use crate::error;
use crate::network::transport::{Inbox, NetworkError, Outbox};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::{Step, VM};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Steps executed between voluntary yields to the scheduler.
const YIELD_EVERY: u64 = 4096;

/// A machine bound to its input and output.
pub struct Engine<I, O> {
    vm: VM,
    input: I,
    output: O,
    waiting: Arc<AtomicBool>,
}

/// Closes the output when dropped, including on cancellation.
struct CloseOnDrop<'a, O: Outbox>(&'a O);

impl<O: Outbox> Drop for CloseOnDrop<'_, O> {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl<I: Inbox, O: Outbox> Engine<I, O> {
    pub fn new(vm: VM, input: I, output: O) -> Self {
        Self {
            vm,
            input,
            output,
            waiting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> usize {
        self.vm.config().id
    }

    /// Runs the machine until it halts, its input ends, or it faults.
    ///
    /// Returns the final machine so callers can inspect memory.
    pub async fn run(self) -> Result<VM, VMError> {
        let Engine {
            mut vm,
            input,
            output,
            waiting,
        } = self;
        let _closer = CloseOnDrop(&output);

        match drive(&mut vm, &input, &output, &waiting).await {
            Ok(()) => Ok(vm),
            Err(err) => {
                error!("engine {} faulted: {}", vm.config().id, err);
                Err(err)
            }
        }
    }

    /// Runs the engine as a tokio task.
    pub fn spawn(self) -> EngineHandle
    where
        I: 'static,
        O: Clone + 'static,
    {
        let id = self.id();
        let waiting = self.waiting.clone();
        let output: Box<dyn Outbox> = Box::new(self.output.clone());
        let task = tokio::spawn(self.run());

        EngineHandle {
            id,
            waiting,
            output,
            task,
        }
    }
}

async fn drive<I: Inbox, O: Outbox>(
    vm: &mut VM,
    input: &I,
    output: &O,
    waiting: &AtomicBool,
) -> Result<(), VMError> {
    let mut steps: u64 = 0;

    loop {
        match vm.step()? {
            Step::Continue => {}
            Step::Output(value) => {
                // A closed consumer drops the value; the producer keeps running.
                output.deliver(value);
            }
            Step::NeedInput => {
                waiting.store(true, Ordering::Release);
                let next = input.receive().await;
                waiting.store(false, Ordering::Release);

                match next {
                    Some(value) => vm.provide_input(value)?,
                    None => {
                        vm.end_of_input();
                        return Ok(());
                    }
                }
            }
            Step::Halted => return Ok(()),
        }

        steps += 1;
        if steps % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }
}

/// Handle to a spawned engine.
pub struct EngineHandle {
    id: usize,
    waiting: Arc<AtomicBool>,
    output: Box<dyn Outbox>,
    task: JoinHandle<Result<VM, VMError>>,
}

impl EngineHandle {
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns `true` if the engine is blocked on input and its output is drained.
    pub fn is_idle(&self) -> bool {
        self.waiting.load(Ordering::Acquire) && self.output.pending() == 0 && !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the engine to finish and returns its final machine.
    pub async fn join(self) -> Result<VM, NetworkError> {
        let id = self.id;
        Self::finish(id, self.task.await)
    }

    /// Waits up to `grace` for the engine to finish, aborting it otherwise.
    pub async fn join_or_abort(mut self, grace: Duration) -> Result<VM, NetworkError> {
        let id = self.id;
        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(joined) => Self::finish(id, joined),
            Err(_) => {
                self.task.abort();
                Err(NetworkError::TaskFailed {
                    id,
                    reason: "aborted after shutdown grace period".to_string(),
                })
            }
        }
    }

    fn finish(
        id: usize,
        joined: Result<Result<VM, VMError>, tokio::task::JoinError>,
    ) -> Result<VM, NetworkError> {
        match joined {
            Ok(Ok(vm)) => Ok(vm),
            Ok(Err(source)) => Err(NetworkError::EngineFault { id, source }),
            Err(err) => Err(NetworkError::TaskFailed {
                id,
                reason: err.to_string(),
            }),
        }
    }
}
