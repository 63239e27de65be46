//! Core transport abstractions between engines and their surroundings.
//!
//! Defines the [`Inbox`] and [`Outbox`] traits an [`Engine`](crate::network::engine::Engine)
//! reads from and writes to, and the error type shared by every harness.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Word;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, pinned, send-safe future.
///
/// Used for trait methods that return futures, enabling async trait methods
/// without the `async-trait` crate overhead.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors that can occur while running engines under a harness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// An engine stopped on an execution error.
    #[error("engine {id} faulted: {source}")]
    EngineFault { id: usize, source: VMError },

    /// An engine task panicked or was cancelled.
    #[error("engine {id} task failed: {reason}")]
    TaskFailed { id: usize, reason: String },

    /// The observed engine halted without emitting anything.
    #[error("no output was produced")]
    NoOutput,

    /// A harness was asked to run zero engines.
    #[error("network has no nodes")]
    EmptyNetwork,

    /// Every node stayed idle with nothing to re-inject.
    #[error("network deadlocked after {rounds} idle rounds")]
    Deadlock { rounds: usize },
}

/// Source of input values for an engine.
pub trait Inbox: Send + Sync {
    /// Waits for the next value.
    ///
    /// Returns `None` once the source is closed and drained.
    fn receive(&self) -> BoxFuture<'_, Option<Word>>;

    /// Closes the source; pending and future receives end.
    fn close(&self);

    /// Number of values queued and not yet received.
    fn pending(&self) -> usize;
}

/// Sink for output values of an engine.
pub trait Outbox: Send + Sync {
    /// Hands over a value without blocking.
    ///
    /// Returns `false` if the sink is closed; the value is dropped.
    fn deliver(&self, value: Word) -> bool;

    /// Closes the sink; consumers see end of transmission once drained.
    fn close(&self);

    /// Number of delivered values not yet consumed.
    fn pending(&self) -> usize;
}

impl<T: Inbox + ?Sized> Inbox for Arc<T> {
    fn receive(&self) -> BoxFuture<'_, Option<Word>> {
        (**self).receive()
    }

    fn close(&self) {
        (**self).close()
    }

    fn pending(&self) -> usize {
        (**self).pending()
    }
}

impl<T: Outbox + ?Sized> Outbox for Arc<T> {
    fn deliver(&self, value: Word) -> bool {
        (**self).deliver(value)
    }

    fn close(&self) {
        (**self).close()
    }

    fn pending(&self) -> usize {
        (**self).pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_context() {
        let fault = NetworkError::EngineFault {
            id: 3,
            source: VMError::OutOfRange { addr: -2 },
        };
        assert_eq!(fault.to_string(), "engine 3 faulted: address -2 out of range");
        assert_eq!(
            NetworkError::Deadlock { rounds: 4 }.to_string(),
            "network deadlocked after 4 idle rounds"
        );
    }
}
