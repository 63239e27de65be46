//! In-memory FIFO port connecting one producer to one or more consumers.
//!
//! Sends never block and queues are unbounded. Receivers park on a
//! [`Notify`] until a value arrives or the port is closed.

use crate::network::transport::{BoxFuture, Inbox, Outbox};
use crate::virtual_machine::isa::Word;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;

#[derive(Debug, Default)]
struct Queue {
    items: VecDeque<Word>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<Queue>,
    notify: Notify,
}

/// Cloneable handle to a shared queue of words.
///
/// All clones observe the same queue. Closing is idempotent; values queued
/// before the close can still be received.
#[derive(Clone, Debug, Default)]
pub struct Port {
    shared: Arc<Shared>,
}

impl Port {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a port already holding `values`.
    pub fn with_values<I: IntoIterator<Item = Word>>(values: I) -> Self {
        let port = Self::new();
        port.lock().items.extend(values);
        port
    }

    // The lock is only held for O(1) queue operations, never across an await.
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.shared
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueues `value` and wakes a waiting receiver.
    ///
    /// Returns `false` and drops the value if the port is closed.
    pub fn send(&self, value: Word) -> bool {
        {
            let mut queue = self.lock();
            if queue.closed {
                return false;
            }
            queue.items.push_back(value);
        }
        self.shared.notify.notify_one();
        true
    }

    /// Waits for the next value.
    ///
    /// Returns `None` once the port is closed and empty.
    pub async fn recv(&self) -> Option<Word> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut queue = self.lock();
                if let Some(value) = queue.items.pop_front() {
                    return Some(value);
                }
                if queue.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Dequeues a value if one is ready.
    pub fn try_recv(&self) -> Option<Word> {
        self.lock().items.pop_front()
    }

    /// Removes and returns every queued value.
    pub fn drain(&self) -> Vec<Word> {
        self.lock().items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Closes the port and wakes every waiting receiver.
    pub fn close(&self) {
        self.lock().closed = true;
        self.shared.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Future completing on the next send or close, for receivers waiting on
    /// several ports at once.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.shared.notify.notified()
    }
}

impl Inbox for Port {
    fn receive(&self) -> BoxFuture<'_, Option<Word>> {
        Box::pin(self.recv())
    }

    fn close(&self) {
        Port::close(self)
    }

    fn pending(&self) -> usize {
        self.len()
    }
}

impl Outbox for Port {
    fn deliver(&self, value: Word) -> bool {
        self.send(value)
    }

    fn close(&self) {
        Port::close(self)
    }

    fn pending(&self) -> usize {
        self.len()
    }
}
