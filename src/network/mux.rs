//! Fan-in and fan-out adapters letting one engine own several ports.
//!
//! [`Merge`] reads from whichever of its ports has data, rotating between
//! them so no producer starves. [`Broadcast`] copies every output to all of
//! its sinks.

use crate::network::port::Port;
use crate::network::transport::{BoxFuture, Inbox, Outbox};
use crate::virtual_machine::isa::Word;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::Poll;

/// Inbox over several ports.
///
/// Input ends only once every port is closed and drained. Meant for a single
/// consumer.
#[derive(Debug, Default)]
pub struct Merge {
    ports: Vec<Port>,
    cursor: AtomicUsize,
}

impl Merge {
    pub fn new(ports: Vec<Port>) -> Self {
        Self {
            ports,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    async fn recv(&self) -> Option<Word> {
        let count = self.ports.len();

        loop {
            let mut waiters: Vec<Pin<Box<_>>> =
                self.ports.iter().map(|p| Box::pin(p.notified())).collect();
            for waiter in &mut waiters {
                waiter.as_mut().enable();
            }

            let start = self.cursor.load(Ordering::Relaxed);
            let mut open = false;
            for offset in 0..count {
                let index = (start + offset) % count;
                let port = &self.ports[index];
                if let Some(value) = port.try_recv() {
                    self.cursor.store((index + 1) % count, Ordering::Relaxed);
                    return Some(value);
                }
                open |= !port.is_closed();
            }
            if !open {
                return None;
            }

            poll_fn(|cx| {
                if waiters.iter_mut().any(|w| w.as_mut().poll(cx).is_ready()) {
                    Poll::Ready(())
                } else {
                    Poll::Pending
                }
            })
            .await;
        }
    }
}

impl Inbox for Merge {
    fn receive(&self) -> BoxFuture<'_, Option<Word>> {
        Box::pin(self.recv())
    }

    fn close(&self) {
        for port in &self.ports {
            port.close();
        }
    }

    fn pending(&self) -> usize {
        self.ports.iter().map(Port::len).sum()
    }
}

/// Outbox copying each value to every sink.
#[derive(Clone, Debug, Default)]
pub struct Broadcast<O> {
    sinks: Vec<O>,
}

impl<O: Outbox> Broadcast<O> {
    pub fn new(sinks: Vec<O>) -> Self {
        Self { sinks }
    }

    pub fn sinks(&self) -> &[O] {
        &self.sinks
    }
}

impl<O: Outbox> Outbox for Broadcast<O> {
    /// Returns `true` if at least one sink accepted the value.
    fn deliver(&self, value: Word) -> bool {
        let mut accepted = false;
        for sink in &self.sinks {
            accepted |= sink.deliver(value);
        }
        accepted
    }

    fn close(&self) {
        for sink in &self.sinks {
            sink.close();
        }
    }

    fn pending(&self) -> usize {
        self.sinks.iter().map(Outbox::pending).sum()
    }
}
