//! Packet network supervised by a NAT controller.
//!
//! Every node runs a clone of the same program behind a [`Nic`]: its first
//! input is its address, and reading with an empty mailbox yields
//! [`NO_PACKET`]. A single controller task owns all routing. It alternates
//! between two states on a fixed tick:
//!
//! 1. **Routing**: drain node outputs, frame them into packets and deliver
//!    them to mailboxes or to the NAT.
//! 2. **Monitoring**: reap finished engines, then, if every node is idle,
//!    re-inject the NAT's last packet into node 0.
//!
//! The network stops when the NAT is about to inject the same packet twice
//! in a row.

use crate::network::engine::{Engine, EngineHandle};
use crate::network::message::{Envelope, Framer, Packet};
use crate::network::port::Port;
use crate::network::transport::{BoxFuture, Inbox, NetworkError};
use crate::virtual_machine::isa::Word;
use crate::virtual_machine::program::Program;
use crate::virtual_machine::vm::{VM, VmConfig};
use crate::{info, warn};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

/// Value a node reads when its mailbox is empty.
pub const NO_PACKET: Word = -1;

/// Time nodes get to stop on their own once the network shuts down.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// What the controller does when a node's engine faults.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Shut the network down and return the fault.
    #[default]
    Abort,
    /// Keep running; the node counts as idle and packets to it are dropped.
    Isolate,
}

/// Configuration options for a [`Network`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Number of nodes, addressed `0..nodes`.
    pub nodes: usize,
    /// Destination address that reaches the NAT.
    pub nat_address: Word,
    /// Controller tick.
    pub poll_interval: Duration,
    /// Consecutive empty polls after which a node counts as idle.
    pub idle_threshold: usize,
    /// Pause an idle node takes before reading [`NO_PACKET`] again.
    pub idle_backoff: Duration,
    /// All-idle rounds without a NAT packet tolerated before reporting a deadlock.
    pub max_idle_rounds: Option<usize>,
    pub fault_policy: FaultPolicy,
    /// Trace every node's instructions.
    pub trace: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            nodes: 50,
            nat_address: 255,
            poll_interval: Duration::from_millis(1),
            idle_threshold: 2,
            idle_backoff: Duration::from_millis(1),
            max_idle_rounds: None,
            fault_policy: FaultPolicy::Abort,
            trace: false,
        }
    }
}

/// Outcome of a network run that ended in a NAT livelock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NatReport {
    /// First packet ever sent to the NAT.
    pub first: Packet,
    /// Packet the NAT was about to inject a second time in a row.
    pub repeated: Packet,
    /// Number of injections performed before stopping.
    pub injections: usize,
}

impl fmt::Display for NatReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "first NAT packet {}, repeated {} after {} injections",
            self.first, self.repeated, self.injections
        )
    }
}

#[derive(Debug, Default)]
struct NicState {
    announced: bool,
    mailbox: VecDeque<Word>,
    empty_polls: usize,
    closed: bool,
}

/// Network interface of a node: address handshake, mailbox and idle tracking.
#[derive(Debug)]
pub struct Nic {
    address: Word,
    idle_threshold: usize,
    idle_backoff: Duration,
    state: Mutex<NicState>,
}

impl Nic {
    pub fn new(address: Word, idle_threshold: usize, idle_backoff: Duration) -> Self {
        Self {
            address,
            idle_threshold,
            idle_backoff,
            state: Mutex::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NicState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn address(&self) -> Word {
        self.address
    }

    /// Queues a packet for the node.
    ///
    /// Returns `false` and drops the packet if the interface is closed.
    pub fn push(&self, packet: Packet) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.mailbox.extend(packet.words());
        state.empty_polls = 0;
        true
    }

    /// Records that the node did something other than polling.
    pub fn mark_active(&self) {
        self.lock().empty_polls = 0;
    }

    /// Returns `true` if the node has polled an empty mailbox enough times in a row.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.announced && state.mailbox.is_empty() && state.empty_polls >= self.idle_threshold
    }

    /// Closes the interface; the node reads end of input from now on.
    pub fn close(&self) {
        self.lock().closed = true;
    }
}

impl Inbox for Nic {
    fn receive(&self) -> BoxFuture<'_, Option<Word>> {
        Box::pin(async move {
            let idle = {
                let mut state = self.lock();
                if state.closed {
                    return None;
                }
                if !state.announced {
                    state.announced = true;
                    return Some(self.address);
                }
                if let Some(word) = state.mailbox.pop_front() {
                    state.empty_polls = 0;
                    return Some(word);
                }
                state.empty_polls += 1;
                state.empty_polls >= self.idle_threshold
            };

            if idle {
                tokio::time::sleep(self.idle_backoff).await;
            } else {
                tokio::task::yield_now().await;
            }
            Some(NO_PACKET)
        })
    }

    fn close(&self) {
        Nic::close(self)
    }

    fn pending(&self) -> usize {
        self.lock().mailbox.len()
    }
}

/// Lifecycle of a node as seen by the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum NodeState {
    Live,
    /// The program halted on its own.
    Halted,
    /// The engine faulted and the node was cut off.
    Isolated,
}

struct Node {
    id: usize,
    nic: Arc<Nic>,
    output: Port,
    framer: Framer,
    engine: Option<EngineHandle>,
    state: NodeState,
}

impl Node {
    fn spawn(id: usize, program: &Program, config: &NetworkConfig) -> Self {
        let nic = Arc::new(Nic::new(
            id as Word,
            config.idle_threshold,
            config.idle_backoff,
        ));
        let output = Port::new();
        let vm = VM::with_config(
            program.clone(),
            VmConfig::new().with_id(id).with_trace(config.trace),
        );
        let engine = Engine::new(vm, nic.clone(), output.clone()).spawn();

        Self {
            id,
            nic,
            output,
            framer: Framer::new(id),
            engine: Some(engine),
            state: NodeState::Live,
        }
    }

    /// Returns `true` if the node has nothing in flight and is not working.
    fn is_quiet(&self) -> bool {
        let busy = match self.state {
            NodeState::Live => !self.nic.is_idle(),
            NodeState::Halted | NodeState::Isolated => false,
        };
        !busy && self.output.is_empty() && !self.framer.is_mid_packet()
    }
}

/// Current state of the controller loop.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ControllerState {
    /// Moving packets from node outputs to their destinations.
    Routing,
    /// Checking engine health and network idleness.
    Monitoring,
}

struct Controller {
    nodes: Vec<Node>,
    config: NetworkConfig,
    /// Last packet sent to the NAT address.
    nat: Option<Packet>,
    first: Option<Packet>,
    last_injected: Option<Packet>,
    injections: usize,
    idle_rounds: usize,
}

impl Controller {
    fn new(nodes: Vec<Node>, config: NetworkConfig) -> Self {
        Self {
            nodes,
            config,
            nat: None,
            first: None,
            last_injected: None,
            injections: 0,
            idle_rounds: 0,
        }
    }

    async fn run(&mut self) -> Result<NatReport, NetworkError> {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut state = ControllerState::Routing;

        loop {
            state = match state {
                ControllerState::Routing => {
                    ticker.tick().await;
                    self.route();
                    ControllerState::Monitoring
                }
                ControllerState::Monitoring => {
                    if let Some(report) = self.monitor().await? {
                        return Ok(report);
                    }
                    ControllerState::Routing
                }
            };
        }
    }

    fn route(&mut self) {
        let mut envelopes = Vec::new();
        for node in &mut self.nodes {
            let words = node.output.drain();
            if words.is_empty() {
                continue;
            }
            node.nic.mark_active();
            envelopes.extend(words.into_iter().filter_map(|w| node.framer.push(w)));
        }

        for envelope in envelopes {
            self.dispatch(envelope);
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let packet = envelope.packet;
        if envelope.dest == self.config.nat_address {
            if self.first.is_none() {
                info!("NAT received first packet {} from node {}", packet, envelope.src);
                self.first = Some(packet);
            }
            self.nat = Some(packet);
            return;
        }

        let target = usize::try_from(envelope.dest)
            .ok()
            .and_then(|address| self.nodes.get(address));
        match target {
            Some(node) if node.state == NodeState::Live => {
                node.nic.push(packet);
            }
            Some(_) => warn!("dropping packet {}: destination stopped", envelope),
            None => warn!("dropping packet {}: unknown destination", envelope),
        }
    }

    async fn monitor(&mut self) -> Result<Option<NatReport>, NetworkError> {
        self.reap().await?;

        if !self.nodes.iter().all(Node::is_quiet) {
            self.idle_rounds = 0;
            return Ok(None);
        }

        let Some(packet) = self.nat else {
            self.idle_rounds += 1;
            let all_stopped = self.nodes.iter().all(|n| n.state != NodeState::Live);
            let over_limit = self
                .config
                .max_idle_rounds
                .is_some_and(|limit| self.idle_rounds > limit);
            if all_stopped || over_limit {
                return Err(NetworkError::Deadlock {
                    rounds: self.idle_rounds,
                });
            }
            return Ok(None);
        };

        if self.last_injected == Some(packet) {
            info!("NAT livelock on {} after {} injections", packet, self.injections);
            return Ok(Some(NatReport {
                first: self.first.unwrap_or(packet),
                repeated: packet,
                injections: self.injections,
            }));
        }

        self.inject(packet);
        Ok(None)
    }

    fn inject(&mut self, packet: Packet) {
        self.injections += 1;
        info!("NAT injecting {} into node 0 (#{})", packet, self.injections);

        if let Some(node) = self.nodes.first()
            && node.state == NodeState::Live
        {
            node.nic.push(packet);
        }
        self.last_injected = Some(packet);
        self.idle_rounds = 0;
    }

    /// Collects engines that finished, applying the fault policy.
    ///
    /// Complete packets a node sent before stopping are still delivered; a
    /// packet it left unfinished is discarded.
    async fn reap(&mut self) -> Result<(), NetworkError> {
        let mut envelopes = Vec::new();
        for node in &mut self.nodes {
            if !node.engine.as_ref().is_some_and(EngineHandle::is_finished) {
                continue;
            }
            let Some(engine) = node.engine.take() else {
                continue;
            };

            node.nic.close();
            let joined = engine.join().await;

            let words = node.output.drain();
            envelopes.extend(words.into_iter().filter_map(|w| node.framer.push(w)));
            if node.framer.is_mid_packet() {
                let partial = node.framer.reset();
                warn!("node {} stopped mid-packet, discarding {:?}", node.id, partial);
            }

            match joined {
                Ok(_) => {
                    info!("node {} halted", node.id);
                    node.state = NodeState::Halted;
                }
                Err(err) => {
                    node.state = NodeState::Isolated;
                    match self.config.fault_policy {
                        FaultPolicy::Abort => return Err(err),
                        FaultPolicy::Isolate => warn!("isolating node {}: {}", node.id, err),
                    }
                }
            }
        }

        for envelope in envelopes {
            self.dispatch(envelope);
        }
        Ok(())
    }

    /// Closes every interface and waits for the engines to stop.
    async fn shutdown(&mut self) {
        for node in &self.nodes {
            node.nic.close();
        }
        for node in &mut self.nodes {
            if let Some(engine) = node.engine.take()
                && let Err(err) = engine.join_or_abort(SHUTDOWN_GRACE).await
            {
                warn!("node {} did not stop cleanly: {}", node.id, err);
            }
        }
    }
}

/// A set of nodes running the same program, connected through a NAT.
#[derive(Clone, Debug)]
pub struct Network {
    program: Program,
    config: NetworkConfig,
}

impl Network {
    pub fn new(program: Program, config: NetworkConfig) -> Self {
        Self { program, config }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Boots every node and runs the controller until the NAT livelocks.
    ///
    /// Nodes are shut down before returning, whatever the outcome.
    pub async fn run(&self) -> Result<NatReport, NetworkError> {
        if self.config.nodes == 0 {
            return Err(NetworkError::EmptyNetwork);
        }

        let nodes = (0..self.config.nodes)
            .map(|id| Node::spawn(id, &self.program, &self.config))
            .collect();
        let mut controller = Controller::new(nodes, self.config.clone());
        info!(
            "network started: {} nodes, NAT at {}",
            self.config.nodes, self.config.nat_address
        );

        let outcome = controller.run().await;
        controller.shutdown().await;
        outcome
    }
}
