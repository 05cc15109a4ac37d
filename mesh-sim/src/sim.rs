//! Single-threaded discrete-event simulation driver
//!
//! Events are processed to completion in strictly increasing simulated-time
//! order; ties are broken by insertion order. Nothing suspends mid-event and
//! no node ever runs concurrently with another, so per-node state needs no
//! locking discipline.

use crate::network::forward::{ForwardingConfig, ForwardingEngine, Outcome};
use crate::network::packet::{NodeAddress, Packet};
use crate::network::spec::{NetworkSpec, TrafficSpec};
use crate::network::topology::TopologyGraph;
use crate::stats::{NetworkStats, Signal, SignalTracker};
use anyhow::bail;
use fastrand::Rng;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
struct ScheduledEvent {
    time: Duration,
    /// Tie-breaker: events scheduled first fire first at equal times
    seq: u64,
    kind: EventKind,
}

#[derive(Debug)]
enum EventKind {
    PacketArrival { node: NodeAddress, packet: Packet },
    GeneratePacket { node: NodeAddress },
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.seq).cmp(&(other.time, other.seq))
    }
}

#[derive(Debug)]
struct TrafficGenerator {
    dest_addresses: Arc<[NodeAddress]>,
    packets_generated: u64,
}

#[derive(Debug)]
struct SimNode {
    engine: ForwardingEngine,
    /// Present only when the node's own address is listed among its
    /// destination addresses (the node is a traffic source)
    generator: Option<TrafficGenerator>,
}

#[derive(Debug)]
pub struct Simulation {
    topology: TopologyGraph,
    nodes: BTreeMap<NodeAddress, SimNode>,
    queue: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
    now: Duration,
    rng: Rng,
    traffic: TrafficSpec,
    tracker: SignalTracker,
}

impl Simulation {
    /// Builds the topology snapshot once, derives every node's routing and
    /// neighbor tables from it, and schedules the first generation timer of
    /// every traffic source.
    pub fn new(
        spec: NetworkSpec,
        traffic: TrafficSpec,
        config: ForwardingConfig,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let topology = TopologyGraph::new(&spec)?;
        let tracker = SignalTracker::new();

        let mut sim = Self {
            topology,
            nodes: BTreeMap::new(),
            queue: BinaryHeap::new(),
            next_seq: 0,
            now: Duration::ZERO,
            rng: Rng::with_seed(seed),
            traffic,
            tracker,
        };

        for node_spec in &spec.nodes {
            if node_spec.dest_addresses.is_empty() {
                bail!(
                    "node {}: at least one destination address must be configured",
                    node_spec.address
                );
            }

            let engine = ForwardingEngine::new(
                &sim.topology,
                node_spec.address,
                config,
                sim.tracker.clone(),
            )?;
            let generator = node_spec
                .dest_addresses
                .contains(&node_spec.address)
                .then(|| TrafficGenerator {
                    dest_addresses: node_spec.dest_addresses.clone().into(),
                    packets_generated: 0,
                });
            sim.nodes
                .insert(node_spec.address, SimNode { engine, generator });
        }

        let sources: Vec<NodeAddress> = sim
            .nodes
            .iter()
            .filter(|(_, node)| node.generator.is_some())
            .map(|(address, _)| *address)
            .collect();
        for node in sources {
            let gap = sim.sample_interarrival();
            sim.schedule(gap, EventKind::GeneratePacket { node });
        }

        Ok(sim)
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn topology(&self) -> &TopologyGraph {
        &self.topology
    }

    pub fn tracker(&self) -> &SignalTracker {
        &self.tracker
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.tracker.signals()
    }

    pub fn stats(&self) -> NetworkStats {
        self.tracker.stats()
    }

    /// Number of packets the node's traffic generator has created so far
    /// (zero for nodes that are not traffic sources)
    pub fn packets_generated(&self, node: NodeAddress) -> u64 {
        self.nodes
            .get(&node)
            .and_then(|n| n.generator.as_ref())
            .map(|g| g.packets_generated)
            .unwrap_or(0)
    }

    /// Hands a freshly created packet to `src`'s forwarding entry point at
    /// the current simulated time, outside of the periodic generators.
    pub fn inject(&mut self, src: NodeAddress, dest: NodeAddress) -> anyhow::Result<()> {
        if !self.nodes.contains_key(&src) {
            bail!("cannot inject at unknown node {src}");
        }
        let packet = Packet::new(src, dest, self.traffic.packet_length_bytes, self.now);
        self.schedule(Duration::ZERO, EventKind::PacketArrival { node: src, packet });
        Ok(())
    }

    /// Processes events in time order until the queue runs dry or the next
    /// event lies beyond `deadline`.
    pub fn run_until(&mut self, deadline: Duration) {
        loop {
            match self.queue.peek() {
                Some(Reverse(event)) if event.time <= deadline => {}
                _ => break,
            }
            let Some(Reverse(event)) = self.queue.pop() else {
                break;
            };
            self.now = event.time;
            match event.kind {
                EventKind::GeneratePacket { node } => self.generate_packet(node),
                EventKind::PacketArrival { node, packet } => self.packet_arrival(node, packet),
            }
        }
        self.now = deadline;
    }

    /// Tears a node down: its pending generation timer is cancelled and
    /// packets still in flight towards it evaporate on arrival.
    pub fn remove_node(&mut self, address: NodeAddress) {
        self.nodes.remove(&address);
        let queue = std::mem::take(&mut self.queue);
        self.queue = queue
            .into_iter()
            .filter(|Reverse(event)| {
                !matches!(event.kind, EventKind::GeneratePacket { node } if node == address)
            })
            .collect();
    }

    fn schedule(&mut self, delay: Duration, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(ScheduledEvent {
            time: self.now + delay,
            seq,
            kind,
        }));
    }

    /// Exponential inter-arrival gap (inverse-transform sampling; `f64()` is
    /// in `[0, 1)`, so the argument of `ln` stays positive)
    fn sample_interarrival(&mut self) -> Duration {
        let mean = self.traffic.mean_interarrival_ms as f64 / 1000.0;
        let u = self.rng.f64();
        Duration::from_secs_f64(-mean * (1.0 - u).ln())
    }

    fn generate_packet(&mut self, node: NodeAddress) {
        let destinations = match self.nodes.get_mut(&node) {
            Some(SimNode {
                generator: Some(generator),
                ..
            }) => {
                generator.packets_generated += 1;
                generator.dest_addresses.clone()
            }
            // Torn down in the meantime, or not a source
            _ => return,
        };

        let dest = destinations[self.rng.usize(..destinations.len())];
        let packet = Packet::new(node, dest, self.traffic.packet_length_bytes, self.now);
        self.schedule(Duration::ZERO, EventKind::PacketArrival { node, packet });

        let gap = self.sample_interarrival();
        self.schedule(gap, EventKind::GeneratePacket { node });
    }

    fn packet_arrival(&mut self, node: NodeAddress, packet: Packet) {
        let Some(sim_node) = self.nodes.get(&node) else {
            return;
        };

        match sim_node.engine.forward(packet) {
            Outcome::Delivered(packet) => {
                // The local application sink records the end-to-end telemetry
                self.tracker.emit_delivered(
                    node,
                    self.now - packet.created_at,
                    packet.hop_count,
                    packet.src,
                );
                println!(
                    "{:.2}s node {node} received packet from {} after {} hop(s)",
                    self.now.as_secs_f64(),
                    packet.src,
                    packet.hop_count,
                );
            }
            Outcome::Dropped { dest } => {
                println!(
                    "{:.2}s WARN node {node}: address {dest} unreachable, packet dropped",
                    self.now.as_secs_f64(),
                );
            }
            Outcome::Discarded => {}
            Outcome::Forwarded(transmissions) => {
                for transmission in transmissions {
                    let port = self
                        .topology
                        .node(node)
                        .and_then(|n| n.ports.get(transmission.interface));
                    if let Some(port) = port {
                        let (remote, delay) = (port.remote, port.delay);
                        self.schedule(
                            delay,
                            EventKind::PacketArrival {
                                node: remote,
                                packet: transmission.packet,
                            },
                        );
                    }
                }
            }
        }
    }
}
