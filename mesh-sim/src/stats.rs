use crate::network::packet::NodeAddress;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Telemetry emitted by the forwarding engines and the delivery sinks, in
/// emission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Interface chosen for a packet (-1 when the packet was delivered
    /// locally instead of being transmitted)
    OutputInterface { node: NodeAddress, interface: i64 },
    /// Packet discarded because its destination is unreachable
    Drop { node: NodeAddress, byte_length: u64 },
    /// Packet handed to the local application
    Delivered {
        node: NodeAddress,
        delay: Duration,
        hop_count: u32,
        src: NodeAddress,
    },
}

/// Shared recorder for all signals of a simulation run. Cloning yields a
/// handle to the same log.
#[derive(Clone, Default)]
#[derive(Debug)]
pub struct SignalTracker {
    inner: Arc<Mutex<Vec<Signal>>>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit_output_interface(&self, node: NodeAddress, interface: i64) {
        self.inner.lock().push(Signal::OutputInterface { node, interface });
    }

    pub fn emit_drop(&self, node: NodeAddress, byte_length: u64) {
        self.inner.lock().push(Signal::Drop { node, byte_length });
    }

    pub fn emit_delivered(
        &self,
        node: NodeAddress,
        delay: Duration,
        hop_count: u32,
        src: NodeAddress,
    ) {
        self.inner.lock().push(Signal::Delivered {
            node,
            delay,
            hop_count,
            src,
        });
    }

    /// Snapshot of the signal log, in emission order
    pub fn signals(&self) -> Vec<Signal> {
        self.inner.lock().clone()
    }

    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();
        for signal in self.inner.lock().iter() {
            match signal {
                Signal::OutputInterface { node, interface } => {
                    if *interface >= 0 {
                        stats.node_mut(*node).forwarded += 1;
                    }
                }
                Signal::Drop { node, byte_length } => {
                    stats.node_mut(*node).dropped.track_one(*byte_length);
                }
                Signal::Delivered {
                    node,
                    delay,
                    hop_count,
                    ..
                } => {
                    let node_stats = stats.node_mut(*node);
                    node_stats.delivered += 1;
                    node_stats.total_delay += *delay;
                    node_stats.total_hops += u64::from(*hop_count);
                }
            }
        }
        stats
    }
}

#[derive(Default)]
pub struct NetworkStats {
    pub nodes: BTreeMap<NodeAddress, NodeStats>,
}

impl NetworkStats {
    fn node_mut(&mut self, node: NodeAddress) -> &mut NodeStats {
        self.nodes.entry(node).or_default()
    }

    pub fn total_delivered(&self) -> u64 {
        self.nodes.values().map(|n| n.delivered).sum()
    }

    pub fn total_dropped(&self) -> u64 {
        self.nodes.values().map(|n| n.dropped.packets).sum()
    }
}

#[derive(Default)]
pub struct NodeStats {
    /// Forwarding decisions that picked a real output interface
    pub forwarded: u64,
    /// Packets handed to the local application
    pub delivered: u64,
    /// Packets dropped because their destination was unreachable
    pub dropped: PacketStats,
    pub total_delay: Duration,
    pub total_hops: u64,
}

impl NodeStats {
    pub fn mean_delay(&self) -> Option<Duration> {
        (self.delivered > 0).then(|| self.total_delay / self.delivered as u32)
    }

    pub fn mean_hops(&self) -> Option<f64> {
        (self.delivered > 0).then(|| self.total_hops as f64 / self.delivered as f64)
    }
}

#[derive(Default)]
pub struct PacketStats {
    pub packets: u64,
    pub bytes: u64,
}

impl PacketStats {
    pub fn track_one(&mut self, size_bytes: u64) {
        self.packets += 1;
        self.bytes += size_bytes;
    }
}

impl fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Delivered {} packet(s), dropped {} as unreachable",
            self.total_delivered(),
            self.total_dropped()
        )?;
        for (address, node) in &self.nodes {
            write!(
                f,
                "node {address}: delivered {}, forwarded {}, dropped {} ({} bytes)",
                node.delivered, node.forwarded, node.dropped.packets, node.dropped.bytes
            )?;
            if let (Some(delay), Some(hops)) = (node.mean_delay(), node.mean_hops()) {
                write!(
                    f,
                    ", mean delay {:.3}s over {hops:.2} hops",
                    delay.as_secs_f64()
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
