use crate::network::packet::{InterfaceIndex, NodeAddress};
use crate::network::spec::NodeBehavior;
use crate::network::topology::TopologyGraph;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// First hop of a hop-minimal path towards one destination.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub out_interface: InterfaceIndex,
    pub next_hop: NodeAddress,
}

/// Destination address to first hop, owned by exactly one node and immutable
/// after construction. Unreachable destinations are absent; a lookup miss is
/// the unreachable signal, never an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingTable {
    entries: BTreeMap<NodeAddress, RouteEntry>,
}

impl RoutingTable {
    /// Runs a breadth-first search rooted at `owner` over the full topology
    /// and records the first hop of a hop-minimal path for every other
    /// reachable node.
    ///
    /// Ports are expanded in ascending interface order, so among equal-length
    /// paths the one leaving through the lowest local interface index wins.
    pub fn build(topo: &TopologyGraph, owner: NodeAddress) -> Self {
        let mut entries = BTreeMap::new();
        let Some(start) = topo.node(owner) else {
            return Self::default();
        };

        let mut visited = BTreeSet::from([owner]);
        let mut queue = VecDeque::new();
        for (interface, port) in start.ports.iter().enumerate() {
            if visited.insert(port.remote) {
                let entry = RouteEntry {
                    out_interface: interface,
                    next_hop: port.remote,
                };
                entries.insert(port.remote, entry);
                queue.push_back((port.remote, entry));
            }
        }

        // Every node discovered deeper in the graph inherits the first-hop
        // entry of the neighbor it was reached through.
        while let Some((address, entry)) = queue.pop_front() {
            let Some(node) = topo.node(address) else {
                continue;
            };
            for port in &node.ports {
                if visited.insert(port.remote) {
                    entries.insert(port.remote, entry);
                    queue.push_back((port.remote, entry));
                }
            }
        }

        Self { entries }
    }

    pub fn lookup(&self, dest: NodeAddress) -> Option<RouteEntry> {
        self.entries.get(&dest).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeAddress, RouteEntry)> + '_ {
        self.entries.iter().map(|(dest, entry)| (*dest, *entry))
    }
}

/// Behavior of the node one hop away, per interface. Only consulted by
/// flood-capable roles to filter broadcast targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NeighborTable {
    behaviors: BTreeMap<InterfaceIndex, NodeBehavior>,
}

impl NeighborTable {
    pub fn build(topo: &TopologyGraph, owner: NodeAddress) -> Self {
        let mut behaviors = BTreeMap::new();
        if let Some(node) = topo.node(owner) {
            for (interface, port) in node.ports.iter().enumerate() {
                if let Some(behavior) = topo.behavior_of(port.remote) {
                    behaviors.insert(interface, behavior);
                }
            }
        }
        Self { behaviors }
    }

    pub fn behavior_on(&self, interface: InterfaceIndex) -> Option<NodeBehavior> {
        self.behaviors.get(&interface).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterfaceIndex, NodeBehavior)> + '_ {
        self.behaviors.iter().map(|(i, b)| (*i, *b))
    }
}
