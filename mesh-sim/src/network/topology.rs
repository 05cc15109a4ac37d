use crate::network::packet::{InterfaceIndex, NodeAddress};
use crate::network::spec::{NetworkSpec, NodeBehavior};
use anyhow::bail;
use std::collections::BTreeMap;
use std::time::Duration;

/// One end of a link, seen from the owning node. A port's position in the
/// node's port list is its interface index.
#[derive(Clone, Debug)]
pub struct Port {
    pub remote: NodeAddress,
    /// The interface index this link occupies on the remote node
    pub remote_interface: InterfaceIndex,
    pub delay: Duration,
}

#[derive(Clone, Debug)]
pub struct TopologyNode {
    pub address: NodeAddress,
    pub behavior: NodeBehavior,
    pub ports: Vec<Port>,
}

/// Immutable snapshot of nodes and links, built once from the spec and shared
/// read-only with every table builder. Packet flow never mutates it.
#[derive(Debug)]
pub struct TopologyGraph {
    nodes: BTreeMap<NodeAddress, TopologyNode>,
}

impl TopologyGraph {
    pub fn new(spec: &NetworkSpec) -> anyhow::Result<Self> {
        let mut nodes = BTreeMap::new();
        for node in &spec.nodes {
            let descriptor = TopologyNode {
                address: node.address,
                behavior: node.behavior,
                ports: Vec::new(),
            };
            if nodes.insert(node.address, descriptor).is_some() {
                bail!("duplicate node address: {}", node.address);
            }
        }

        for link in &spec.links {
            if link.a == link.b {
                bail!("link connects node {} to itself", link.a);
            }
            for endpoint in [link.a, link.b] {
                if !nodes.contains_key(&endpoint) {
                    bail!("link references unknown node address: {endpoint}");
                }
            }

            let delay = Duration::from_millis(link.delay_ms);
            let a_interface = nodes[&link.a].ports.len();
            let b_interface = nodes[&link.b].ports.len();
            if let Some(node) = nodes.get_mut(&link.a) {
                node.ports.push(Port {
                    remote: link.b,
                    remote_interface: b_interface,
                    delay,
                });
            }
            if let Some(node) = nodes.get_mut(&link.b) {
                node.ports.push(Port {
                    remote: link.a,
                    remote_interface: a_interface,
                    delay,
                });
            }
        }

        Ok(Self { nodes })
    }

    pub fn node(&self, address: NodeAddress) -> Option<&TopologyNode> {
        self.nodes.get(&address)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.values()
    }

    pub fn behavior_of(&self, address: NodeAddress) -> Option<NodeBehavior> {
        self.nodes.get(&address).map(|n| n.behavior)
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}
