use std::time::Duration;
use uuid::Uuid;

/// Flat integer identifier of a node, unique for the lifetime of a simulation.
pub type NodeAddress = u32;

/// Ordinal of one of a node's attachment points. A node's interface count is
/// fixed once the topology has been built.
pub type InterfaceIndex = usize;

/// A message in flight through the network.
///
/// The packet is mutated in place as it transits nodes: `hop_count` grows by
/// one per forwarding hop and `next_hop` is rewritten by the forwarding node
/// before transmission, so the next node can tell a genuine reception apart
/// from overhearing on a shared medium. Flooding clones the packet into
/// independently owned copies; the `id` identifies the logical packet across
/// all of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub id: Uuid,
    pub src: NodeAddress,
    pub dest: NodeAddress,
    /// `None` until the first transmission: a locally injected packet has
    /// never been on the medium.
    pub next_hop: Option<NodeAddress>,
    pub hop_count: u32,
    pub byte_length: u64,
    /// Simulated time at which the traffic generator created the packet.
    pub created_at: Duration,
}

impl Packet {
    pub fn new(
        src: NodeAddress,
        dest: NodeAddress,
        byte_length: u64,
        created_at: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            src,
            dest,
            next_hop: None,
            hop_count: 0,
            byte_length,
            created_at,
        }
    }
}
