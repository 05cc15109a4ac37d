use crate::network::packet::NodeAddress;
use serde::Deserialize;

/// Static description of the network, parsed from JSON. Construction of a
/// [`TopologyGraph`](crate::network::topology::TopologyGraph) validates it.
#[derive(Clone, Debug, Deserialize)]
pub struct NetworkSpec {
    pub nodes: Vec<NetworkNodeSpec>,
    pub links: Vec<NetworkLinkSpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NetworkNodeSpec {
    pub address: NodeAddress,
    pub behavior: NodeBehavior,
    /// Addresses this node may pick as packet destinations. A node generates
    /// traffic only when its own address appears in the list. The list must
    /// not be empty; it may name addresses that do not exist in the topology
    /// (packets towards them are dropped as unreachable).
    pub dest_addresses: Vec<NodeAddress>,
}

/// Forwarding role of a node, assigned once at configuration time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeBehavior {
    /// Plain endpoint, point-to-point unicast
    People,
    /// Wired relay, point-to-point unicast
    Grid,
    /// Protocol bridge: floods selectively towards converter/radio neighbors,
    /// falls back to unicast otherwise
    Converter,
    /// Wireless broadcaster: every transmission reaches all neighbors
    Radio,
}

/// An undirected link between two node addresses. Links assign interface
/// indices in declaration order: each link appends one interface to each of
/// its endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct NetworkLinkSpec {
    pub a: NodeAddress,
    pub b: NodeAddress,
    /// The one-way delay of the link, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
}

/// Knobs for the traffic generators.
#[derive(Clone, Debug, Deserialize)]
pub struct TrafficSpec {
    /// Mean of the exponential inter-arrival distribution, in milliseconds
    pub mean_interarrival_ms: u64,
    /// Payload size of every generated packet, in bytes
    pub packet_length_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_network_description() {
        let json = r#"{
            "nodes": [
                { "address": 1, "behavior": "people", "dest_addresses": [1, 2] },
                { "address": 2, "behavior": "radio", "dest_addresses": [2] },
                { "address": 3, "behavior": "converter", "dest_addresses": [1] }
            ],
            "links": [
                { "a": 1, "b": 2 },
                { "a": 2, "b": 3, "delay_ms": 7 }
            ]
        }"#;

        let spec: NetworkSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.nodes[0].behavior, NodeBehavior::People);
        assert_eq!(spec.nodes[1].behavior, NodeBehavior::Radio);
        assert_eq!(spec.nodes[2].behavior, NodeBehavior::Converter);
        // delay_ms defaults to zero when omitted
        assert_eq!(spec.links[0].delay_ms, 0);
        assert_eq!(spec.links[1].delay_ms, 7);
    }

    #[test]
    fn rejects_unknown_behaviors() {
        let json = r#"{ "address": 1, "behavior": "teleporter", "dest_addresses": [1] }"#;
        assert!(serde_json::from_str::<NetworkNodeSpec>(json).is_err());
    }
}
