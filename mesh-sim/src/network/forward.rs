use crate::network::packet::{InterfaceIndex, NodeAddress, Packet};
use crate::network::routing::{NeighborTable, RoutingTable};
use crate::network::spec::NodeBehavior;
use crate::network::topology::TopologyGraph;
use crate::stats::SignalTracker;
use anyhow::bail;

/// Interface value carried by the output-interface signal when a packet is
/// delivered locally instead of being transmitted.
pub const LOCAL_OUTPUT_INTERFACE: i64 = -1;

/// One owned copy of a packet, leaving through one interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transmission {
    pub interface: InterfaceIndex,
    pub packet: Packet,
}

/// Fate of a packet after one forwarding decision.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The destination address matched this node; hand the packet to the
    /// local application sink
    Delivered(Packet),
    /// Overheard frame not addressed to this node; discarded without any
    /// telemetry
    Discarded,
    /// The destination is missing from the routing table
    Dropped { dest: NodeAddress },
    /// One or more copies are on their way to the next hop(s)
    Forwarded(Vec<Transmission>),
}

#[derive(Copy, Clone, Debug)]
pub struct ForwardingConfig {
    /// Re-emit the output-interface signal when a converter falls back from
    /// selective flood to plain unicast, matching the historical telemetry of
    /// the network this models. Turn off to emit the signal once.
    pub duplicate_unicast_signal: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            duplicate_unicast_signal: true,
        }
    }
}

/// Per-node forwarding state: the node's identity and role plus its static
/// routing and neighbor tables, all fixed at construction.
#[derive(Debug)]
pub struct ForwardingEngine {
    address: NodeAddress,
    behavior: NodeBehavior,
    rtable: RoutingTable,
    ntable: NeighborTable,
    num_interfaces: usize,
    config: ForwardingConfig,
    tracker: SignalTracker,
}

impl ForwardingEngine {
    /// Builds the node's routing and neighbor tables from the shared
    /// topology snapshot. Every node derives its own tables independently at
    /// startup; there are no route updates afterwards.
    pub fn new(
        topo: &TopologyGraph,
        address: NodeAddress,
        config: ForwardingConfig,
        tracker: SignalTracker,
    ) -> anyhow::Result<Self> {
        let Some(node) = topo.node(address) else {
            bail!("node {address} is not part of the topology");
        };
        Ok(Self {
            address,
            behavior: node.behavior,
            rtable: RoutingTable::build(topo, address),
            ntable: NeighborTable::build(topo, address),
            num_interfaces: node.ports.len(),
            config,
            tracker,
        })
    }

    pub fn address(&self) -> NodeAddress {
        self.address
    }

    pub fn behavior(&self) -> NodeBehavior {
        self.behavior
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.rtable
    }

    pub fn neighbor_table(&self) -> &NeighborTable {
        &self.ntable
    }

    /// Runs the forwarding decision procedure for one packet arriving at
    /// this node, either from the medium or freshly injected by the local
    /// traffic generator (`next_hop == None`).
    pub fn forward(&self, mut packet: Packet) -> Outcome {
        if packet.dest == self.address {
            // No hop count increment on local delivery
            self.tracker
                .emit_output_interface(self.address, LOCAL_OUTPUT_INTERFACE);
            return Outcome::Delivered(packet);
        }

        // Shared-medium roles overhear frames meant for someone else; those
        // were never true receptions, so they go away without telemetry.
        // Locally injected packets (no next hop yet) have never been on the
        // medium and skip the check.
        if packet.next_hop.is_some() {
            match self.behavior {
                // A radio hears its own broadcasts echoed back by neighbors
                NodeBehavior::Radio if packet.src == self.address => {
                    return Outcome::Discarded;
                }
                NodeBehavior::Radio | NodeBehavior::Converter
                    if packet.next_hop != Some(self.address) =>
                {
                    return Outcome::Discarded;
                }
                _ => {}
            }
        }

        let Some(entry) = self.rtable.lookup(packet.dest) else {
            self.tracker.emit_drop(self.address, packet.byte_length);
            return Outcome::Dropped { dest: packet.dest };
        };

        packet.hop_count += 1;
        self.tracker
            .emit_output_interface(self.address, entry.out_interface as i64);
        packet.next_hop = Some(entry.next_hop);

        match self.behavior {
            NodeBehavior::People | NodeBehavior::Grid => Outcome::Forwarded(vec![Transmission {
                interface: entry.out_interface,
                packet,
            }]),
            NodeBehavior::Radio => {
                // The medium is inherently shared: every neighbor receives a
                // copy and decides for itself whether it was the addressee.
                let transmissions = (0..self.num_interfaces)
                    .map(|interface| Transmission {
                        interface,
                        packet: packet.clone(),
                    })
                    .collect();
                Outcome::Forwarded(transmissions)
            }
            NodeBehavior::Converter => {
                let next_hop_behavior = self.ntable.behavior_on(entry.out_interface);
                if matches!(
                    next_hop_behavior,
                    Some(NodeBehavior::Converter | NodeBehavior::Radio)
                ) {
                    // Selective flood: only converter/radio branches get a
                    // copy, point-to-point neighbors are left alone
                    let transmissions = self
                        .ntable
                        .iter()
                        .filter(|(_, behavior)| {
                            matches!(behavior, NodeBehavior::Converter | NodeBehavior::Radio)
                        })
                        .map(|(interface, _)| Transmission {
                            interface,
                            packet: packet.clone(),
                        })
                        .collect();
                    Outcome::Forwarded(transmissions)
                } else {
                    if self.config.duplicate_unicast_signal {
                        self.tracker
                            .emit_output_interface(self.address, entry.out_interface as i64);
                    }
                    Outcome::Forwarded(vec![Transmission {
                        interface: entry.out_interface,
                        packet,
                    }])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::spec::{NetworkLinkSpec, NetworkNodeSpec, NetworkSpec};
    use crate::stats::Signal;
    use std::time::Duration;

    fn build_topology(
        nodes: &[(NodeAddress, NodeBehavior)],
        links: &[(NodeAddress, NodeAddress)],
    ) -> TopologyGraph {
        let spec = NetworkSpec {
            nodes: nodes
                .iter()
                .map(|&(address, behavior)| NetworkNodeSpec {
                    address,
                    behavior,
                    dest_addresses: vec![address],
                })
                .collect(),
            links: links
                .iter()
                .map(|&(a, b)| NetworkLinkSpec { a, b, delay_ms: 0 })
                .collect(),
        };
        TopologyGraph::new(&spec).unwrap()
    }

    fn engine(topo: &TopologyGraph, address: NodeAddress) -> (ForwardingEngine, SignalTracker) {
        let tracker = SignalTracker::new();
        let engine =
            ForwardingEngine::new(topo, address, ForwardingConfig::default(), tracker.clone())
                .unwrap();
        (engine, tracker)
    }

    fn packet(src: NodeAddress, dest: NodeAddress) -> Packet {
        Packet::new(src, dest, 64, Duration::ZERO)
    }

    #[test]
    fn local_delivery_keeps_hop_count_and_source() {
        let topo = build_topology(
            &[(1, NodeBehavior::People), (2, NodeBehavior::People)],
            &[(1, 2)],
        );
        let (engine, tracker) = engine(&topo, 2);

        let mut incoming = packet(1, 2);
        incoming.hop_count = 3;
        incoming.next_hop = Some(2);

        match engine.forward(incoming) {
            Outcome::Delivered(delivered) => {
                assert_eq!(delivered.hop_count, 3);
                assert_eq!(delivered.src, 1);
            }
            other => panic!("expected local delivery, got {other:?}"),
        }
        assert_eq!(
            tracker.signals(),
            vec![Signal::OutputInterface {
                node: 2,
                interface: LOCAL_OUTPUT_INTERFACE
            }]
        );
    }

    #[test]
    fn people_unicast_rewrites_next_hop() {
        let topo = build_topology(
            &[
                (1, NodeBehavior::People),
                (2, NodeBehavior::Grid),
                (3, NodeBehavior::People),
            ],
            &[(1, 2), (2, 3)],
        );
        let (engine, tracker) = engine(&topo, 1);

        let Outcome::Forwarded(transmissions) = engine.forward(packet(1, 3)) else {
            panic!("expected unicast forward");
        };
        assert_eq!(transmissions.len(), 1);
        assert_eq!(transmissions[0].interface, 0);
        assert_eq!(transmissions[0].packet.next_hop, Some(2));
        assert_eq!(transmissions[0].packet.hop_count, 1);
        assert_eq!(
            tracker.signals(),
            vec![Signal::OutputInterface {
                node: 1,
                interface: 0
            }]
        );
    }

    #[test]
    fn grid_ignores_the_next_hop_field() {
        // Point-to-point roles never overhear, so a mismatched next hop is
        // still a genuine reception
        let topo = build_topology(
            &[
                (1, NodeBehavior::Grid),
                (2, NodeBehavior::Grid),
                (3, NodeBehavior::Grid),
            ],
            &[(1, 2), (2, 3)],
        );
        let (engine, _tracker) = engine(&topo, 2);

        let mut incoming = packet(1, 3);
        incoming.next_hop = Some(99);
        assert!(matches!(engine.forward(incoming), Outcome::Forwarded(_)));
    }

    #[test]
    fn radio_floods_every_interface() {
        let topo = build_topology(
            &[
                (10, NodeBehavior::Radio),
                (11, NodeBehavior::Radio),
                (12, NodeBehavior::People),
                (13, NodeBehavior::Grid),
            ],
            &[(10, 11), (10, 12), (10, 13)],
        );
        let (engine, _tracker) = engine(&topo, 10);

        let mut incoming = packet(11, 12);
        incoming.next_hop = Some(10);
        incoming.hop_count = 1;

        let Outcome::Forwarded(transmissions) = engine.forward(incoming) else {
            panic!("expected flood");
        };
        let interfaces: Vec<_> = transmissions.iter().map(|t| t.interface).collect();
        assert_eq!(interfaces, vec![0, 1, 2]);
        for transmission in &transmissions {
            assert_eq!(transmission.packet.next_hop, Some(12));
            assert_eq!(transmission.packet.hop_count, 2);
        }
    }

    #[test]
    fn radio_discards_overheard_frames_silently() {
        let topo = build_topology(
            &[(10, NodeBehavior::Radio), (11, NodeBehavior::Radio)],
            &[(10, 11)],
        );
        let (engine, tracker) = engine(&topo, 11);

        let mut overheard = packet(10, 99);
        overheard.next_hop = Some(42);
        overheard.hop_count = 1;

        assert_eq!(engine.forward(overheard), Outcome::Discarded);
        assert!(tracker.signals().is_empty());
    }

    #[test]
    fn radio_discards_its_own_echo() {
        let topo = build_topology(
            &[(10, NodeBehavior::Radio), (11, NodeBehavior::Radio)],
            &[(10, 11)],
        );
        let (engine, tracker) = engine(&topo, 10);

        // 11 re-broadcast our packet and addressed it back at us
        let mut echo = packet(10, 99);
        echo.next_hop = Some(10);
        echo.hop_count = 2;

        assert_eq!(engine.forward(echo), Outcome::Discarded);
        assert!(tracker.signals().is_empty());
    }

    #[test]
    fn converter_discards_overheard_frames_silently() {
        // A converter on a shared segment hears a frame addressed to some
        // other node; it was never a true reception
        let topo = build_topology(
            &[
                (1, NodeBehavior::Converter),
                (2, NodeBehavior::Radio),
                (3, NodeBehavior::Radio),
            ],
            &[(1, 2), (2, 3)],
        );
        let (engine, tracker) = engine(&topo, 1);
        assert_eq!(engine.address(), 1);
        assert_eq!(engine.behavior(), NodeBehavior::Converter);
        assert_eq!(engine.neighbor_table().behavior_on(0), Some(NodeBehavior::Radio));
        // 3 is reachable, so a drop could only come from the overhearing check
        assert!(engine.routing_table().lookup(3).is_some());

        let mut overheard = packet(2, 3);
        overheard.next_hop = Some(3);
        overheard.hop_count = 1;

        assert_eq!(engine.forward(overheard), Outcome::Discarded);
        assert!(tracker.signals().is_empty());
    }

    #[test]
    fn radio_forwards_locally_injected_packets() {
        let topo = build_topology(
            &[(10, NodeBehavior::Radio), (11, NodeBehavior::Radio)],
            &[(10, 11)],
        );
        let (engine, _tracker) = engine(&topo, 10);

        // Fresh from the generator: no next hop yet
        let outcome = engine.forward(packet(10, 11));
        let Outcome::Forwarded(transmissions) = outcome else {
            panic!("expected forward, got {outcome:?}");
        };
        assert_eq!(transmissions.len(), 1);
        assert_eq!(transmissions[0].packet.next_hop, Some(11));
    }

    #[test]
    fn unreachable_destination_emits_drop_with_byte_length() {
        let topo = build_topology(
            &[(1, NodeBehavior::People), (2, NodeBehavior::People)],
            &[(1, 2)],
        );
        let (engine, tracker) = engine(&topo, 1);

        let mut unreachable = packet(1, 99);
        unreachable.byte_length = 1200;

        assert_eq!(engine.forward(unreachable), Outcome::Dropped { dest: 99 });
        assert_eq!(
            tracker.signals(),
            vec![Signal::Drop {
                node: 1,
                byte_length: 1200
            }]
        );
    }

    #[test]
    fn converter_floods_selectively_towards_flood_capable_neighbors() {
        // Converter 1 routes to 5 via radio 2 (interface 0); neighbors are a
        // radio, a person and another converter
        let topo = build_topology(
            &[
                (1, NodeBehavior::Converter),
                (2, NodeBehavior::Radio),
                (3, NodeBehavior::People),
                (4, NodeBehavior::Converter),
                (5, NodeBehavior::People),
            ],
            &[(1, 2), (1, 3), (1, 4), (2, 5)],
        );
        let (engine, tracker) = engine(&topo, 1);

        let mut incoming = packet(3, 5);
        incoming.next_hop = Some(1);
        incoming.hop_count = 1;

        let Outcome::Forwarded(transmissions) = engine.forward(incoming) else {
            panic!("expected selective flood");
        };
        let interfaces: Vec<_> = transmissions.iter().map(|t| t.interface).collect();
        // Interface 1 (people neighbor) is skipped
        assert_eq!(interfaces, vec![0, 2]);
        for transmission in &transmissions {
            assert_eq!(transmission.packet.next_hop, Some(2));
        }
        // Single output-interface signal on the flood path
        assert_eq!(
            tracker.signals(),
            vec![Signal::OutputInterface {
                node: 1,
                interface: 0
            }]
        );
    }

    #[test]
    fn converter_unicast_fallback_emits_signal_twice() {
        // The route to 3 goes through a grid node, so the converter falls
        // back to unicast and re-emits the output-interface signal
        let topo = build_topology(
            &[
                (1, NodeBehavior::Converter),
                (2, NodeBehavior::Grid),
                (3, NodeBehavior::People),
            ],
            &[(1, 2), (2, 3)],
        );
        let (engine, tracker) = engine(&topo, 1);

        let mut incoming = packet(9, 3);
        incoming.next_hop = Some(1);

        let Outcome::Forwarded(transmissions) = engine.forward(incoming) else {
            panic!("expected unicast fallback");
        };
        assert_eq!(transmissions.len(), 1);
        assert_eq!(transmissions[0].interface, 0);
        assert_eq!(
            tracker.signals(),
            vec![
                Signal::OutputInterface {
                    node: 1,
                    interface: 0
                },
                Signal::OutputInterface {
                    node: 1,
                    interface: 0
                },
            ]
        );
    }

    #[test]
    fn converter_unicast_fallback_single_signal_when_quirk_disabled() {
        let topo = build_topology(
            &[
                (1, NodeBehavior::Converter),
                (2, NodeBehavior::Grid),
                (3, NodeBehavior::People),
            ],
            &[(1, 2), (2, 3)],
        );
        let tracker = SignalTracker::new();
        let engine = ForwardingEngine::new(
            &topo,
            1,
            ForwardingConfig {
                duplicate_unicast_signal: false,
            },
            tracker.clone(),
        )
        .unwrap();

        let mut incoming = packet(9, 3);
        incoming.next_hop = Some(1);
        assert!(matches!(engine.forward(incoming), Outcome::Forwarded(_)));
        assert_eq!(tracker.signals().len(), 1);
    }
}
