//! In-memory simulation of a role-based mesh network
//!
//! Every node is assigned a behavior role at configuration time (plain
//! endpoint, grid relay, protocol converter or wireless radio). Routes are
//! precomputed from a static topology snapshot at startup; packets are then
//! forwarded hop by hop according to the owning node's role, with unicast or
//! flood semantics and per-node telemetry.

pub mod network;
pub mod sim;
pub mod stats;
