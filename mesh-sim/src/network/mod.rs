//! Static network model and the per-packet forwarding engine
//!
//! The topology is built once from a [`spec::NetworkSpec`] and never mutated
//! afterwards; routing and neighbor tables are derived from it per node at
//! startup.

pub mod forward;
pub mod packet;
pub mod routing;
pub mod spec;
pub mod topology;
