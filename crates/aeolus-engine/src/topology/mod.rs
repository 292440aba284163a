//! # aeolus-engine::topology
//!
//! Topology builders. A topology owns the queue/pipe pairs of every
//! directed link and enumerates the equal-cost routes between host pairs;
//! transport wiring extends those routes with endpoints.

use crate::net::SinkRef;
use std::fmt;

mod fat_tree;

pub use fat_tree::FatTreeTopology;

/// A position in the switching fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetLoc {
    Host(u32),
    Edge(u32),
    Agg(u32),
    Core(u32),
}

impl fmt::Display for NetLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetLoc::Host(i) => write!(f, "host{i}"),
            NetLoc::Edge(i) => write!(f, "edge{i}"),
            NetLoc::Agg(i) => write!(f, "agg{i}"),
            NetLoc::Core(i) => write!(f, "core{i}"),
        }
    }
}

/// One directed link: the sender-side output queue followed by the
/// propagation pipe.
pub struct Link {
    pub queue: SinkRef,
    pub pipe: SinkRef,
}
