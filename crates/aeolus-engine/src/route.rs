//! # aeolus-engine::route
//!
//! A `Route` is the ordered list of packet sinks a packet traverses,
//! alternating queue/pipe pairs by convention and terminating in a
//! transport endpoint. Routes are immutable after creation and shared
//! between many packets via `Rc`; nobody mutates them, so the sharing is
//! safe.

use crate::net::SinkRef;

/// An immutable, shared hop list.
pub struct Route {
    hops: Vec<SinkRef>,
}

impl Route {
    pub fn new(hops: Vec<SinkRef>) -> Self {
        Self { hops }
    }

    /// The sink at position `i`. Panics on out-of-range access, which is a
    /// wiring bug.
    pub fn at(&self, i: usize) -> &SinkRef {
        &self.hops[i]
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// A copy of this route with one more sink appended. Topology paths
    /// end at the destination host's ingress; wiring extends each path
    /// with the transport endpoint that terminates it.
    pub fn extended_with(&self, sink: SinkRef) -> Route {
        let mut hops = self.hops.clone();
        hops.push(sink);
        Route { hops }
    }
}
