//! # aeolus-engine::matrix
//!
//! The connection matrix: which host talks to which. Kept in a `BTreeMap`
//! so iteration order, and therefore wiring order, is deterministic for a
//! given seed.

use aeolus_types::id::NodeId;
use rand::{seq::SliceRandom, Rng};
use std::collections::BTreeMap;

pub struct ConnectionMatrix {
    nodes: u32,
    /// One source host to its destination list.
    pub connections: BTreeMap<NodeId, Vec<NodeId>>,
}

impl ConnectionMatrix {
    pub fn new(nodes: u32) -> Self {
        assert!(nodes >= 2, "need at least two hosts to connect");
        Self {
            nodes,
            connections: BTreeMap::new(),
        }
    }

    /// Draws `count` random (src, dst) pairs, src != dst.
    pub fn set_random(&mut self, count: u32, rng: &mut impl Rng) {
        for _ in 0..count {
            let src = rng.gen_range(0..self.nodes);
            let mut dst = rng.gen_range(0..self.nodes);
            while dst == src {
                dst = rng.gen_range(0..self.nodes);
            }
            self.connections.entry(src).or_default().push(dst);
        }
    }

    /// A random permutation with no fixed points: every host sends to
    /// exactly one other host.
    pub fn set_permutation(&mut self, rng: &mut impl Rng) {
        let mut dests: Vec<NodeId> = (0..self.nodes).collect();
        dests.shuffle(rng);
        // Break fixed points by swapping with a neighbor.
        for i in 0..dests.len() {
            if dests[i] == i as NodeId {
                let j = (i + 1) % dests.len();
                dests.swap(i, j);
            }
        }
        for (src, dst) in dests.into_iter().enumerate() {
            self.connections
                .entry(src as NodeId)
                .or_default()
                .push(dst);
        }
    }

    /// Total number of (src, dst) pairs.
    pub fn len(&self) -> usize {
        self.connections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// All pairs in deterministic order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.connections
            .iter()
            .flat_map(|(src, dsts)| dsts.iter().map(move |dst| (*src, *dst)))
    }
}
