//! # aeolus-ndp::path
//!
//! Path scattering shared by both endpoints: each packet is assigned one
//! route out of the flow's equal-cost path set according to the configured
//! strategy. Randomness comes from the simulation's master RNG.

use aeolus_engine::{route::Route, sim::Simulation};
use aeolus_types::{config::RouteStrategy, id::PathId};
use rand::{seq::SliceRandom, Rng};
use std::rc::Rc;

pub(crate) struct PathScatter {
    strategy: RouteStrategy,
    paths: Vec<Rc<Route>>,
    perm: Vec<usize>,
    pos: usize,
}

impl PathScatter {
    pub fn new(strategy: RouteStrategy) -> Self {
        Self {
            strategy,
            paths: Vec::new(),
            perm: Vec::new(),
            pos: 0,
        }
    }

    pub fn set_paths(&mut self, paths: Vec<Rc<Route>>) {
        self.perm = (0..paths.len()).collect();
        self.pos = 0;
        self.paths = paths;
    }

    /// The route for the next packet.
    pub fn next(&mut self, ctx: &mut Simulation) -> (PathId, Rc<Route>) {
        assert!(!self.paths.is_empty(), "no paths configured");
        let n = self.paths.len();
        let idx = match self.strategy {
            RouteStrategy::SinglePath => 0,
            RouteStrategy::ScatterRandom => ctx.rng.gen_range(0..n),
            RouteStrategy::PullBased => {
                let i = self.pos;
                self.pos = (self.pos + 1) % n;
                i
            }
            RouteStrategy::ScatterPermute => {
                if self.pos == 0 {
                    self.perm.shuffle(&mut ctx.rng);
                }
                let i = self.perm[self.pos];
                self.pos = (self.pos + 1) % n;
                i
            }
        };
        (idx as PathId, self.paths[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aeolus_engine::net::{PacketSink, SinkRef};
    use aeolus_engine::packet::Packet;
    use std::cell::RefCell;

    struct Null;
    impl PacketSink for Null {
        fn receive_packet(&mut self, _pkt: Packet, _ctx: &mut Simulation) {}
        fn node_name(&self) -> &str {
            "null"
        }
    }

    fn routes(n: usize) -> Vec<Rc<Route>> {
        (0..n)
            .map(|_| {
                let sink: SinkRef = Rc::new(RefCell::new(Null));
                Rc::new(Route::new(vec![sink]))
            })
            .collect()
    }

    #[test]
    fn permute_covers_every_path_each_cycle() {
        let mut sim = Simulation::new(13);
        let mut scatter = PathScatter::new(RouteStrategy::ScatterPermute);
        scatter.set_paths(routes(4));
        for _ in 0..3 {
            let mut seen: Vec<PathId> = (0..4).map(|_| scatter.next(&mut sim).0).collect();
            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn single_path_always_picks_the_first() {
        let mut sim = Simulation::new(13);
        let mut scatter = PathScatter::new(RouteStrategy::SinglePath);
        scatter.set_paths(routes(3));
        assert!((0..10).all(|_| scatter.next(&mut sim).0 == 0));
    }

    #[test]
    fn round_robin_cycles_in_order() {
        let mut sim = Simulation::new(13);
        let mut scatter = PathScatter::new(RouteStrategy::PullBased);
        scatter.set_paths(routes(3));
        let picks: Vec<PathId> = (0..6).map(|_| scatter.next(&mut sim).0).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }
}
