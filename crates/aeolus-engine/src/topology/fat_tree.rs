//! # aeolus-engine::topology::fat_tree
//!
//! The three-tier fat-tree: `k` pods of `k/2` edge and `k/2` aggregation
//! switches, `(k/2)^2` cores, `k^3/4` hosts, every link at the host NIC
//! rate. Aggregation switch `a` of every pod connects to cores
//! `a*k/2 .. (a+1)*k/2`, which is what gives any two hosts in different
//! pods `(k/2)^2` equal-cost paths.

use super::{Link, NetLoc};
use crate::{
    net::{AeolusQueue, FifoQueue, QueueLoggerRef, RandomQueue, SinkRef},
    route::Route,
    sim::Simulation,
};
use aeolus_types::{
    config::{QueueKind, QueueSpec},
    id::NodeId,
    time::SimTime,
};
use fxhash::FxHashMap;
use std::{cell::RefCell, rc::Rc};

pub struct FatTreeTopology {
    k: u32,
    hosts: u32,
    link_delay: SimTime,
    links: FxHashMap<(NetLoc, NetLoc), Link>,
    /// Typed handles onto the trimming queues, for end-of-run statistics.
    aeolus_queues: Vec<(String, Rc<RefCell<AeolusQueue>>)>,
}

impl FatTreeTopology {
    /// Builds the smallest fat-tree with at least `requested_hosts` hosts.
    /// The actual host count is `num_hosts()`.
    pub fn build(
        requested_hosts: u32,
        spec: &QueueSpec,
        link_delay: SimTime,
        logger: Option<QueueLoggerRef>,
        sim: &mut Simulation,
    ) -> Self {
        assert!(requested_hosts >= 2, "a topology needs at least two hosts");
        let mut k = 2;
        while k * k * k / 4 < requested_hosts {
            k += 2;
        }
        let hosts = k * k * k / 4;
        tracing::info!(k, hosts, requested_hosts, "building fat-tree");

        let mut topo = Self {
            k,
            hosts,
            link_delay,
            links: FxHashMap::default(),
            aeolus_queues: Vec::new(),
        };

        // Host to edge, both directions.
        for h in 0..hosts {
            let edge = NetLoc::Edge(topo.edge_of(h));
            topo.add_link(NetLoc::Host(h), edge, spec, &logger, sim);
            topo.add_link(edge, NetLoc::Host(h), spec, &logger, sim);
        }
        // Edge to aggregation within each pod.
        let radix = k / 2;
        for pod in 0..k {
            for e in 0..radix {
                for a in 0..radix {
                    let edge = NetLoc::Edge(pod * radix + e);
                    let agg = NetLoc::Agg(pod * radix + a);
                    topo.add_link(edge, agg, spec, &logger, sim);
                    topo.add_link(agg, edge, spec, &logger, sim);
                }
            }
        }
        // Aggregation to core.
        for pod in 0..k {
            for a in 0..radix {
                let agg = NetLoc::Agg(pod * radix + a);
                for c in a * radix..(a + 1) * radix {
                    let core = NetLoc::Core(c);
                    topo.add_link(agg, core, spec, &logger, sim);
                    topo.add_link(core, agg, spec, &logger, sim);
                }
            }
        }
        topo
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn num_hosts(&self) -> u32 {
        self.hosts
    }

    pub fn aeolus_queues(&self) -> &[(String, Rc<RefCell<AeolusQueue>>)] {
        &self.aeolus_queues
    }

    fn pod_of(&self, host: NodeId) -> u32 {
        host / (self.k * self.k / 4)
    }

    /// Global index of the edge switch a host hangs off.
    fn edge_of(&self, host: NodeId) -> u32 {
        let radix = self.k / 2;
        let hosts_per_pod = self.k * self.k / 4;
        let pod = host / hosts_per_pod;
        pod * radix + (host % hosts_per_pod) / radix
    }

    fn add_link(
        &mut self,
        from: NetLoc,
        to: NetLoc,
        spec: &QueueSpec,
        logger: &Option<QueueLoggerRef>,
        sim: &mut Simulation,
    ) {
        let qname = format!("q_{from}_{to}");
        let queue = self.make_queue(spec, qname, logger.clone(), sim);
        let pid = sim.ids.next_source_id();
        let pipe = Rc::new(RefCell::new(crate::net::Pipe::new(
            pid,
            self.link_delay,
            format!("p_{from}_{to}"),
        )));
        sim.eventlist.attach(pid, pipe.clone());
        self.links.insert(
            (from, to),
            Link {
                queue,
                pipe: pipe as SinkRef,
            },
        );
    }

    fn make_queue(
        &mut self,
        spec: &QueueSpec,
        name: String,
        logger: Option<QueueLoggerRef>,
        sim: &mut Simulation,
    ) -> SinkRef {
        let id = sim.ids.next_source_id();
        match spec.kind {
            QueueKind::Aeolus => {
                let q = Rc::new(RefCell::new(AeolusQueue::new(
                    id,
                    spec.bitrate_bps,
                    spec.max_bytes,
                    spec.drop_thresh,
                    name.clone(),
                    logger,
                )));
                sim.eventlist.attach(id, q.clone());
                self.aeolus_queues.push((name, q.clone()));
                q
            }
            QueueKind::Fifo => {
                let q = Rc::new(RefCell::new(FifoQueue::new(
                    id,
                    spec.bitrate_bps,
                    spec.max_bytes,
                    name,
                )));
                sim.eventlist.attach(id, q.clone());
                q
            }
            QueueKind::Random => {
                let q = Rc::new(RefCell::new(RandomQueue::new(
                    id,
                    spec.bitrate_bps,
                    spec.max_bytes,
                    name,
                )));
                sim.eventlist.attach(id, q.clone());
                q
            }
        }
    }

    fn push_hops(&self, hops: &mut Vec<SinkRef>, from: NetLoc, to: NetLoc) {
        let link = self
            .links
            .get(&(from, to))
            .unwrap_or_else(|| panic!("no link {from} -> {to}"));
        hops.push(link.queue.clone());
        hops.push(link.pipe.clone());
    }

    /// Every equal-cost route from `src` to `dst`, queue/pipe alternating,
    /// ending at the destination host's ingress pipe. One route for hosts
    /// on the same edge switch, `k/2` within a pod, `(k/2)^2` across pods.
    pub fn paths(&self, src: NodeId, dst: NodeId) -> Vec<Rc<Route>> {
        assert!(src != dst, "no path from a host to itself");
        assert!(src < self.hosts && dst < self.hosts, "host out of range");

        let radix = self.k / 2;
        let (src_edge, dst_edge) = (self.edge_of(src), self.edge_of(dst));
        let (src_pod, dst_pod) = (self.pod_of(src), self.pod_of(dst));
        let mut paths = Vec::new();

        if src_edge == dst_edge {
            let mut hops = Vec::new();
            self.push_hops(&mut hops, NetLoc::Host(src), NetLoc::Edge(src_edge));
            self.push_hops(&mut hops, NetLoc::Edge(src_edge), NetLoc::Host(dst));
            paths.push(Rc::new(Route::new(hops)));
        } else if src_pod == dst_pod {
            for a in 0..radix {
                let agg = NetLoc::Agg(src_pod * radix + a);
                let mut hops = Vec::new();
                self.push_hops(&mut hops, NetLoc::Host(src), NetLoc::Edge(src_edge));
                self.push_hops(&mut hops, NetLoc::Edge(src_edge), agg);
                self.push_hops(&mut hops, agg, NetLoc::Edge(dst_edge));
                self.push_hops(&mut hops, NetLoc::Edge(dst_edge), NetLoc::Host(dst));
                paths.push(Rc::new(Route::new(hops)));
            }
        } else {
            for a in 0..radix {
                let src_agg = NetLoc::Agg(src_pod * radix + a);
                let dst_agg = NetLoc::Agg(dst_pod * radix + a);
                for c in a * radix..(a + 1) * radix {
                    let core = NetLoc::Core(c);
                    let mut hops = Vec::new();
                    self.push_hops(&mut hops, NetLoc::Host(src), NetLoc::Edge(src_edge));
                    self.push_hops(&mut hops, NetLoc::Edge(src_edge), src_agg);
                    self.push_hops(&mut hops, src_agg, core);
                    self.push_hops(&mut hops, core, dst_agg);
                    self.push_hops(&mut hops, dst_agg, NetLoc::Edge(dst_edge));
                    self.push_hops(&mut hops, NetLoc::Edge(dst_edge), NetLoc::Host(dst));
                    paths.push(Rc::new(Route::new(hops)));
                }
            }
        }
        paths
    }
}
