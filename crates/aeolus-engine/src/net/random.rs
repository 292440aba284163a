//! # aeolus-engine::net::random
//!
//! A drop-tail variant that, on overflow, evicts a uniformly chosen packet
//! already in the buffer and admits the arrival instead. Spreads loss
//! across flows rather than always punishing the newcomer.

use super::{forward, serialization_ps, PacketSink};
use crate::{eventlist::EventSource, packet::Packet, sim::Simulation};
use aeolus_types::{id::SourceId, metrics::*};
use rand::Rng;
use std::collections::VecDeque;

pub struct RandomQueue {
    source_id: SourceId,
    nodename: String,
    bitrate_bps: u64,
    max_bytes: u64,
    queue: VecDeque<Packet>,
    bytes: u64,
    serving: bool,
    num_packets: u64,
    num_dropped: u64,
}

impl RandomQueue {
    pub fn new(source_id: SourceId, bitrate_bps: u64, max_bytes: u64, nodename: String) -> Self {
        assert!(bitrate_bps > 0, "queue {nodename}: zero bitrate");
        assert!(max_bytes > 0, "queue {nodename}: zero buffer");
        Self {
            source_id,
            nodename,
            bitrate_bps,
            max_bytes,
            queue: VecDeque::new(),
            bytes: 0,
            serving: false,
            num_packets: 0,
            num_dropped: 0,
        }
    }

    pub fn queuesize(&self) -> u64 {
        self.bytes
    }

    pub fn num_packets(&self) -> u64 {
        self.num_packets
    }

    pub fn num_dropped(&self) -> u64 {
        self.num_dropped
    }

    fn begin_service(&mut self, ctx: &mut Simulation) {
        let Some(head) = self.queue.front() else {
            self.serving = false;
            return;
        };
        let tx = serialization_ps(head.size_bytes(), self.bitrate_bps);
        self.serving = true;
        ctx.eventlist.schedule_in(self.source_id, tx);
    }
}

impl PacketSink for RandomQueue {
    fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation) {
        let size = pkt.size_bytes() as u64;
        // Evict until the arrival fits. The head may be in service, so the
        // victim is drawn from positions past it when one exists.
        while self.bytes + size > self.max_bytes {
            let lo = usize::from(self.serving && self.queue.len() > 1);
            if self.queue.len() <= lo {
                // Nothing evictable; drop the arrival itself.
                self.num_dropped += 1;
                ::metrics::counter!(
                    MET_QUEUE_PKT_DROPPED,
                    LBL_QUEUE => self.nodename.clone(),
                    LBL_REASON => "random"
                )
                .increment(1);
                return;
            }
            let victim_idx = ctx.rng.gen_range(lo..self.queue.len());
            let victim = self
                .queue
                .remove(victim_idx)
                .expect("victim index in range");
            self.bytes -= victim.size_bytes() as u64;
            self.num_dropped += 1;
            tracing::trace!(queue = %self.nodename, flow = victim.flow_id(), seq = victim.seq_no(), "random eviction");
            ::metrics::counter!(
                MET_QUEUE_PKT_DROPPED,
                LBL_QUEUE => self.nodename.clone(),
                LBL_REASON => "random"
            )
            .increment(1);
        }
        self.bytes += size;
        self.queue.push_back(pkt);
        if !self.serving {
            self.begin_service(ctx);
        }
    }

    fn node_name(&self) -> &str {
        &self.nodename
    }
}

impl EventSource for RandomQueue {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        let Some(pkt) = self.queue.pop_front() else {
            panic!("queue {} completed service while empty", self.nodename);
        };
        self.bytes -= pkt.size_bytes() as u64;
        self.num_packets += 1;
        forward(pkt, ctx);
        self.begin_service(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testutil::collector;
    use crate::{net::SinkRef, route::Route};
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn eviction_keeps_byte_accounting_consistent() {
        let mut sim = Simulation::new(13);
        let (c, sink) = collector("dst");
        let qid = sim.ids.next_source_id();
        let q = Rc::new(RefCell::new(RandomQueue::new(
            qid,
            10_000_000_000,
            4500,
            "rq0".into(),
        )));
        sim.eventlist.attach(qid, q.clone());
        let q_sink: SinkRef = q.clone();
        let route = Rc::new(Route::new(vec![q_sink, sink]));

        for seq in 0..6u64 {
            let pkt = Packet::new_data(seq, 1, seq, 1500, route.clone(), 0);
            forward(pkt, &mut sim);
        }
        sim.run();

        let q = q.borrow();
        assert_eq!(q.num_dropped(), 3);
        assert_eq!(q.queuesize(), 0);
        assert_eq!(c.borrow().got.len(), 3);
    }
}
