//! # aeolus-engine::net::queue
//!
//! The plain drop-tail FIFO output queue. Arrivals that would overflow the
//! buffer are dropped and counted; admitted packets are served in order at
//! the link's serialization rate.

use super::{forward, serialization_ps, PacketSink};
use crate::{eventlist::EventSource, packet::Packet, sim::Simulation};
use aeolus_types::{id::SourceId, metrics::*};
use std::collections::VecDeque;

pub struct FifoQueue {
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

impl FifoQueue {
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

impl PacketSink for FifoQueue {
    fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation) {
        let size = pkt.size_bytes() as u64;
        if self.bytes + size > self.max_bytes {
            self.num_dropped += 1;
            tracing::trace!(queue = %self.nodename, flow = pkt.flow_id(), seq = pkt.seq_no(), "drop-tail");
            ::metrics::counter!(
                MET_QUEUE_PKT_DROPPED,
                LBL_QUEUE => self.nodename.clone(),
                LBL_REASON => "tail"
            )
            .increment(1);
            return;
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

impl EventSource for FifoQueue {
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
    fn overflow_drops_the_arrival_and_counts_it() {
        let mut sim = Simulation::new(1);
        let (c, sink) = collector("dst");
        let qid = sim.ids.next_source_id();
        let q = Rc::new(RefCell::new(FifoQueue::new(
            qid,
            10_000_000_000,
            3000,
            "q0".into(),
        )));
        sim.eventlist.attach(qid, q.clone());
        let q_sink: SinkRef = q.clone();
        let route = Rc::new(Route::new(vec![q_sink, sink]));

        for seq in 0..3u64 {
            let pkt = Packet::new_data(seq, 1, seq, 1500, route.clone(), 0);
            forward(pkt, &mut sim);
        }
        sim.run();

        assert_eq!(q.borrow().num_dropped(), 1);
        assert_eq!(q.borrow().num_packets(), 2);
        assert_eq!(q.borrow().queuesize(), 0);
        assert_eq!(c.borrow().got.len(), 2);
    }
}
