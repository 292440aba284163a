//! # aeolus-engine::net::aeolus
//!
//! The dual-priority, trimming output buffer. Data packets queue in the
//! low-priority lane; headers and control packets (ack, nack, pull) queue
//! in the high-priority lane. A data packet that would overflow the buffer
//! is trimmed to a header and re-admitted high, so the receiver still gets
//! the loss signal; a first-RTT data packet above the drop threshold is
//! dropped outright instead, which keeps a new flow's blind burst from
//! flooding the high lane with headers. The two lanes share the link under
//! a weighted round-robin discipline that cannot starve either side.

use super::{forward, serialization_ps, PacketSink, QueueEvent, QueueLoggerRef};
use crate::{
    eventlist::EventSource,
    packet::{Packet, PacketKind},
    sim::Simulation,
};
use aeolus_types::{id::SourceId, metrics::*, time::SimTime};
use serde::Serialize;
use std::collections::VecDeque;

/// Which lane, if any, the queue is currently transmitting from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    ServingLow,
    ServingHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Low,
    High,
}

/// Monotonic per-queue counters. `packets` counts every served packet;
/// `headers` only data packets trimmed here and admitted; `stripped` every
/// trim attempt, admitted or not.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct AeolusCounters {
    pub packets: u64,
    pub headers: u64,
    pub acks: u64,
    pub nacks: u64,
    pub pulls: u64,
    pub stripped: u64,
    pub bounced: u64,
    pub dropped_low: u64,
    pub dropped_high: u64,
}

impl AeolusCounters {
    /// Folds another queue's counters into this one, for run totals.
    pub fn accumulate(&mut self, other: &AeolusCounters) {
        self.packets += other.packets;
        self.headers += other.headers;
        self.acks += other.acks;
        self.nacks += other.nacks;
        self.pulls += other.pulls;
        self.stripped += other.stripped;
        self.bounced += other.bounced;
        self.dropped_low += other.dropped_low;
        self.dropped_high += other.dropped_high;
    }
}

pub struct AeolusQueue {
    source_id: SourceId,
    nodename: String,
    bitrate_bps: u64,
    max_bytes: u64,
    /// Occupancy at or above which a first-RTT data packet is dropped
    /// rather than trimmed.
    drop_thresh: u64,
    queue_low: VecDeque<Packet>,
    queue_high: VecDeque<Packet>,
    bytes_low: u64,
    bytes_high: u64,
    serv: ServiceState,
    ratio_high: u32,
    ratio_low: u32,
    /// Cyclic service credit: values below `ratio_high` pick the high
    /// lane. Only advanced when both lanes are backlogged.
    crt: u32,
    counters: AeolusCounters,
    logger: Option<QueueLoggerRef>,
}

impl AeolusQueue {
    pub fn new(
        source_id: SourceId,
        bitrate_bps: u64,
        max_bytes: u64,
        drop_thresh: u64,
        nodename: String,
        logger: Option<QueueLoggerRef>,
    ) -> Self {
        assert!(bitrate_bps > 0, "queue {nodename}: zero bitrate");
        assert!(max_bytes > 0, "queue {nodename}: zero buffer");
        Self {
            source_id,
            nodename,
            bitrate_bps,
            max_bytes,
            drop_thresh,
            queue_low: VecDeque::new(),
            queue_high: VecDeque::new(),
            bytes_low: 0,
            bytes_high: 0,
            serv: ServiceState::Idle,
            ratio_high: 1,
            ratio_low: 1,
            crt: 0,
            counters: AeolusCounters::default(),
            logger,
        }
    }

    /// Reconfigures the round-robin weights. Defaults are 1:1.
    pub fn set_service_ratio(&mut self, high: u32, low: u32) {
        assert!(high > 0 && low > 0, "service ratio must be positive");
        self.ratio_high = high;
        self.ratio_low = low;
        self.crt = 0;
    }

    pub fn set_drop_thresh(&mut self, bytes: u64) {
        self.drop_thresh = bytes;
    }

    pub fn queuesize(&self) -> u64 {
        self.bytes_low + self.bytes_high
    }

    pub fn bytes_low(&self) -> u64 {
        self.bytes_low
    }

    pub fn bytes_high(&self) -> u64 {
        self.bytes_high
    }

    pub fn service_state(&self) -> ServiceState {
        self.serv
    }

    pub fn counters(&self) -> AeolusCounters {
        self.counters
    }

    pub fn num_packets(&self) -> u64 {
        self.counters.packets
    }
    pub fn num_headers(&self) -> u64 {
        self.counters.headers
    }
    pub fn num_acks(&self) -> u64 {
        self.counters.acks
    }
    pub fn num_nacks(&self) -> u64 {
        self.counters.nacks
    }
    pub fn num_pulls(&self) -> u64 {
        self.counters.pulls
    }
    pub fn num_stripped(&self) -> u64 {
        self.counters.stripped
    }
    pub fn num_bounced(&self) -> u64 {
        self.counters.bounced
    }
    pub fn num_dropped_low(&self) -> u64 {
        self.counters.dropped_low
    }
    pub fn num_dropped_high(&self) -> u64 {
        self.counters.dropped_high
    }

    fn log(&mut self, t: SimTime, ev: QueueEvent, pkt: &Packet) {
        if let Some(logger) = &self.logger {
            logger.borrow_mut().log_queue(t, &self.nodename, ev, pkt);
        }
    }

    fn drop_metric(&self, reason: &'static str) {
        ::metrics::counter!(
            MET_QUEUE_PKT_DROPPED,
            LBL_QUEUE => self.nodename.clone(),
            LBL_REASON => reason
        )
        .increment(1);
    }

    /// Admission rule for the high-priority lane. A full high lane drops
    /// the packet; control traffic overflowing is a design-level error, so
    /// it is counted and warned about but not recovered.
    fn admit_high(&mut self, pkt: Packet, now: SimTime) -> bool {
        let size = pkt.size_bytes() as u64;
        if self.bytes_high + size <= self.max_bytes {
            self.bytes_high += size;
            self.log(now, QueueEvent::Enqueue, &pkt);
            self.queue_high.push_back(pkt);
            true
        } else {
            self.counters.dropped_high += 1;
            tracing::warn!(
                queue = %self.nodename,
                kind = pkt.kind().label(),
                flow = pkt.flow_id(),
                seq = pkt.seq_no(),
                "high-priority lane overflow"
            );
            self.drop_metric("high_overflow");
            self.log(now, QueueEvent::Drop, &pkt);
            false
        }
    }

    /// Picks the lane to serve next and schedules the completion event.
    /// With one lane backlogged the credit counter is left alone; with
    /// both, it cycles through `ratio_high + ratio_low` slots, giving the
    /// high lane exactly `ratio_high` of them.
    fn begin_service(&mut self, ctx: &mut Simulation) {
        let low_head = self.queue_low.front().map(|p| p.size_bytes());
        let high_head = self.queue_high.front().map(|p| p.size_bytes());
        let (lane, size) = match (low_head, high_head) {
            (None, None) => {
                self.serv = ServiceState::Idle;
                return;
            }
            (Some(size), None) => (Lane::Low, size),
            (None, Some(size)) => (Lane::High, size),
            (Some(low), Some(high)) => {
                if self.crt >= self.ratio_high + self.ratio_low {
                    self.crt = 0;
                }
                let pick_high = self.crt < self.ratio_high;
                self.crt += 1;
                if pick_high {
                    (Lane::High, high)
                } else {
                    (Lane::Low, low)
                }
            }
        };
        self.serv = match lane {
            Lane::Low => ServiceState::ServingLow,
            Lane::High => ServiceState::ServingHigh,
        };
        let tx = serialization_ps(size, self.bitrate_bps);
        ctx.eventlist.schedule_in(self.source_id, tx);
    }

    /// Pops the served head, updates accounting and hands the packet to
    /// the next hop, then re-arms or goes idle.
    fn complete_service(&mut self, ctx: &mut Simulation) {
        let lane = match self.serv {
            ServiceState::Idle => panic!("queue {} completed service while idle", self.nodename),
            ServiceState::ServingLow => Lane::Low,
            ServiceState::ServingHigh => Lane::High,
        };
        let pkt = match lane {
            Lane::Low => self.queue_low.pop_front(),
            Lane::High => self.queue_high.pop_front(),
        }
        .unwrap_or_else(|| panic!("queue {} served lane is empty", self.nodename));
        let size = pkt.size_bytes() as u64;
        match lane {
            Lane::Low => self.bytes_low -= size,
            Lane::High => self.bytes_high -= size,
        }
        self.counters.packets += 1;
        match pkt.kind() {
            PacketKind::Ack => self.counters.acks += 1,
            PacketKind::Nack => self.counters.nacks += 1,
            PacketKind::Pull => self.counters.pulls += 1,
            PacketKind::Data | PacketKind::Header => {}
        }
        ::metrics::counter!(
            MET_QUEUE_PKT_SERVED,
            LBL_QUEUE => self.nodename.clone(),
            LBL_KIND => pkt.kind().label()
        )
        .increment(1);
        self.log(ctx.now(), QueueEvent::Serve, &pkt);
        forward(pkt, ctx);
        self.begin_service(ctx);
    }
}

impl PacketSink for AeolusQueue {
    fn receive_packet(&mut self, mut pkt: Packet, ctx: &mut Simulation) {
        let now = ctx.now();
        if pkt.is_bounced() {
            // Bouncing is decided upstream; it is only accounted here.
            self.counters.bounced += 1;
            ::metrics::counter!(MET_QUEUE_PKT_BOUNCED, LBL_QUEUE => self.nodename.clone())
                .increment(1);
        }
        match pkt.kind() {
            PacketKind::Header | PacketKind::Ack | PacketKind::Nack | PacketKind::Pull => {
                self.admit_high(pkt, now);
            }
            PacketKind::Data => {
                let size = pkt.size_bytes() as u64;
                if self.bytes_low + self.bytes_high + size <= self.max_bytes {
                    self.bytes_low += size;
                    self.log(now, QueueEvent::Enqueue, &pkt);
                    self.queue_low.push_back(pkt);
                } else if pkt.is_first_rtt() && self.queuesize() >= self.drop_thresh {
                    // A blind first-window packet above the threshold is
                    // not worth a header: drop it and let the sender's
                    // timeout recover.
                    self.counters.dropped_low += 1;
                    tracing::debug!(
                        queue = %self.nodename,
                        flow = pkt.flow_id(),
                        seq = pkt.seq_no(),
                        "first-rtt drop"
                    );
                    self.drop_metric("first_rtt");
                    self.log(now, QueueEvent::Drop, &pkt);
                } else {
                    self.counters.stripped += 1;
                    tracing::debug!(
                        queue = %self.nodename,
                        flow = pkt.flow_id(),
                        seq = pkt.seq_no(),
                        "trimming to header"
                    );
                    ::metrics::counter!(MET_QUEUE_PKT_TRIMMED, LBL_QUEUE => self.nodename.clone())
                        .increment(1);
                    pkt.trim_to_header();
                    self.log(now, QueueEvent::Trim, &pkt);
                    if self.admit_high(pkt, now) {
                        self.counters.headers += 1;
                    }
                }
            }
        }
        if self.serv == ServiceState::Idle {
            self.begin_service(ctx);
        }
    }

    fn node_name(&self) -> &str {
        &self.nodename
    }
}

impl EventSource for AeolusQueue {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        self.complete_service(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testutil::{collector, CollectorSink};
    use crate::{net::SinkRef, route::Route};
    use aeolus_types::config::HEADER_BYTES;
    use std::{cell::RefCell, rc::Rc};

    const GBPS_10: u64 = 10_000_000_000;

    struct Rig {
        sim: Simulation,
        queue: Rc<RefCell<AeolusQueue>>,
        collector: Rc<RefCell<CollectorSink>>,
        route: Rc<Route>,
    }

    fn rig(max_bytes: u64, drop_thresh: u64) -> Rig {
        let mut sim = Simulation::new(13);
        let (collector, sink) = collector("dst");
        let qid = sim.ids.next_source_id();
        let queue = Rc::new(RefCell::new(AeolusQueue::new(
            qid,
            GBPS_10,
            max_bytes,
            drop_thresh,
            "aq0".into(),
            None,
        )));
        sim.eventlist.attach(qid, queue.clone());
        let q_sink: SinkRef = queue.clone();
        let route = Rc::new(Route::new(vec![q_sink, sink]));
        Rig {
            sim,
            queue,
            collector,
            route,
        }
    }

    impl Rig {
        fn inject_data(&mut self, seq: u64, size: u32, first_rtt: bool) {
            let id = self.sim.ids.next_packet_id();
            let mut pkt = Packet::new_data(id, 1, seq, size, self.route.clone(), 0);
            pkt.set_first_rtt(first_rtt);
            forward(pkt, &mut self.sim);
        }

        fn inject_control(&mut self, kind: PacketKind, seq: u64) {
            let id = self.sim.ids.next_packet_id();
            let pkt = Packet::new_control(id, kind, 1, seq, self.route.clone(), 0);
            forward(pkt, &mut self.sim);
        }
    }

    #[test]
    fn ack_jumps_ahead_of_queued_data_without_preempting() {
        // 4 data packets then an ack; the ack must be served right after
        // the data packet already on the wire.
        let mut r = rig(12_000, 0);
        for seq in 0..4u64 {
            r.inject_data(seq, 1500, false);
        }
        r.inject_control(PacketKind::Ack, 99);
        r.sim.run();

        let kinds: Vec<PacketKind> = r.collector.borrow().got.iter().map(|g| g.0).collect();
        assert_eq!(
            kinds,
            vec![
                PacketKind::Data,
                PacketKind::Ack,
                PacketKind::Data,
                PacketKind::Data,
                PacketKind::Data,
            ]
        );
    }

    #[test]
    fn overflowing_data_is_trimmed_into_the_high_lane() {
        let mut r = rig(3000, 0);
        for seq in 0..3u64 {
            r.inject_data(seq, 1500, false);
        }
        {
            let q = r.queue.borrow();
            assert_eq!(q.num_stripped(), 1);
            assert_eq!(q.num_headers(), 1);
            assert_eq!(q.bytes_low(), 3000);
            assert_eq!(q.bytes_high(), HEADER_BYTES as u64);
        }
        r.sim.run();
        let col = r.collector.borrow();
        assert_eq!(col.got.len(), 3);
        assert!(col.got.iter().any(|g| g.0 == PacketKind::Header && g.1 == 2));
    }

    #[test]
    fn first_rtt_overflow_above_threshold_is_dropped_not_trimmed() {
        let mut r = rig(3000, 3000);
        r.inject_data(0, 1500, false);
        r.inject_data(1, 1500, false);
        r.inject_data(2, 1500, true);
        let q = r.queue.borrow();
        assert_eq!(q.num_stripped(), 0);
        assert_eq!(q.num_headers(), 0);
        assert_eq!(q.num_dropped_low(), 1);
        assert_eq!(q.bytes_high(), 0);
        assert_eq!(q.bytes_low(), 3000);
    }

    #[test]
    fn first_rtt_overflow_below_threshold_still_trims() {
        // Threshold above the occupancy at overflow time: the packet is
        // trimmed like any other.
        let mut r = rig(3000, 100_000);
        r.inject_data(0, 1500, false);
        r.inject_data(1, 1500, false);
        r.inject_data(2, 1500, true);
        let q = r.queue.borrow();
        assert_eq!(q.num_stripped(), 1);
        assert_eq!(q.num_headers(), 1);
    }

    #[test]
    fn serialization_takes_1200ns_for_1500b_at_10gbps() {
        let mut r = rig(12_000, 0);
        r.inject_data(0, 1500, false);
        r.sim.run();
        let col = r.collector.borrow();
        assert_eq!(col.got.len(), 1);
        assert_eq!(col.got[0].2, 1_200_000);
    }

    #[test]
    fn weighted_round_robin_shares_match_one_to_three() {
        let mut r = rig(200_000, 0);
        r.queue.borrow_mut().set_service_ratio(1, 3);
        // Back both lanes up far enough that the first 1000 services all
        // happen with both lanes nonempty.
        for seq in 0..300u64 {
            r.inject_control(PacketKind::Ack, seq);
        }
        for seq in 0..900u64 {
            r.inject_data(seq, 64, false);
        }
        r.sim.run();

        let col = r.collector.borrow();
        let first_thousand = &col.got[..1000];
        let low = first_thousand
            .iter()
            .filter(|g| g.0 == PacketKind::Data)
            .count();
        assert!((740..=760).contains(&low), "low share was {low}");
    }

    #[test]
    fn both_lanes_drain_and_byte_counters_return_to_zero() {
        let mut r = rig(12_000, 0);
        for seq in 0..4u64 {
            r.inject_data(seq, 1500, false);
        }
        r.inject_control(PacketKind::Nack, 0);
        r.inject_control(PacketKind::Pull, 1);
        r.sim.run();
        let q = r.queue.borrow();
        assert_eq!(q.queuesize(), 0);
        assert_eq!(q.service_state(), ServiceState::Idle);
        assert_eq!(q.num_packets(), 6);
        assert_eq!(q.num_nacks(), 1);
        assert_eq!(q.num_pulls(), 1);
        assert_eq!(r.collector.borrow().got.len(), 6);
    }

    #[test]
    fn bounced_flag_is_accounted_on_receive() {
        let mut r = rig(12_000, 0);
        let id = r.sim.ids.next_packet_id();
        let mut pkt = Packet::new_data(id, 1, 0, 1500, r.route.clone(), 0);
        pkt.set_bounced(true);
        forward(pkt, &mut r.sim);
        assert_eq!(r.queue.borrow().num_bounced(), 1);
    }

    #[test]
    fn high_lane_overflow_drops_control_packets() {
        let mut r = rig(128, 0);
        r.inject_control(PacketKind::Ack, 0);
        r.inject_control(PacketKind::Ack, 1);
        r.inject_control(PacketKind::Ack, 2);
        let q = r.queue.borrow();
        assert_eq!(q.bytes_high(), 128);
        assert_eq!(q.num_dropped_high(), 1);
    }

    #[test]
    fn trimmed_header_is_dropped_when_high_lane_is_also_full() {
        // Fill the high lane to capacity, then overflow the low lane: the
        // strip is counted but no header is admitted.
        let mut r = rig(192, 100_000);
        r.inject_control(PacketKind::Ack, 0);
        r.inject_control(PacketKind::Ack, 1);
        r.inject_control(PacketKind::Ack, 2);
        r.inject_data(0, 1500, false);
        let q = r.queue.borrow();
        assert_eq!(q.num_stripped(), 1);
        assert_eq!(q.num_headers(), 0);
    }
}
