//! # aeolus-ndp::source
//!
//! The sending endpoint of an NDP flow. Packet-granularity sequence
//! numbers: packet `s` carries bytes `[s*mtu, min((s+1)*mtu, flow_size))`.
//! The initial window goes out blind with the first-RTT flag set; after
//! that acks clock new data and pulls clock retransmissions of trimmed
//! packets. The retransmission-timer scanner calls `check_timeout` to
//! recover packets that were fully dropped.

use crate::path::PathScatter;
use aeolus_engine::{
    eventlist::EventSource,
    logfile::LogfileRef,
    net::{forward, PacketSink},
    packet::{Packet, PacketKind},
    route::Route,
    sim::Simulation,
};
use aeolus_types::{
    config::{RouteStrategy, DEFAULT_MTU_BYTES},
    id::{FlowId, SeqNo, SourceId},
    metrics::*,
    time::{sim_as_secs, sim_as_us, sim_from_us, SimTime},
};
use fxhash::{FxHashMap, FxHashSet};
use std::rc::Rc;

pub struct NdpSrc {
    source_id: SourceId,
    flow_id: FlowId,
    nodename: String,
    mtu: u32,
    cwnd_bytes: u64,
    flow_size: u64,
    total_pkts: u64,
    scatter: PathScatter,
    /// Next new sequence number to send.
    next_seq: SeqNo,
    /// Unacked packets and the time they were last sent.
    in_flight: FxHashMap<SeqNo, SimTime>,
    acked: u64,
    /// Sequences nacked as trimmed, waiting for their pull.
    rtx_pending: FxHashSet<SeqNo>,
    got_feedback: bool,
    start_time: SimTime,
    started: bool,
    done: bool,
    finish_time: Option<SimTime>,
    rto: SimTime,
    new_sent: u64,
    rtx_sent: u64,
    timeouts: u64,
    logfile: Option<LogfileRef>,
}

impl NdpSrc {
    pub fn new(
        source_id: SourceId,
        flow_id: FlowId,
        nodename: String,
        strategy: RouteStrategy,
    ) -> Self {
        Self {
            source_id,
            flow_id,
            nodename,
            mtu: DEFAULT_MTU_BYTES,
            cwnd_bytes: 23 * DEFAULT_MTU_BYTES as u64,
            flow_size: 0,
            total_pkts: 0,
            scatter: PathScatter::new(strategy),
            next_seq: 0,
            in_flight: FxHashMap::default(),
            acked: 0,
            rtx_pending: FxHashSet::default(),
            got_feedback: false,
            start_time: 0,
            started: false,
            done: false,
            finish_time: None,
            rto: sim_from_us(crate::DEFAULT_MIN_RTO_US),
            new_sent: 0,
            rtx_sent: 0,
            timeouts: 0,
            logfile: None,
        }
    }

    /// The congestion window, in bytes.
    pub fn set_cwnd(&mut self, bytes: u64) {
        self.cwnd_bytes = bytes;
    }

    pub fn set_flowsize(&mut self, bytes: u64) {
        self.flow_size = bytes;
        let mtu = self.mtu as u64;
        self.total_pkts = bytes.div_ceil(mtu).max(1);
    }

    pub fn set_rto(&mut self, rto: SimTime) {
        self.rto = rto;
    }

    pub fn set_logfile(&mut self, logfile: LogfileRef) {
        self.logfile = Some(logfile);
    }

    /// Replaces the path set the flow scatters over.
    pub fn set_paths(&mut self, paths: Vec<Rc<Route>>) {
        self.scatter.set_paths(paths);
    }

    /// Registers the outgoing path set and schedules the flow start.
    pub fn connect(&mut self, paths: Vec<Rc<Route>>, start_time: SimTime, ctx: &mut Simulation) {
        self.scatter.set_paths(paths);
        self.start_time = start_time;
        ctx.eventlist.schedule_at(self.source_id, start_time);
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish_time(&self) -> Option<SimTime> {
        self.finish_time
    }

    /// Flow completion time, once the flow is done.
    pub fn fct(&self) -> Option<SimTime> {
        self.finish_time
            .map(|t| t.saturating_sub(self.start_time))
    }

    pub fn num_new_sent(&self) -> u64 {
        self.new_sent
    }

    pub fn num_rtx_sent(&self) -> u64 {
        self.rtx_sent
    }

    pub fn num_timeouts(&self) -> u64 {
        self.timeouts
    }

    fn cwnd_pkts(&self) -> u64 {
        (self.cwnd_bytes / self.mtu as u64).max(1)
    }

    fn size_of(&self, seq: SeqNo) -> u32 {
        let rem = self.flow_size.saturating_sub(seq * self.mtu as u64);
        if rem == 0 || rem >= self.mtu as u64 {
            self.mtu
        } else {
            rem as u32
        }
    }

    fn send_data(&mut self, seq: SeqNo, first_rtt: bool, ctx: &mut Simulation) {
        let (path_id, route) = self.scatter.next(ctx);
        let id = ctx.ids.next_packet_id();
        let mut pkt = Packet::new_data(id, self.flow_id, seq, self.size_of(seq), route, path_id);
        pkt.set_first_rtt(first_rtt);
        self.in_flight.insert(seq, ctx.now());
        forward(pkt, ctx);
    }

    /// Sends new data while the window allows. Packets going out before
    /// any feedback has arrived are still in the flow's first round trip.
    fn pump_new(&mut self, ctx: &mut Simulation) {
        let first_rtt = !self.got_feedback;
        while self.next_seq < self.total_pkts && (self.in_flight.len() as u64) < self.cwnd_pkts() {
            let seq = self.next_seq;
            self.next_seq += 1;
            self.new_sent += 1;
            self.send_data(seq, first_rtt, ctx);
        }
    }

    /// Called by the scanner: retransmits the oldest unacked packet once
    /// its timeout expires. Recovers fully dropped packets and lost acks.
    pub fn check_timeout(&mut self, ctx: &mut Simulation) {
        if self.done || self.in_flight.is_empty() {
            return;
        }
        let oldest = self
            .in_flight
            .iter()
            .min_by_key(|(seq, sent)| (**sent, **seq))
            .map(|(seq, sent)| (*seq, *sent));
        let Some((seq, sent)) = oldest else { return };
        if ctx.now().saturating_sub(sent) >= self.rto {
            self.timeouts += 1;
            self.rtx_sent += 1;
            self.rtx_pending.remove(&seq);
            tracing::debug!(flow = self.flow_id, seq, "timeout retransmit");
            ::metrics::counter!(MET_FLOW_RTX, LBL_FLOW => self.flow_id.to_string()).increment(1);
            self.send_data(seq, false, ctx);
        }
    }

    fn complete(&mut self, ctx: &mut Simulation) {
        self.done = true;
        let now = ctx.now();
        self.finish_time = Some(now);
        let fct = now.saturating_sub(self.start_time);
        tracing::info!(
            flow = self.flow_id,
            bytes = self.flow_size,
            fct_us = sim_as_us(fct),
            rtx = self.rtx_sent,
            "flow completed"
        );
        ::metrics::counter!(MET_FLOW_COMPLETED).increment(1);
        if let Some(logfile) = &self.logfile {
            logfile.borrow_mut().write_record(
                now,
                &format!(
                    "ndp_src {} finished bytes={} fct={:.9}",
                    self.nodename,
                    self.flow_size,
                    sim_as_secs(fct)
                ),
            );
        }
    }
}

impl PacketSink for NdpSrc {
    fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation) {
        let seq = pkt.seq_no();
        match pkt.kind() {
            PacketKind::Ack => {
                self.got_feedback = true;
                if self.in_flight.remove(&seq).is_some() {
                    self.acked += 1;
                    self.rtx_pending.remove(&seq);
                    if self.acked == self.total_pkts {
                        self.complete(ctx);
                    } else {
                        self.pump_new(ctx);
                    }
                }
            }
            PacketKind::Nack => {
                self.got_feedback = true;
                if !self.done && self.in_flight.contains_key(&seq) {
                    self.rtx_pending.insert(seq);
                }
            }
            PacketKind::Pull => {
                if !self.done && self.rtx_pending.remove(&seq) {
                    self.rtx_sent += 1;
                    self.send_data(seq, false, ctx);
                }
            }
            kind => {
                tracing::trace!(flow = self.flow_id, kind = kind.label(), "unexpected at source");
            }
        }
    }

    fn node_name(&self) -> &str {
        &self.nodename
    }
}

impl EventSource for NdpSrc {
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        // The only scheduled event is the flow start; everything after is
        // packet-clocked or driven by the scanner.
        if !self.started {
            self.started = true;
            tracing::debug!(flow = self.flow_id, pkts = self.total_pkts, "flow start");
            self.pump_new(ctx);
        }
    }
}
