//! # aeolus-ndp::sink
//!
//! The receiving endpoint. Data is acked immediately; a trimmed header is
//! nacked immediately and queued for a pull, and the pull pacer spaces
//! PULL packets one MTU serialization time apart so retransmissions arrive
//! at line rate without re-congesting the bottleneck.

use crate::path::PathScatter;
use aeolus_engine::{
    eventlist::EventSource,
    net::{forward, serialization_ps, PacketSink},
    packet::{Packet, PacketKind},
    route::Route,
    sim::Simulation,
};
use aeolus_types::{
    config::{RouteStrategy, DEFAULT_MTU_BYTES},
    id::{FlowId, SeqNo, SourceId},
    time::SimTime,
};
use fxhash::FxHashSet;
use std::{collections::VecDeque, rc::Rc};

pub struct NdpSink {
    source_id: SourceId,
    flow_id: FlowId,
    nodename: String,
    scatter: PathScatter,
    mtu: u32,
    /// Line rate the pull pacer matches.
    bitrate_bps: u64,
    received: FxHashSet<SeqNo>,
    cum_bytes: u64,
    pull_queue: VecDeque<SeqNo>,
    pacer_armed: bool,
    data_seen: u64,
    headers_seen: u64,
    duplicates: u64,
    record_trace: bool,
    delivery_trace: Vec<(SeqNo, SimTime)>,
}

impl NdpSink {
    pub fn new(
        source_id: SourceId,
        flow_id: FlowId,
        nodename: String,
        strategy: RouteStrategy,
        bitrate_bps: u64,
    ) -> Self {
        Self {
            source_id,
            flow_id,
            nodename,
            scatter: PathScatter::new(strategy),
            mtu: DEFAULT_MTU_BYTES,
            bitrate_bps,
            received: FxHashSet::default(),
            cum_bytes: 0,
            pull_queue: VecDeque::new(),
            pacer_armed: false,
            data_seen: 0,
            headers_seen: 0,
            duplicates: 0,
            record_trace: false,
            delivery_trace: Vec::new(),
        }
    }

    /// The reverse path set acks, nacks and pulls are scattered over.
    pub fn set_paths(&mut self, paths: Vec<Rc<Route>>) {
        self.scatter.set_paths(paths);
    }

    /// Enables the per-delivery trace used by reproducibility checks.
    pub fn set_record_trace(&mut self, on: bool) {
        self.record_trace = on;
    }

    pub fn delivery_trace(&self) -> &[(SeqNo, SimTime)] {
        &self.delivery_trace
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    /// Cumulative goodput bytes received.
    pub fn cum_bytes(&self) -> u64 {
        self.cum_bytes
    }

    pub fn num_data(&self) -> u64 {
        self.data_seen
    }

    pub fn num_headers(&self) -> u64 {
        self.headers_seen
    }

    pub fn num_duplicates(&self) -> u64 {
        self.duplicates
    }

    fn pull_spacing(&self) -> SimTime {
        serialization_ps(self.mtu, self.bitrate_bps)
    }

    fn send_control(&mut self, kind: PacketKind, seq: SeqNo, ctx: &mut Simulation) {
        let (path_id, route) = self.scatter.next(ctx);
        let id = ctx.ids.next_packet_id();
        let pkt = Packet::new_control(id, kind, self.flow_id, seq, route, path_id);
        forward(pkt, ctx);
    }
}

impl PacketSink for NdpSink {
    fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation) {
        let seq = pkt.seq_no();
        match pkt.kind() {
            PacketKind::Data => {
                if self.received.insert(seq) {
                    self.cum_bytes += pkt.size_bytes() as u64;
                    self.data_seen += 1;
                    if self.record_trace {
                        self.delivery_trace.push((seq, ctx.now()));
                    }
                } else {
                    self.duplicates += 1;
                }
                self.send_control(PacketKind::Ack, seq, ctx);
            }
            PacketKind::Header => {
                self.headers_seen += 1;
                tracing::debug!(flow = self.flow_id, seq, "header received, nacking");
                self.send_control(PacketKind::Nack, seq, ctx);
                if !self.received.contains(&seq) && !self.pull_queue.contains(&seq) {
                    self.pull_queue.push_back(seq);
                    if !self.pacer_armed {
                        self.pacer_armed = true;
                        ctx.eventlist.schedule_in(self.source_id, self.pull_spacing());
                    }
                }
            }
            kind => {
                tracing::trace!(flow = self.flow_id, kind = kind.label(), "unexpected at sink");
            }
        }
    }

    fn node_name(&self) -> &str {
        &self.nodename
    }
}

impl EventSource for NdpSink {
    /// The pull pacer. Emits one PULL per tick while pulls are pending,
    /// skipping sequences whose data arrived in the meantime.
    fn do_next_event(&mut self, ctx: &mut Simulation) {
        let next = loop {
            match self.pull_queue.pop_front() {
                Some(seq) if self.received.contains(&seq) => continue,
                other => break other,
            }
        };
        let Some(seq) = next else {
            self.pacer_armed = false;
            return;
        };
        self.send_control(PacketKind::Pull, seq, ctx);
        if self.pull_queue.is_empty() {
            self.pacer_armed = false;
        } else {
            ctx.eventlist.schedule_in(self.source_id, self.pull_spacing());
        }
    }
}
