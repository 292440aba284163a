//! # aeolus-engine::packet
//!
//! The `Packet` is the opaque unit of transport: a size, a kind tag, a few
//! transport-supplied flags, identifiers for logging, and a cursor along a
//! shared route. Packets are owned values; every `receive_packet` hand-off
//! transfers ownership to the receiving sink. Payload content is not
//! modelled, only its size.

use crate::{net::SinkRef, route::Route};
use aeolus_types::{
    config::HEADER_BYTES,
    errors::SimError,
    id::{FlowId, PathId, SeqNo},
};
use std::rc::Rc;

/// The type tag of a packet. `Header` is a trimmed `Data` packet: it
/// carries only control information at a fixed small size, so a congested
/// switch can shed payload while preserving the loss signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Header,
    Ack,
    Nack,
    Pull,
}

impl PacketKind {
    /// Stable label for metrics and log records.
    pub fn label(self) -> &'static str {
        match self {
            PacketKind::Data => "data",
            PacketKind::Header => "header",
            PacketKind::Ack => "ack",
            PacketKind::Nack => "nack",
            PacketKind::Pull => "pull",
        }
    }
}

/// A packet travelling hop by hop along its route.
pub struct Packet {
    id: u64,
    kind: PacketKind,
    size_bytes: u32,
    flow_id: FlowId,
    seq_no: SeqNo,
    path_id: PathId,
    trimmed: bool,
    bounced: bool,
    first_rtt: bool,
    route: Rc<Route>,
    hop: u32,
}

impl Packet {
    /// A full data packet of `size_bytes` at the start of `route`.
    pub fn new_data(
        id: u64,
        flow_id: FlowId,
        seq_no: SeqNo,
        size_bytes: u32,
        route: Rc<Route>,
        path_id: PathId,
    ) -> Self {
        Self {
            id,
            kind: PacketKind::Data,
            size_bytes,
            flow_id,
            seq_no,
            path_id,
            trimmed: false,
            bounced: false,
            first_rtt: false,
            route,
            hop: 0,
        }
    }

    /// A fixed-size control packet (ack, nack or pull).
    pub fn new_control(
        id: u64,
        kind: PacketKind,
        flow_id: FlowId,
        seq_no: SeqNo,
        route: Rc<Route>,
        path_id: PathId,
    ) -> Self {
        debug_assert!(!matches!(kind, PacketKind::Data));
        Self {
            id,
            kind,
            size_bytes: HEADER_BYTES,
            flow_id,
            seq_no,
            path_id,
            trimmed: false,
            bounced: false,
            first_rtt: false,
            route,
            hop: 0,
        }
    }

    /// Converts a data packet into its trimmed header in place. Flow,
    /// sequence and path identifiers are preserved; only the payload is
    /// shed.
    pub fn trim_to_header(&mut self) {
        self.kind = PacketKind::Header;
        self.size_bytes = HEADER_BYTES;
        self.trimmed = true;
    }

    /// Returns the next sink on the route and advances the cursor.
    /// Running off the end of a route is a simulator bug and aborts.
    pub fn advance(&mut self) -> SinkRef {
        let len = self.route.len() as u32;
        if self.hop >= len {
            panic!(
                "{}",
                SimError::RouteOverrun {
                    hop: self.hop,
                    len,
                }
            );
        }
        let sink = self.route.at(self.hop as usize).clone();
        self.hop += 1;
        sink
    }

    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn kind(&self) -> PacketKind {
        self.kind
    }
    pub fn size_bytes(&self) -> u32 {
        self.size_bytes
    }
    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }
    pub fn seq_no(&self) -> SeqNo {
        self.seq_no
    }
    pub fn path_id(&self) -> PathId {
        self.path_id
    }
    pub fn is_trimmed(&self) -> bool {
        self.trimmed
    }
    pub fn is_bounced(&self) -> bool {
        self.bounced
    }
    pub fn is_first_rtt(&self) -> bool {
        self.first_rtt
    }
    pub fn hop(&self) -> u32 {
        self.hop
    }
    pub fn route(&self) -> &Rc<Route> {
        &self.route
    }

    pub fn set_bounced(&mut self, bounced: bool) {
        self.bounced = bounced;
    }

    pub fn set_first_rtt(&mut self, first_rtt: bool) {
        self.first_rtt = first_rtt;
    }
}
