//! # aeolus-engine::net
//!
//! The network elements: propagation-delay pipes and the output-queue
//! family. Everything that can receive a packet implements the small
//! `PacketSink` capability; queue variants are composed behind it as
//! tagged alternatives rather than a class hierarchy.

use crate::{packet::Packet, sim::Simulation};
use aeolus_types::time::{SimTime, PS_PER_SEC};
use std::{cell::RefCell, rc::Rc};

mod aeolus;
mod pipe;
mod queue;
mod random;

pub use aeolus::{AeolusCounters, AeolusQueue, ServiceState};
pub use pipe::Pipe;
pub use queue::FifoQueue;
pub use random::RandomQueue;

/// Anything that can receive a packet: pipes, queues, transport endpoints.
pub trait PacketSink {
    /// Consumes ownership of `pkt`. Side effects only; the sink never
    /// blocks its caller.
    fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation);

    /// Identity for logs.
    fn node_name(&self) -> &str;
}

pub type SinkRef = Rc<RefCell<dyn PacketSink>>;

/// Hands a packet to the next sink on its route, advancing the cursor.
/// Also used to inject a freshly built packet (cursor at hop 0).
pub fn forward(mut pkt: Packet, ctx: &mut Simulation) {
    let next = pkt.advance();
    next.borrow_mut().receive_packet(pkt, ctx);
}

/// Serialization time of `size_bytes` on a link of `bitrate_bps`, in
/// picoseconds. The intermediate product is computed in u128 so the full
/// operating range is exact.
pub fn serialization_ps(size_bytes: u32, bitrate_bps: u64) -> SimTime {
    debug_assert!(bitrate_bps > 0);
    let bits = size_bytes as u128 * 8;
    ((bits * PS_PER_SEC as u128) / bitrate_bps as u128) as SimTime
}

/// What happened to a packet inside a queue, for sampled text logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    Enqueue,
    Drop,
    Trim,
    Serve,
}

impl QueueEvent {
    pub fn label(self) -> &'static str {
        match self {
            QueueEvent::Enqueue => "enq",
            QueueEvent::Drop => "drop",
            QueueEvent::Trim => "trim",
            QueueEvent::Serve => "serve",
        }
    }
}

/// Receives per-packet queue events for logging. Attached per queue at
/// wiring time; absent by default.
pub trait QueueLogger {
    fn log_queue(&mut self, t: SimTime, queue: &str, ev: QueueEvent, pkt: &Packet);
}

pub type QueueLoggerRef = Rc<RefCell<dyn QueueLogger>>;

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use aeolus_types::id::SeqNo;
    use crate::packet::PacketKind;

    /// Terminal sink for tests: records what arrived and when.
    pub(crate) struct CollectorSink {
        pub name: String,
        pub got: Vec<(PacketKind, SeqNo, SimTime, u32)>,
    }

    impl PacketSink for CollectorSink {
        fn receive_packet(&mut self, pkt: Packet, ctx: &mut Simulation) {
            self.got
                .push((pkt.kind(), pkt.seq_no(), ctx.now(), pkt.size_bytes()));
        }

        fn node_name(&self) -> &str {
            &self.name
        }
    }

    pub(crate) fn collector(name: &str) -> (Rc<RefCell<CollectorSink>>, SinkRef) {
        let c = Rc::new(RefCell::new(CollectorSink {
            name: name.to_string(),
            got: Vec::new(),
        }));
        let sink: SinkRef = c.clone();
        (c, sink)
    }
}
