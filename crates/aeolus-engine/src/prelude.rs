//! # aeolus-engine::prelude
//!
//! A convenience module that re-exports the most commonly used types from
//! the engine and its dependencies. This simplifies imports for the crates
//! in the workspace that depend on the engine.

pub use crate::{
    clock::Clock,
    eventlist::{EventList, EventSource, EventSourceRef},
    ids::IdGen,
    logfile::{Logfile, LogfileRef, QueueLoggerSimple},
    matrix::ConnectionMatrix,
    net::{
        forward, serialization_ps, AeolusCounters, AeolusQueue, FifoQueue, PacketSink, Pipe,
        QueueEvent, QueueLogger, QueueLoggerRef, RandomQueue, SinkRef,
    },
    packet::{Packet, PacketKind},
    route::Route,
    sim::Simulation,
    topology::FatTreeTopology,
};

pub use aeolus_types::{self, config::*, errors::*, id::*, metrics::*, time::*};
