//! # aeolus-types::id
//!
//! Defines the core identifier types used throughout the simulation.
//! Using distinct aliases for different kinds of IDs helps prevent bugs
//! where, for example, a `FlowId` might be accidentally used as a `SeqNo`.

/// A unique identifier for a host (server) in the topology.
/// Invariant: hosts MUST have contiguous IDs from 0 to N-1.
pub type NodeId = u32;

/// A unique identifier for a transport flow. Packets of the same flow
/// share one `FlowId` for counting and transport logic.
pub type FlowId = u64;

/// The index of the path a packet was scattered onto, within its flow's
/// path set. Carried for logging and transport logic only.
pub type PathId = u32;

/// A packet-granularity sequence number within a flow.
pub type SeqNo = u64;

/// A unique identifier for an event source registered with the event list.
pub type SourceId = u64;
