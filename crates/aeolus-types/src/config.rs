//! # aeolus-types::config
//!
//! Strongly-typed run configuration shared between the engine, the
//! transport, and the CLI, plus the link-layer constants every run agrees
//! on. The CLI maps its argument surface onto these types.

use serde::{Deserialize, Serialize};

/// Host NIC line rate in bits per second. All fat-tree links run at this
/// rate (full bisection bandwidth).
pub const HOST_NIC_BPS: u64 = 10_000_000_000;

/// Core link rate multiplier over the host NIC rate.
pub const CORE_TO_HOST: u64 = 1;

/// The largest data packet charged to links and queues, in bytes.
pub const DEFAULT_MTU_BYTES: u32 = 1500;

/// Fixed size of a trimmed header and of all control packets, in bytes.
pub const HEADER_BYTES: u32 = 64;

/// Default per-link propagation delay in microseconds.
pub const DEFAULT_LINK_DELAY_US: u64 = 1;

/// Converts a buffer size expressed in MTU-sized packets to bytes.
pub fn mem_from_pkts(pkts: u32) -> u64 {
    pkts as u64 * DEFAULT_MTU_BYTES as u64
}

/// How a source spreads the packets of one flow over its path set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStrategy {
    /// Scatter over a random permutation of the paths, reshuffled each cycle.
    ScatterPermute,
    /// Pick a uniformly random path for every packet.
    ScatterRandom,
    /// Cycle round-robin through the path set.
    PullBased,
    /// Pin the flow to its first path.
    SinglePath,
}

/// Which output-buffer implementation the topology installs on each port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueKind {
    /// Drop-tail FIFO.
    Fifo,
    /// Drop-tail with random eviction of an enqueued packet on overflow.
    Random,
    /// Dual-priority trimming queue (the NDP service discipline).
    Aeolus,
}

/// Per-port queue parameters handed to the topology builder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QueueSpec {
    pub kind: QueueKind,
    pub bitrate_bps: u64,
    pub max_bytes: u64,
    /// Occupancy (bytes) above which first-RTT packets are dropped rather
    /// than trimmed. Only meaningful for `QueueKind::Aeolus`.
    pub drop_thresh: u64,
}

impl QueueSpec {
    pub fn aeolus(max_bytes: u64, drop_thresh: u64) -> Self {
        Self {
            kind: QueueKind::Aeolus,
            bitrate_bps: HOST_NIC_BPS,
            max_bytes,
            drop_thresh,
        }
    }
}
