//! # aeolus-types::metrics
//!
//! Defines constants for metric names and labels.
//! Centralizing these constants prevents typos and ensures consistency
//! between the engine (where metrics are emitted) and external consumers.

// --- Metric Names ---
pub const MET_QUEUE_PKT_SERVED: &str = "aeolus_queue_pkt_served_total";
pub const MET_QUEUE_PKT_DROPPED: &str = "aeolus_queue_pkt_dropped_total";
pub const MET_QUEUE_PKT_TRIMMED: &str = "aeolus_queue_pkt_trimmed_total";
pub const MET_QUEUE_PKT_BOUNCED: &str = "aeolus_queue_pkt_bounced_total";
pub const MET_FLOW_COMPLETED: &str = "aeolus_flow_completed_total";
pub const MET_FLOW_RTX: &str = "aeolus_flow_rtx_total";

// --- Label Keys ---
pub const LBL_QUEUE: &str = "queue";
pub const LBL_KIND: &str = "kind";
pub const LBL_REASON: &str = "reason";
pub const LBL_FLOW: &str = "flow";
