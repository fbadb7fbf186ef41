use serde::{Deserialize, Serialize};

/// Cumulative counters since the engine was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineCounts {
    pub enqueued: u64,
    /// Delivered with a result.
    pub completed: u64,
    /// Delivered with an error.
    pub failed: u64,
    /// Successful `cancel_task` calls plus tasks cleared by `cancel_all_tasks`.
    pub cancelled: u64,
    /// Processed, but cancelled before delivery.
    pub suppressed: u64,
    /// Cancelled tasks dropped at dequeue without processing.
    pub skipped: u64,
}
