//! State - タスクと engine の状態

use serde::{Deserialize, Serialize};

/// Observable state of a live task.
///
/// Once a task is delivered, suppressed or skipped it leaves the registry,
/// so there is no terminal variant: lookups return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the pending queue.
    Queued,

    /// Claimed by the worker loop; the processor is running.
    Processing,
}

/// Whether the worker loop is doing something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Not started yet; tasks can be enqueued but nothing runs.
    Ready,
    Idle,
    Busy,
    /// Shut down; enqueue is rejected.
    Stopped,
}
