//! Status - engine の状態スナップショット

use serde::Serialize;

use crate::domain::EngineState;
use crate::observability::EngineCounts;
use crate::queue::StoreSnapshot;

/// Point-in-time view of the engine.
///
/// # 使用例
/// ```ignore
/// let status = engine.status();
/// println!("{}", serde_json::to_string(&status)?);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    /// Pending queue length (may include cancelled tasks not yet skipped).
    pub queue_size: usize,
    /// Queued or in-flight tasks that can still be cancelled.
    pub live_tasks: usize,
    pub subscribers: usize,
    pub counts: EngineCounts,
}

impl EngineStatus {
    pub(crate) fn new(snapshot: StoreSnapshot, worker_running: bool, subscribers: usize) -> Self {
        let state = if !snapshot.accepting {
            EngineState::Stopped
        } else if !worker_running {
            EngineState::Ready
        } else if snapshot.busy {
            EngineState::Busy
        } else {
            EngineState::Idle
        };

        Self {
            state,
            queue_size: snapshot.queue_size,
            live_tasks: snapshot.live_tasks,
            subscribers,
            counts: snapshot.counts,
        }
    }
}
