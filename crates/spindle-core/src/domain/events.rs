//! Events - caller に届くイベント
//!
//! イベント種類は `workerOutcome` の一つだけ。

use serde::{Deserialize, Serialize};

use super::Outcome;

/// Event emitted by the worker loop.
///
/// Encoded as `{"event": "workerOutcome", "payload": {...}}` so a bridge can
/// forward it to its listeners unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum WorkerEvent {
    #[serde(rename = "workerOutcome")]
    WorkerOutcome(Outcome),
}

impl WorkerEvent {
    pub const WORKER_OUTCOME: &'static str = "workerOutcome";

    /// Event name as seen by listeners.
    pub fn name(&self) -> &'static str {
        match self {
            WorkerEvent::WorkerOutcome(_) => Self::WORKER_OUTCOME,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        match self {
            WorkerEvent::WorkerOutcome(outcome) => outcome,
        }
    }

    pub fn into_outcome(self) -> Outcome {
        match self {
            WorkerEvent::WorkerOutcome(outcome) => outcome,
        }
    }
}

impl From<Outcome> for WorkerEvent {
    fn from(outcome: Outcome) -> Self {
        WorkerEvent::WorkerOutcome(outcome)
    }
}
