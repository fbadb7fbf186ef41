use thiserror::Error;

use crate::app::builder::BuildError;
use crate::domain::TaskId;

/// Failures of the caller-facing engine operations.
///
/// Processing failures are not here: those become outcomes.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task id already live: {0}")]
    DuplicateTaskId(TaskId),

    #[error("pending queue is full (max_pending={capacity})")]
    QueueFull { capacity: usize },

    #[error("engine has been shut down")]
    ShutDown,

    #[error("engine already started")]
    AlreadyStarted,

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),
}
