//! Domain model (ids, task records, outcomes, events, states).
//!
//! queue / thread を前提にしない純粋なデータ型だけを置く。

pub mod errors;
pub mod events;
pub mod ids;
pub mod outcome;
pub mod state;
pub mod task;

pub use self::errors::ProcessError;
pub use self::events::WorkerEvent;
pub use self::ids::TaskId;
pub use self::outcome::{Outcome, OutcomeKind};
pub use self::state::{EngineState, TaskState};
pub use self::task::TaskRecord;
