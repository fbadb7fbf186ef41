//! Task record: identity + payload + cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use super::TaskId;

/// One unit of submitted work.
///
/// Design:
/// - Registry と pending queue は同じ `Arc<TaskRecord>` を共有する
/// - id / payload / enqueued_at は不変。変わるのは `cancelled` だけ
/// - `cancelled` is monotonic: it only ever goes false -> true.
#[derive(Debug)]
pub struct TaskRecord {
    id: TaskId,
    payload: String,
    enqueued_at: DateTime<Utc>,
    cancelled: AtomicBool,
}

impl TaskRecord {
    pub fn new(id: TaskId, payload: String, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            enqueued_at,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Flag the task as cancelled.
    ///
    /// Returns `true` only for the call that actually flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_is_not_cancelled() {
        let record = TaskRecord::new(TaskId::from("t1"), "hello".to_string(), Utc::now());

        assert_eq!(record.id().as_str(), "t1");
        assert_eq!(record.payload(), "hello");
        assert!(!record.is_cancelled());
    }

    #[test]
    fn cancel_is_monotonic() {
        let record = TaskRecord::new(TaskId::from("t1"), String::new(), Utc::now());

        assert!(record.cancel());
        assert!(record.is_cancelled());

        // 二回目以降は何も変わらない
        assert!(!record.cancel());
        assert!(record.is_cancelled());
    }
}
