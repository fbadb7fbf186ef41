//! Task store: registry + pending queue behind a single lock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio::sync::futures::Notified;

use crate::domain::{OutcomeKind, TaskId, TaskRecord, TaskState};
use crate::error::EngineError;
use crate::observability::EngineCounts;

/// Store state.
///
/// Invariants (all under the one mutex):
/// - `registry` holds every live task: queued or in flight, not yet delivered.
/// - `pending` may still hold cancelled records; they are skipped at claim
///   time instead of being searched for and removed on cancel.
/// - `in_flight` is the record the worker loop is processing, if any.
struct StoreState {
    registry: HashMap<TaskId, Arc<TaskRecord>>,
    pending: VecDeque<Arc<TaskRecord>>,
    in_flight: Option<Arc<TaskRecord>>,
    busy: bool,
    accepting: bool,
    counts: EngineCounts,
}

impl StoreState {
    fn new() -> Self {
        Self {
            registry: HashMap::new(),
            pending: VecDeque::new(),
            in_flight: None,
            busy: false,
            accepting: true,
            counts: EngineCounts::default(),
        }
    }

    fn is_in_flight(&self, record: &Arc<TaskRecord>) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, record))
    }

    /// Live tasks that have not been claimed yet.
    fn queued_live(&self) -> usize {
        // id だけでは判定できない: cancel 後に同じ id の新しいタスクが入りうる
        let in_flight_live = self.in_flight.as_ref().is_some_and(|record| {
            self.registry
                .get(record.id().as_str())
                .is_some_and(|current| Arc::ptr_eq(current, record))
        });
        self.registry.len() - usize::from(in_flight_live)
    }

    /// Flag and unregister every live task except the in-flight one, then
    /// drop the whole pending queue.
    fn cancel_queued(&mut self) -> usize {
        let in_flight = self.in_flight.clone();

        let mut cleared = 0;
        self.registry.retain(|_, record| {
            let keep = in_flight
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, record));
            if !keep {
                record.cancel();
                cleared += 1;
            }
            keep
        });
        // worker は lock 外で処理中のものしか持っていないので、丸ごと捨ててよい
        self.pending.clear();
        self.counts.cancelled += cleared as u64;
        cleared
    }

    /// Remove `record` from the registry, but only if the entry is that very
    /// record. A cancelled id may already have been reused by a new task.
    fn remove_exact(&mut self, record: &Arc<TaskRecord>) -> bool {
        match self.registry.get(record.id().as_str()) {
            Some(current) if Arc::ptr_eq(current, record) => {
                self.registry.remove(record.id().as_str());
                true
            }
            _ => false,
        }
    }
}

/// What the worker got from [`TaskStore::claim`].
#[derive(Debug)]
pub enum Claim {
    /// Nothing pending.
    Empty,
    /// Head of the queue was already cancelled; dropped without processing.
    Skipped(Arc<TaskRecord>),
    /// Now in flight.
    Claimed(Arc<TaskRecord>),
}

/// What the worker must do once processing returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Deliver,
    Suppress,
}

/// Point-in-time view for status reporting.
#[derive(Debug, Clone, Copy)]
pub struct StoreSnapshot {
    pub queue_size: usize,
    pub live_tasks: usize,
    pub busy: bool,
    pub accepting: bool,
    pub counts: EngineCounts,
}

/// Registry + pending queue shared between callers and the worker loop.
///
/// Design:
/// - One `std::sync::Mutex` for both structures, held only for O(1)-ish work
///   and never across an `.await`, so callers never wait on processing.
/// - `Notify` wakes the worker on enqueue. A permit is stored if the worker
///   is not waiting yet, so no wake-up is lost.
pub struct TaskStore {
    state: Mutex<StoreState>,
    notify: Notify,
    max_pending: Option<usize>,
}

impl TaskStore {
    pub fn new(max_pending: Option<usize>) -> Self {
        Self {
            state: Mutex::new(StoreState::new()),
            notify: Notify::new(),
            max_pending,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // poison = ロック中に panic した = 不変条件が壊れている。復旧しない
        self.state
            .lock()
            .expect("task store lock poisoned: registry/queue invariants can no longer be trusted")
    }

    /// Register a new task and append it to the tail of the queue.
    pub fn push(&self, record: TaskRecord) -> Result<TaskId, EngineError> {
        let mut state = self.lock();
        if !state.accepting {
            return Err(EngineError::ShutDown);
        }
        if state.registry.contains_key(record.id().as_str()) {
            return Err(EngineError::DuplicateTaskId(record.id().clone()));
        }
        if let Some(capacity) = self.max_pending
            && state.queued_live() >= capacity
        {
            return Err(EngineError::QueueFull { capacity });
        }

        let record = Arc::new(record);
        let id = record.id().clone();
        state.registry.insert(id.clone(), Arc::clone(&record));
        state.pending.push_back(record);
        state.counts.enqueued += 1;

        // Notify outside the lock
        drop(state);
        self.notify.notify_one();
        Ok(id)
    }

    /// Pop the head of the queue.
    pub fn claim(&self) -> Claim {
        let mut state = self.lock();
        let Some(record) = state.pending.pop_front() else {
            state.busy = false;
            return Claim::Empty;
        };

        if record.is_cancelled() {
            // canceller が registry から外し済み
            state.counts.skipped += 1;
            return Claim::Skipped(record);
        }

        state.busy = true;
        state.in_flight = Some(Arc::clone(&record));
        Claim::Claimed(record)
    }

    /// Close out the in-flight task after the processor returned.
    ///
    /// Re-checks the cancellation flag under the lock: a cancel that landed
    /// while the processor was running suppresses delivery.
    pub fn finish(&self, record: &Arc<TaskRecord>, kind: OutcomeKind) -> Finish {
        let mut state = self.lock();
        if state.is_in_flight(record) {
            state.in_flight = None;
        }

        // cancel された場合は canceller が既に外している
        state.remove_exact(record);
        let finish = if record.is_cancelled() {
            state.counts.suppressed += 1;
            Finish::Suppress
        } else {
            match kind {
                OutcomeKind::Success => state.counts.completed += 1,
                OutcomeKind::Failure => state.counts.failed += 1,
            }
            Finish::Deliver
        };

        state.busy = !state.pending.is_empty();
        finish
    }

    /// Flag and unregister one live task. `false` if the id is not live.
    pub fn cancel(&self, id: &str) -> bool {
        let mut state = self.lock();
        match state.registry.remove(id) {
            Some(record) => {
                record.cancel();
                state.counts.cancelled += 1;
                true
            }
            None => false,
        }
    }

    /// Cancel every queued live task and clear the pending queue.
    ///
    /// The in-flight task, if any, is left alone and will be delivered.
    pub fn cancel_all(&self) -> usize {
        self.lock().cancel_queued()
    }

    /// Pending queue length, including cancelled records not yet skipped.
    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    pub fn state_of(&self, id: &str) -> Option<TaskState> {
        let state = self.lock();
        let record = state.registry.get(id)?;
        if state.is_in_flight(record) {
            Some(TaskState::Processing)
        } else {
            Some(TaskState::Queued)
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let state = self.lock();
        StoreSnapshot {
            queue_size: state.pending.len(),
            live_tasks: state.registry.len(),
            busy: state.busy,
            accepting: state.accepting,
            counts: state.counts,
        }
    }

    /// Stop accepting new tasks and cancel everything still queued.
    ///
    /// The in-flight task, if any, stays registered and is delivered.
    /// Returns how many queued tasks were dropped.
    pub fn close(&self) -> usize {
        let mut state = self.lock();
        state.accepting = false;
        state.cancel_queued()
    }

    /// Resolves on the next enqueue (or immediately if one is already stored).
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn record(id: &str) -> TaskRecord {
        TaskRecord::new(TaskId::from(id), format!("payload-{id}"), Utc::now())
    }

    fn claimed(store: &TaskStore) -> Arc<TaskRecord> {
        match store.claim() {
            Claim::Claimed(record) => record,
            other => panic!("expected Claimed, got {other:?}"),
        }
    }

    #[test]
    fn push_registers_and_queues() {
        let store = TaskStore::new(None);
        let id = store.push(record("a")).unwrap();

        assert_eq!(id.as_str(), "a");
        assert_eq!(store.len(), 1);
        assert_eq!(store.state_of("a"), Some(TaskState::Queued));
        assert_eq!(store.snapshot().counts.enqueued, 1);
    }

    #[test]
    fn claim_is_fifo() {
        let store = TaskStore::new(None);
        for id in ["a", "b", "c"] {
            store.push(record(id)).unwrap();
        }

        for expected in ["a", "b", "c"] {
            let r = claimed(&store);
            assert_eq!(r.id().as_str(), expected);
            assert_eq!(store.finish(&r, OutcomeKind::Success), Finish::Deliver);
        }
        assert!(matches!(store.claim(), Claim::Empty));
    }

    #[test]
    fn claim_marks_processing_and_busy() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();
        store.push(record("b")).unwrap();

        let r = claimed(&store);
        assert!(store.is_busy());
        assert_eq!(store.state_of("a"), Some(TaskState::Processing));
        assert_eq!(store.state_of("b"), Some(TaskState::Queued));
        assert_eq!(store.len(), 1);

        store.finish(&r, OutcomeKind::Success);
        // b がまだ残っているので busy のまま
        assert!(store.is_busy());
        assert_eq!(store.state_of("a"), None);

        let r = claimed(&store);
        store.finish(&r, OutcomeKind::Failure);
        assert!(!store.is_busy());

        let counts = store.snapshot().counts;
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.failed, 1);
    }

    #[test]
    fn duplicate_live_id_is_rejected() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();

        let err = store.push(record("a")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTaskId(id) if id.as_str() == "a"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn id_can_be_reused_after_cancel() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();
        assert!(store.cancel("a"));

        store.push(record("a")).unwrap();
        // 先頭の古いレコードは cancel 済みなので skip される
        assert!(matches!(store.claim(), Claim::Skipped(r) if r.is_cancelled()));
        let r = claimed(&store);
        assert_eq!(r.id().as_str(), "a");
        assert!(!r.is_cancelled());
    }

    #[test]
    fn cancel_is_lazy_and_idempotent() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();
        store.push(record("b")).unwrap();

        assert!(store.cancel("a"));
        assert!(!store.cancel("a"));
        assert!(!store.cancel("never-existed"));

        // queue からはまだ消えていない
        assert_eq!(store.len(), 2);
        assert_eq!(store.state_of("a"), None);

        assert!(matches!(store.claim(), Claim::Skipped(r) if r.id().as_str() == "a"));
        assert_eq!(claimed(&store).id().as_str(), "b");
        assert_eq!(store.snapshot().counts.skipped, 1);
        assert_eq!(store.snapshot().counts.cancelled, 1);
    }

    #[test]
    fn cancel_while_in_flight_suppresses() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();
        let r = claimed(&store);

        assert!(store.cancel("a"));
        assert_eq!(store.finish(&r, OutcomeKind::Success), Finish::Suppress);
        assert_eq!(store.snapshot().live_tasks, 0);
        assert_eq!(store.snapshot().counts.suppressed, 1);
        assert_eq!(store.snapshot().counts.completed, 0);
    }

    #[test]
    fn finish_does_not_remove_reused_id() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();
        let old = claimed(&store);

        assert!(store.cancel("a"));
        store.push(record("a")).unwrap();
        assert_eq!(store.finish(&old, OutcomeKind::Success), Finish::Suppress);

        // 新しい "a" は生きている
        assert_eq!(store.state_of("a"), Some(TaskState::Queued));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    fn cancel_all_counts_queued_tasks(#[case] n: usize) {
        let store = TaskStore::new(None);
        for i in 0..n {
            store.push(record(&format!("t{i}"))).unwrap();
        }

        assert_eq!(store.cancel_all(), n);
        assert_eq!(store.len(), 0);
        assert_eq!(store.snapshot().live_tasks, 0);
        assert!(matches!(store.claim(), Claim::Empty));
    }

    #[test]
    fn cancel_all_leaves_in_flight_task() {
        let store = TaskStore::new(None);
        store.push(record("running")).unwrap();
        store.push(record("queued-1")).unwrap();
        store.push(record("queued-2")).unwrap();
        let running = claimed(&store);

        assert_eq!(store.cancel_all(), 2);
        assert!(!running.is_cancelled());
        assert_eq!(store.state_of("running"), Some(TaskState::Processing));
        assert_eq!(store.finish(&running, OutcomeKind::Success), Finish::Deliver);
    }

    #[test]
    fn cancel_all_skips_already_cancelled_entries() {
        let store = TaskStore::new(None);
        store.push(record("a")).unwrap();
        store.push(record("b")).unwrap();
        assert!(store.cancel("a"));

        // a はもう registry にいないので数えない
        assert_eq!(store.cancel_all(), 1);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn max_pending_rejects_when_full() {
        let store = TaskStore::new(Some(2));
        store.push(record("a")).unwrap();
        store.push(record("b")).unwrap();

        let err = store.push(record("c")).unwrap_err();
        assert!(matches!(err, EngineError::QueueFull { capacity: 2 }));

        // claim した分は上限に数えない
        let r = claimed(&store);
        store.push(record("c")).unwrap();
        store.finish(&r, OutcomeKind::Success);

        // cancel した分も数えない
        assert!(store.cancel("b"));
        store.push(record("d")).unwrap();
    }

    #[test]
    fn max_pending_counts_reused_id_while_old_one_is_in_flight() {
        let store = TaskStore::new(Some(1));
        store.push(record("a")).unwrap();
        let old = claimed(&store);

        // 処理中の "a" を cancel して、同じ id で新しいタスクを入れる
        assert!(store.cancel("a"));
        store.push(record("a")).unwrap();

        let err = store.push(record("b")).unwrap_err();
        assert!(matches!(err, EngineError::QueueFull { capacity: 1 }));

        assert_eq!(store.finish(&old, OutcomeKind::Success), Finish::Suppress);
        assert!(matches!(store.push(record("b")), Err(EngineError::QueueFull { .. })));
    }

    #[test]
    fn close_drops_queued_tasks_but_keeps_in_flight() {
        let store = TaskStore::new(None);
        store.push(record("running")).unwrap();
        store.push(record("queued-1")).unwrap();
        store.push(record("queued-2")).unwrap();
        let running = claimed(&store);

        assert_eq!(store.close(), 2);
        assert_eq!(store.len(), 0);
        assert_eq!(store.state_of("queued-1"), None);
        assert!(!store.cancel("queued-2"));
        assert_eq!(store.state_of("running"), Some(TaskState::Processing));
        assert_eq!(store.snapshot().counts.cancelled, 2);

        assert_eq!(store.finish(&running, OutcomeKind::Success), Finish::Deliver);
        assert!(matches!(store.claim(), Claim::Empty));
    }

    #[test]
    fn closed_store_rejects_push() {
        let store = TaskStore::new(None);
        store.close();

        assert!(matches!(store.push(record("a")), Err(EngineError::ShutDown)));
        assert!(!store.snapshot().accepting);
    }

    #[tokio::test]
    async fn push_wakes_waiter() {
        let store = Arc::new(TaskStore::new(None));
        let waiter = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.notified().await }
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        store.push(record("a")).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
