//! WorkerLoop - タスク実行ループ
//!
//! # フロー（1 tick）
//! 1. TaskStore::claim() で先頭を取る（空なら idle）
//! 2. cancel 済みなら処理せず捨てる
//! 3. Processor を最後まで実行（中断しない）
//! 4. TaskStore::finish() で cancel を再確認し、registry から外す
//! 5. cancel されていなければ OutcomeSink に配送

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{Outcome, OutcomeKind, ProcessError, TaskId, TaskRecord, WorkerEvent};
use crate::ports::{Clock, OutcomeSink, Processor};
use crate::queue::{Claim, Finish, TaskStore};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Queue was empty.
    Idle,
    /// Dropped a task that was cancelled while queued.
    Skipped(TaskId),
    /// Processed and delivered.
    Delivered(TaskId),
    /// Processed, but cancelled before delivery.
    Suppressed(TaskId),
}

/// The single consumer of the task store.
pub struct WorkerLoop {
    store: Arc<TaskStore>,
    processor: Arc<dyn Processor>,
    sink: Arc<dyn OutcomeSink>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
}

impl WorkerLoop {
    pub fn new(
        store: Arc<TaskStore>,
        processor: Arc<dyn Processor>,
        sink: Arc<dyn OutcomeSink>,
        clock: Arc<dyn Clock>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            store,
            processor,
            sink,
            clock,
            tick_interval,
        }
    }

    /// Run until `shutdown_rx` flips to `true` or its sender is dropped.
    ///
    /// An in-flight task always runs to completion before the loop checks
    /// for shutdown again.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            tick_ms = self.tick_interval.as_millis() as u64,
            "worker loop started"
        );

        loop {
            // shutdown が来ていたら抜ける
            if *shutdown_rx.borrow() {
                break;
            }

            if !matches!(self.tick().await, Tick::Idle) {
                continue;
            }

            // 空なら enqueue 通知 / tick 経過 / shutdown のどれかまで待つ
            let stop = tokio::select! {
                changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
                _ = self.store.notified() => false,
                _ = tokio::time::sleep(self.tick_interval) => false,
            };
            if stop {
                break;
            }
        }

        info!("worker loop stopped");
    }

    /// Claim and handle at most one task.
    pub async fn tick(&self) -> Tick {
        let record = match self.store.claim() {
            Claim::Empty => return Tick::Idle,
            Claim::Skipped(record) => {
                debug!(task_id = %record.id(), "skipping task cancelled while queued");
                return Tick::Skipped(record.id().clone());
            }
            Claim::Claimed(record) => record,
        };
        let task_id = record.id().clone();
        debug!(%task_id, "processing task");

        let started = Instant::now();
        let result = self.execute(&record).await;
        let processing_time = started.elapsed();

        let kind = match &result {
            Ok(_) => OutcomeKind::Success,
            Err(_) => OutcomeKind::Failure,
        };

        match self.store.finish(&record, kind) {
            Finish::Suppress => {
                debug!(
                    %task_id,
                    elapsed_ms = processing_time.as_millis() as u64,
                    "task cancelled during processing; outcome suppressed"
                );
                Tick::Suppressed(task_id)
            }
            Finish::Deliver => {
                if let Err(err) = &result {
                    debug!(%task_id, error = %err, "task failed");
                }
                let outcome =
                    Outcome::from_result(task_id.clone(), result, processing_time, self.clock.now());
                self.sink.deliver(WorkerEvent::WorkerOutcome(outcome));
                Tick::Delivered(task_id)
            }
        }
    }

    /// Run the processor on its own task so a panic comes back as a
    /// `JoinError` instead of taking the loop down. Still awaited inline:
    /// never more than one processing call at a time.
    async fn execute(&self, record: &TaskRecord) -> Result<String, ProcessError> {
        let processor = Arc::clone(&self.processor);
        let payload = record.payload().to_string();

        match tokio::spawn(async move { processor.process(payload).await }).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => {
                let message = panic_message(err.into_panic());
                warn!(task_id = %record.id(), %message, "processor panicked");
                Err(ProcessError::Panicked(message))
            }
            Err(err) => Err(ProcessError::failed(format!("processing aborted: {err}"))),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
