//! Engine - caller 向けの操作面
//!
//! # 主要な操作
//! - enqueue / enqueue_with_id
//! - cancel_task / cancel_all_tasks
//! - queue_size / is_processing_now
//! - subscribe（workerOutcome イベント）
//!
//! worker loop は専用の OS スレッド上の current-thread runtime で動く。
//! caller 側の操作は短いロックを取るだけで、処理の完了を待たない。

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::app::builder::EngineBuilder;
use crate::app::status::EngineStatus;
use crate::app::worker_loop::WorkerLoop;
use crate::config::EngineConfig;
use crate::domain::{TaskId, TaskRecord, TaskState};
use crate::error::EngineError;
use crate::impls::{BroadcastDelivery, OutcomeStream};
use crate::ports::{Clock, IdGenerator, Processor};
use crate::queue::TaskStore;

enum Lifecycle {
    /// Built, worker not spawned yet.
    Ready(WorkerLoop),
    Running(WorkerHandle),
    Stopped,
}

/// Worker thread handle.
/// - `shutdown_tx` で停止を要求
/// - `join` でスレッド終了を待てる
struct WorkerHandle {
    shutdown_tx: watch::Sender<bool>,
    join: thread::JoinHandle<()>,
}

impl WorkerHandle {
    /// Request shutdown. This does not interrupt an in-flight processor call;
    /// the loop exits after it.
    fn request_shutdown(&self) {
        // ignore send error: the worker may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    fn shutdown_and_join(self) {
        self.request_shutdown();
        // worker スレッド自身から呼ばれた場合は join すると自分を待ってしまう
        if self.join.thread().id() == thread::current().id() {
            return;
        }
        if self.join.join().is_err() {
            error!("worker thread panicked");
        }
    }
}

/// Background task-processing engine.
///
/// One instance per process is the intended use; share it by reference (or
/// `Arc`) with whatever exposes the operations.
pub struct Engine {
    store: Arc<TaskStore>,
    delivery: Arc<BroadcastDelivery>,
    id_generator: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    thread_name: String,
    lifecycle: Mutex<Lifecycle>,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub(crate) fn new(
        config: &EngineConfig,
        processor: Arc<dyn Processor>,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
    ) -> Self {
        let store = Arc::new(TaskStore::new(config.max_pending));
        let delivery = Arc::new(BroadcastDelivery::new(config.event_capacity));
        let worker = WorkerLoop::new(
            Arc::clone(&store),
            processor,
            delivery.clone(),
            Arc::clone(&clock),
            config.tick_interval(),
        );

        Self {
            store,
            delivery,
            id_generator,
            clock,
            thread_name: config.worker_thread_name.clone(),
            lifecycle: Mutex::new(Lifecycle::Ready(worker)),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .expect("engine lifecycle lock poisoned")
    }

    /// Spawn the worker thread. Tasks enqueued before this are kept and run
    /// in order once it starts.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle();
        let worker = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Ready(worker) => worker,
            other => {
                let err = match other {
                    Lifecycle::Running(_) => EngineError::AlreadyStarted,
                    _ => EngineError::ShutDown,
                };
                *lifecycle = other;
                return Err(err);
            }
        };

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                *lifecycle = Lifecycle::Ready(worker);
                return Err(EngineError::WorkerSpawn(err));
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let spawned = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || runtime.block_on(worker.run(shutdown_rx)));

        match spawned {
            Ok(join) => {
                *lifecycle = Lifecycle::Running(WorkerHandle { shutdown_tx, join });
                info!(thread = %self.thread_name, "engine started");
                Ok(())
            }
            Err(err) => {
                // worker は spawn 失敗と一緒に drop されたので、もう受け付けない
                self.store.close();
                Err(EngineError::WorkerSpawn(err))
            }
        }
    }

    /// Stop accepting tasks and wait for the worker to exit.
    ///
    /// Blocks until the in-flight task (if any) finishes. Tasks still queued
    /// are dropped without an outcome.
    pub fn shutdown(&self) {
        let dropped = self.store.close();
        if dropped > 0 {
            info!(dropped, "queued tasks dropped at shutdown");
        }
        let previous = std::mem::replace(&mut *self.lifecycle(), Lifecycle::Stopped);
        if let Lifecycle::Running(handle) = previous {
            handle.shutdown_and_join();
            info!("engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running(_))
    }

    /// Queue `payload` under a freshly generated id.
    pub fn enqueue(&self, payload: impl Into<String>) -> Result<TaskId, EngineError> {
        self.push(None, payload.into())
    }

    /// Queue `payload` under a caller-chosen id.
    ///
    /// Fails with [`EngineError::DuplicateTaskId`] while another task with
    /// the same id is still queued or processing. An empty id is treated as
    /// "no id" and a fresh one is generated.
    pub fn enqueue_with_id(
        &self,
        id: impl Into<TaskId>,
        payload: impl Into<String>,
    ) -> Result<TaskId, EngineError> {
        self.push(Some(id.into()), payload.into())
    }

    fn push(&self, id: Option<TaskId>, payload: String) -> Result<TaskId, EngineError> {
        let id = match id {
            Some(id) if !id.as_str().is_empty() => id,
            _ => self.id_generator.generate_task_id(),
        };
        let record = TaskRecord::new(id, payload, self.clock.now());
        let id = self.store.push(record)?;
        debug!(task_id = %id, "task enqueued");
        Ok(id)
    }

    /// `true` if the task was live and is now cancelled; `false` otherwise.
    ///
    /// A task that is already processing still runs to completion, but its
    /// outcome is never delivered.
    pub fn cancel_task(&self, id: &str) -> bool {
        let cancelled = self.store.cancel(id);
        if cancelled {
            debug!(task_id = id, "task cancelled");
        }
        cancelled
    }

    /// Cancel every task that has not been claimed yet.
    ///
    /// Returns how many were cleared. The task currently processing, if any,
    /// is not counted and will still be delivered.
    pub fn cancel_all_tasks(&self) -> usize {
        let cleared = self.store.cancel_all();
        info!(cleared, "cancelled all queued tasks");
        cleared
    }

    pub fn queue_size(&self) -> usize {
        self.store.len()
    }

    pub fn is_processing_now(&self) -> bool {
        self.store.is_busy()
    }

    /// `Queued` / `Processing` for live tasks, `None` once a task is gone.
    pub fn task_state(&self, id: &str) -> Option<TaskState> {
        self.store.state_of(id)
    }

    pub fn status(&self) -> EngineStatus {
        let snapshot = self.store.snapshot();
        EngineStatus::new(
            snapshot,
            self.is_running(),
            self.delivery.subscriber_count(),
        )
    }

    /// Receive `workerOutcome` events emitted from now on.
    pub fn subscribe(&self) -> OutcomeStream {
        self.delivery.subscribe()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("thread_name", &self.thread_name)
            .field("status", &self.status())
            .finish()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let lifecycle = match self.lifecycle.get_mut() {
            Ok(lifecycle) => lifecycle,
            Err(poisoned) => poisoned.into_inner(),
        };
        // join はしない。処理中のタスクが終わればスレッドは自分で抜ける
        if let Lifecycle::Running(handle) = lifecycle {
            handle.request_shutdown();
        }
    }
}
