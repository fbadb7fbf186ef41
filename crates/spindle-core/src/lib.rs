//! spindle-core
//!
//! Background task-processing engine: a FIFO queue drained by a single
//! worker thread, with lazy cancellation and an outcome broadcast channel.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, outcome, events, state, errors）
//! - **ports**: 抽象化レイヤー（Processor, OutcomeSink, Clock, IdGenerator）
//! - **queue**: task registry + pending queue
//! - **app**: engine, builder, worker_loop, status
//! - **impls**: BroadcastDelivery, ReverseUppercase
//! - **config** / **error** / **observability**: 設定・エラー・カウンタ
//!
//! # 使用例
//! ```ignore
//! let engine = Engine::builder()
//!     .processor(ReverseUppercase::new())
//!     .start()?;
//! let mut outcomes = engine.subscribe();
//! let id = engine.enqueue("Hello")?;
//! let event = outcomes.recv().await;
//! ```

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;

#[cfg(test)]
mod test_support;

pub use app::{BuildError, Engine, EngineBuilder, EngineStatus};
pub use config::{ConfigError, EngineConfig};
pub use domain::{
    EngineState, Outcome, OutcomeKind, ProcessError, TaskId, TaskState, WorkerEvent,
};
pub use error::EngineError;
pub use impls::{OutcomeStream, ReverseUppercase};
pub use observability::EngineCounts;
pub use ports::{Clock, IdGenerator, Processor, processor_fn};
