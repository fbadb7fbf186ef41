//! App - アプリケーション層
//!
//! ports と queue を組み合わせて engine を組み立てます。
//!
//! # 主要コンポーネント
//! - **EngineBuilder**: 構築とワイヤリング
//! - **Engine**: caller 向けの操作面とライフサイクル
//! - **WorkerLoop**: タスク実行ループ（claim→process→finish→deliver）
//! - **EngineStatus**: 状態スナップショット

pub mod builder;
pub mod engine;
pub mod status;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, EngineBuilder};
pub use self::engine::Engine;
pub use self::status::EngineStatus;
pub use self::worker_loop::{Tick, WorkerLoop};
