//! Ports - 抽象化レイヤー
//!
//! engine が外の世界と接する部分を trait として定義します。
//! 実装は `impls` に置き、テストでは差し替えます。

pub mod clock;
pub mod delivery;
pub mod id_generator;
pub mod processor;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery::OutcomeSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::processor::{Processor, ProcessorFn, processor_fn};
