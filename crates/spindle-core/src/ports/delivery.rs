//! OutcomeSink port - Delivery Channel
//!
//! worker loop が作った WorkerEvent を caller 側のコンテキストに渡す。

use crate::domain::WorkerEvent;

/// OutcomeSink は worker loop から caller への受け渡し口
///
/// # 設計原則
/// - `deliver` は worker スレッド上で呼ばれる。ブロックしないこと
/// - caller のハンドラをここで直接実行しない（別コンテキストに post するだけ）
/// - Events are delivered in the order `deliver` is called.
pub trait OutcomeSink: Send + Sync {
    fn deliver(&self, event: WorkerEvent);
}
