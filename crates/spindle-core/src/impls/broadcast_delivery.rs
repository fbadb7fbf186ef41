//! BroadcastDelivery - tokio broadcast による配送
//!
//! # 学習ポイント
//! - worker スレッドからは `send` するだけ（非ブロッキング）
//! - 受信側は自分のタスク／スレッドで `recv` する
//! - 後から subscribe した receiver は過去のイベントを受け取らない（replay なし）

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

use crate::domain::WorkerEvent;
use crate::ports::OutcomeSink;

/// BroadcastDelivery はすべての subscriber に WorkerEvent を配る
///
/// # 実装詳細
/// - `broadcast::channel(capacity)` のリングバッファ
/// - 遅い subscriber は古いイベントを取りこぼす（Lagged）。その場合は warn を出して続行
pub struct BroadcastDelivery {
    tx: broadcast::Sender<WorkerEvent>,
}

impl BroadcastDelivery {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Start receiving events emitted from now on.
    pub fn subscribe(&self) -> OutcomeStream {
        OutcomeStream {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl OutcomeSink for BroadcastDelivery {
    fn deliver(&self, event: WorkerEvent) {
        let task_id = event.outcome().task_id().clone();
        // receiver がいないときは捨てる（late subscriber には届かない仕様）
        if self.tx.send(event).is_err() {
            debug!(%task_id, "no subscribers; outcome dropped");
        }
    }
}

/// Receiving half handed to callers.
pub struct OutcomeStream {
    rx: broadcast::Receiver<WorkerEvent>,
}

impl OutcomeStream {
    /// Next event, or `None` once the engine is gone.
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "outcome subscriber lagged; events were dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Blocking variant for callers outside any async runtime.
    ///
    /// # Panics
    /// When called from within an async runtime (same rule as tokio's own
    /// `blocking_recv`).
    pub fn blocking_recv(&mut self) -> Option<WorkerEvent> {
        loop {
            match self.rx.blocking_recv() {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "outcome subscriber lagged; events were dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll. `None` when nothing is buffered right now.
    pub fn try_recv(&mut self) -> Option<WorkerEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "outcome subscriber lagged; events were dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
