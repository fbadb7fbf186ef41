//! Errors - Processing Function の失敗
//!
//! engine 自体のエラー（enqueue 失敗など）は `crate::error` にある。
//! ここにあるのは worker loop が Outcome に変換する側のエラーだけ。

use thiserror::Error;

/// Failure of a single processing call.
///
/// Never escapes the worker loop: it always ends up as the `error` field of
/// an [`Outcome`](super::Outcome).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The processor returned an error.
    #[error("{0}")]
    Failed(String),

    /// The processor panicked; the panic was caught by the worker loop.
    #[error("processor panicked: {0}")]
    Panicked(String),
}

impl ProcessError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
