//! Processor port - Processing Function の差し込み口
//!
//! engine は payload を渡して結果か失敗を受け取るだけ。中身は black box。

use async_trait::async_trait;

use crate::domain::ProcessError;

/// Processor は payload を結果に変換する
///
/// # 使用例
/// ```ignore
/// struct Shout;
///
/// #[async_trait]
/// impl Processor for Shout {
///     async fn process(&self, payload: String) -> Result<String, ProcessError> {
///         Ok(payload.to_uppercase())
///     }
/// }
/// ```
///
/// # 契約
/// - 呼び出しは worker loop から一度に一つだけ（重なることはない）
/// - 途中で中断されない。cancel は結果の配送を止めるだけ
/// - panic は worker loop が捕まえて `ProcessError::Panicked` にする
/// - There is no timeout: a processor that never returns stalls the engine.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    async fn process(&self, payload: String) -> Result<String, ProcessError>;
}

/// Adapts a plain synchronous closure into a [`Processor`].
pub struct ProcessorFn<F> {
    f: F,
}

/// Wrap `f` so it can be handed to the engine builder.
pub fn processor_fn<F>(f: F) -> ProcessorFn<F>
where
    F: Fn(String) -> Result<String, ProcessError> + Send + Sync + 'static,
{
    ProcessorFn { f }
}

#[async_trait]
impl<F> Processor for ProcessorFn<F>
where
    F: Fn(String) -> Result<String, ProcessError> + Send + Sync + 'static,
{
    async fn process(&self, payload: String) -> Result<String, ProcessError> {
        (self.f)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn processor_fn_forwards_to_closure() {
        let p = processor_fn(|payload: String| {
            if payload.is_empty() {
                Err(ProcessError::failed("empty"))
            } else {
                Ok(payload.len().to_string())
            }
        });

        assert_eq!(p.process("abc".to_string()).await, Ok("3".to_string()));
        assert_eq!(
            p.process(String::new()).await,
            Err(ProcessError::failed("empty"))
        );
    }
}
