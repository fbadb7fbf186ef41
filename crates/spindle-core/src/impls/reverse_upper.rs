//! ReverseUppercase - 参照用の Processing Function
//!
//! payload を反転して大文字にし、処理時刻を付けて返す。
//! 固定の遅延を入れて「重い処理」を模擬する。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ProcessError;
use crate::ports::{Clock, Processor, SystemClock};

/// Default artificial delay per task.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Reverse + uppercase + timestamp.
///
/// `"Hello"` becomes `"OLLEH (processed at 2024-01-01T12:00:00+00:00)"`.
pub struct ReverseUppercase {
    delay: Duration,
    clock: Arc<dyn Clock>,
}

impl ReverseUppercase {
    pub fn new() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The pure part of the transform.
    pub fn transform(payload: &str) -> String {
        payload.chars().rev().collect::<String>().to_uppercase()
    }
}

impl Default for ReverseUppercase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for ReverseUppercase {
    async fn process(&self, payload: String) -> Result<String, ProcessError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!(
            "{} (processed at {})",
            Self::transform(&payload),
            self.clock.now().to_rfc3339()
        ))
    }
}
