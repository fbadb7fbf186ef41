//! EngineBuilder - engine の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）

use std::sync::Arc;

use crate::app::Engine;
use crate::config::{ConfigError, EngineConfig};
use crate::error::EngineError;
use crate::ports::{Clock, IdGenerator, Processor, SystemClock, UlidGenerator};

/// EngineBuilder は Engine を構築
///
/// # 使用例
/// ```ignore
/// let engine = Engine::builder()
///     .config(EngineConfig::from_json_file("spindle.json")?)
///     .processor(ReverseUppercase::new())
///     .start()?;
/// ```
///
/// # Fail-fast 設計
/// - processor 未登録なら build() が BuildError を返す
/// - config は build() 時に検証する
pub struct EngineBuilder {
    config: EngineConfig,
    processor: Option<Arc<dyn Processor>>,
    clock: Option<Arc<dyn Clock>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
}

/// BuildError は engine 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no processor registered; call processor() before build()")]
    MissingProcessor,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            processor: None,
            clock: None,
            id_generator: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Processing Function を登録
    pub fn processor<P: Processor>(mut self, processor: P) -> Self {
        self.processor = Some(Arc::new(processor));
        self
    }

    /// Same as [`processor`](Self::processor) when the caller keeps a handle.
    pub fn shared_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Defaults to a [`UlidGenerator`] driven by the engine clock.
    pub fn id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(id_generator);
        self
    }

    /// Validate and wire everything. The worker is not running yet.
    pub fn build(self) -> Result<Engine, BuildError> {
        self.config.validate()?;
        let processor = self.processor.ok_or(BuildError::MissingProcessor)?;
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let id_generator = self
            .id_generator
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(Engine::new(&self.config, processor, clock, id_generator))
    }

    /// `build()` followed by `Engine::start()`.
    pub fn start(self) -> Result<Engine, EngineError> {
        let engine = self.build()?;
        engine.start()?;
        Ok(engine)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
