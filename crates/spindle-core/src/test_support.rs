//! Test doubles shared by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use crate::domain::{ProcessError, WorkerEvent};
use crate::ports::{OutcomeSink, Processor};

/// Keeps every delivered event in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkerEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<WorkerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl OutcomeSink for RecordingSink {
    fn deliver(&self, event: WorkerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Uppercases the payload after `delay`, recording how many calls overlap.
///
/// Payloads starting with `"fail"` produce an error.
pub struct InstrumentedProcessor {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl InstrumentedProcessor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Processor for InstrumentedProcessor {
    async fn process(&self, payload: String) -> Result<String, ProcessError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if payload.starts_with("fail") {
            Err(ProcessError::failed(format!("refused: {payload}")))
        } else {
            Ok(payload.to_uppercase())
        }
    }
}

/// Blocks every call until the test lets it through.
///
/// tokio の同期プリミティブなので、engine の worker スレッド（別 runtime）からでも使える。
pub struct GatedProcessor {
    started: Notify,
    release: Semaphore,
}

impl GatedProcessor {
    pub fn new() -> Self {
        Self {
            started: Notify::new(),
            release: Semaphore::new(0),
        }
    }

    /// Resolves once a call has entered the processor.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Let `n` calls complete.
    pub fn open(&self, n: usize) {
        self.release.add_permits(n);
    }
}

#[async_trait]
impl Processor for GatedProcessor {
    async fn process(&self, payload: String) -> Result<String, ProcessError> {
        self.started.notify_one();
        let permit = self
            .release
            .acquire()
            .await
            .map_err(|_| ProcessError::failed("gate closed"))?;
        permit.forget();
        Ok(format!("done:{payload}"))
    }
}
