//! Outcome model: what a caller receives when a task finishes.
//!
//! This module does not know about queues or threads. It only defines the
//! shape of a delivered result and how it is encoded on the event surface.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProcessError, TaskId};

/// Which side of an [`Outcome`] is set. Drives the store counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// Terminal result of one task.
///
/// Exactly one of `result` / `error` is set. The constructors are the only
/// way to build one, so that invariant holds for everything the worker loop
/// emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    task_id: TaskId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,

    #[serde(rename = "processingTimeMs", with = "duration_ms")]
    processing_time: Duration,

    completed_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Outcome {
    pub fn success(
        task_id: TaskId,
        result: impl Into<String>,
        processing_time: Duration,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            result: Some(result.into()),
            processing_time,
            completed_at,
            error: None,
        }
    }

    pub fn failure(
        task_id: TaskId,
        error: impl Into<String>,
        processing_time: Duration,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            result: None,
            processing_time,
            completed_at,
            error: Some(error.into()),
        }
    }

    /// Build from whatever the processor returned.
    pub fn from_result(
        task_id: TaskId,
        result: Result<String, ProcessError>,
        processing_time: Duration,
        completed_at: DateTime<Utc>,
    ) -> Self {
        match result {
            Ok(value) => Self::success(task_id, value, processing_time, completed_at),
            Err(err) => Self::failure(task_id, err.to_string(), processing_time, completed_at),
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn processing_time(&self) -> Duration {
        self.processing_time
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn kind(&self) -> OutcomeKind {
        if self.error.is_some() {
            OutcomeKind::Failure
        } else {
            OutcomeKind::Success
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind() == OutcomeKind::Success
    }
}

/// Durations travel as whole milliseconds.
mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
