//! Task identifiers.
//!
//! # ID の形式
//! - caller が任意の文字列 id を渡せるので、TaskId は String の newtype
//! - engine が生成する場合は ULID ベースの `task-<ULID>` 形式
//!
//! ## ULID を使う理由
//! - **時刻でソート可能**: 生成順に並ぶのでログが追いやすい
//! - **調整不要**: プロセス内で衝突しない（128-bit）

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use ulid::Ulid;

/// Display / 生成時に使うプレフィックス
const GENERATED_PREFIX: &str = "task-";

/// Identifier of a task, unique among the tasks the engine currently holds.
///
/// `Borrow<str>` lets the registry be queried with a plain `&str`, which is
/// what the bridge layer hands us.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// ULID から engine 生成の TaskId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(format!("{GENERATED_PREFIX}{ulid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Was this id produced by the engine (as opposed to supplied by a caller)?
    pub fn is_generated(&self) -> bool {
        self.0
            .strip_prefix(GENERATED_PREFIX)
            .is_some_and(|rest| Ulid::from_string(rest).is_ok())
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
