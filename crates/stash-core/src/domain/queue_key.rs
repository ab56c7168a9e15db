//! QueueKey - backend mode と正規化済みの queue 名の組

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name used when the caller gives none (or nothing usable survives sanitizing).
pub const DEFAULT_QUEUE_NAME: &str = "default";

/// Maximum length of a sanitized queue name, in characters.
pub const MAX_QUEUE_NAME_LEN: usize = 80;

/// Storage medium of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    /// Process memory.
    Cpu,
    /// Accelerator-resident memory.
    Gpu,
    /// Durable files under the configured disk root.
    Disk,
}

impl StorageMode {
    pub const ALL: [StorageMode; 3] = [StorageMode::Cpu, StorageMode::Gpu, StorageMode::Disk];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::Cpu => "cpu",
            StorageMode::Gpu => "gpu",
            StorageMode::Disk => "disk",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown storage mode '{0}' (expected cpu, gpu or disk)")]
pub struct UnknownMode(pub String);

impl FromStr for StorageMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" | "memory" => Ok(StorageMode::Cpu),
            "gpu" | "accelerator" => Ok(StorageMode::Gpu),
            "disk" => Ok(StorageMode::Disk),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// A queue name that is safe to use as a directory name.
///
/// Construction never fails: whitespace is trimmed, runs of characters
/// outside `[A-Za-z0-9_.-]` collapse to one `_`, and the result is cut to
/// [`MAX_QUEUE_NAME_LEN`] characters. Empty input maps to `"default"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct QueueName(String);

impl QueueName {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(sanitize(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for QueueName {
    fn default() -> Self {
        Self(DEFAULT_QUEUE_NAME.to_string())
    }
}

impl From<String> for QueueName {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for QueueName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<QueueName> for String {
    fn from(name: QueueName) -> Self {
        name.0
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut in_bad_run = false;
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            out.push(c);
            in_bad_run = false;
        } else if !in_bad_run {
            out.push('_');
            in_bad_run = true;
        }
    }
    // Only ASCII survives, so byte truncation is char-safe.
    out.truncate(MAX_QUEUE_NAME_LEN);
    if out.is_empty() {
        DEFAULT_QUEUE_NAME.to_string()
    } else {
        out
    }
}

/// Registry key: one logical queue per (mode, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueKey {
    pub mode: StorageMode,
    pub name: QueueName,
}

impl QueueKey {
    pub fn new(mode: StorageMode, name: impl Into<QueueName>) -> Self {
        Self {
            mode,
            name: name.into(),
        }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mode, self.name)
    }
}
