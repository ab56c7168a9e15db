//! Errors - エラー型と分類
//!
//! - [`StoreError`]: Backend Store 層（I/O, stale handle, NotFound）
//! - [`SelectError`]: Indexed Selector（regex, 空集合, 範囲外）
//! - [`ConfigError`]: 設定ファイル
//! - [`StashError`]: 上記をまとめた crate 全体のエラー
//!
//! Queue の枯渇（`start >= size`）はエラーではありません。空の結果として返します。

use std::path::PathBuf;

use thiserror::Error;

/// Medium-level failures of a Backend Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The accelerator reclaimed the memory behind this handle.
    #[error("stale accelerator handle: {0}")]
    StaleHandle(String),

    #[error("accelerator out of memory: requested {requested} bytes, {available} available")]
    DeviceOutOfMemory { requested: usize, available: usize },

    /// The handle vanished between list and read (a concurrent consumer won).
    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("artifact container error: {0}")]
    Codec(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn poisoned(what: &str) -> Self {
        Self::Storage(format!("{what} lock poisoned"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Which of the two regex filters was malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Include,
    Exclude,
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterKind::Include => f.write_str("include_regex"),
            FilterKind::Exclude => f.write_str("exclude_regex"),
        }
    }
}

/// Failures of the Indexed Selector.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("cannot read root_dir {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {which} pattern {pattern:?}: {message}")]
    Filter {
        which: FilterKind,
        pattern: String,
        message: String,
    },

    #[error("no matching entries under {}", root.display())]
    EmptySelection { root: PathBuf },

    #[error("index {index} out of range (total={total})")]
    IndexOutOfRange { index: i64, total: usize },
}

/// Configuration loading / validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum StashError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_error_names_the_pattern() {
        let err = SelectError::Filter {
            which: FilterKind::Exclude,
            pattern: "(".to_string(),
            message: "unclosed group".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exclude_regex"));
        assert!(msg.contains("\"(\""));
    }

    #[test]
    fn index_error_carries_index_and_total() {
        let err = SelectError::IndexOutOfRange { index: 5, total: 5 };
        assert_eq!(err.to_string(), "index 5 out of range (total=5)");
    }

    #[test]
    fn stash_error_is_transparent() {
        let err: StashError = StoreError::NotFound("x".into()).into();
        assert_eq!(err.to_string(), "artifact not found: x");
    }
}
