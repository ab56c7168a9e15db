//! BackendStore port - artifact の物理保存（memory / accelerator / disk）
//!
//! Queue Manager はこの trait だけを通して保存先を扱います。
//! mode による分岐は [`StorageMode`] から実装を選ぶ一箇所だけです。
//!
//! # 契約（3 実装共通）
//! - `put` は上書きしない。媒体が書き込みを拒否したら `StoreError`
//! - `list` は作成順（`OrderKey` 昇順）。書きかけの artifact は見えない
//! - `get` は payload をメモリに読み終えてから削除する（部分的な consume を起こさない）
//! - 消えた handle は `StoreError::NotFound`（リトライしない）

use std::fmt;
use std::path::PathBuf;

use crate::domain::{Artifact, ArtifactId, OrderKey, QueueName, StorageMode, StoreError};

/// Opaque handle returned by `put` and `list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageHandle {
    /// Entry in process memory.
    Memory(ArtifactId),
    /// Entry whose components live in accelerator slots.
    Device(ArtifactId),
    /// Container file on disk.
    File(PathBuf),
}

impl fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageHandle::Memory(id) => write!(f, "memory:{id}"),
            StorageHandle::Device(id) => write!(f, "device:{id}"),
            StorageHandle::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// One row of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub handle: StorageHandle,
    pub key: OrderKey,
}

/// Raw put / list / get-or-delete over one storage medium.
///
/// Implementations are shared by every queue of their mode and must be safe
/// to call from several threads; per-queue serialization is the Queue
/// Manager's job.
pub trait BackendStore: Send + Sync {
    fn mode(&self) -> StorageMode;

    fn put(&self, queue: &QueueName, artifact: Artifact) -> Result<StorageHandle, StoreError>;

    /// Current contents of `queue` in creation order. Unknown queues list empty.
    fn list(&self, queue: &QueueName) -> Result<Vec<StoredEntry>, StoreError>;

    fn get(
        &self,
        queue: &QueueName,
        handle: &StorageHandle,
        delete: bool,
    ) -> Result<Artifact, StoreError>;
}
