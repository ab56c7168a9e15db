//! MemoryStore - プロセスメモリ上の BackendStore（mode = cpu）
//!
//! # 実装詳細
//! - `HashMap<QueueName, Vec<Artifact>>` で queue ごとに保持（作成順）
//! - Mutex で排他制御。ロックは 1 操作の間だけ保持する
//! - payload は `Blob`（Arc）なので clone は参照カウントのみ

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Artifact, QueueName, StorageMode, StoreError};
use crate::ports::{BackendStore, StorageHandle, StoredEntry};

#[derive(Default)]
pub struct MemoryStore {
    queues: Mutex<HashMap<QueueName, Vec<Artifact>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackendStore for MemoryStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Cpu
    }

    fn put(&self, queue: &QueueName, artifact: Artifact) -> Result<StorageHandle, StoreError> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| StoreError::poisoned("memory store"))?;
        let items = queues.entry(queue.clone()).or_default();
        if items.iter().any(|a| a.id() == artifact.id()) {
            return Err(StoreError::Storage(format!(
                "artifact {} already stored in queue '{queue}'",
                artifact.id()
            )));
        }
        let handle = StorageHandle::Memory(artifact.id());
        let pos = items.partition_point(|a| a.key() < artifact.key());
        items.insert(pos, artifact);
        Ok(handle)
    }

    fn list(&self, queue: &QueueName) -> Result<Vec<StoredEntry>, StoreError> {
        let queues = self
            .queues
            .lock()
            .map_err(|_| StoreError::poisoned("memory store"))?;
        Ok(queues
            .get(queue)
            .map(|items| {
                items
                    .iter()
                    .map(|a| StoredEntry {
                        handle: StorageHandle::Memory(a.id()),
                        key: a.key(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get(
        &self,
        queue: &QueueName,
        handle: &StorageHandle,
        delete: bool,
    ) -> Result<Artifact, StoreError> {
        let StorageHandle::Memory(id) = handle else {
            return Err(StoreError::Storage(format!(
                "handle {handle} does not belong to the memory store"
            )));
        };
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| StoreError::poisoned("memory store"))?;
        let items = queues
            .get_mut(queue)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        let pos = items
            .iter()
            .position(|a| a.id() == *id)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        if delete {
            Ok(items.remove(pos))
        } else {
            Ok(items[pos].clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactId, ArtifactMeta, OrderKey, StoreDevice, TensorTriplet};
    use ulid::Ulid;

    fn artifact(ns: i64, seq: u64, tag: &str) -> Artifact {
        Artifact::new(
            ArtifactMeta {
                id: ArtifactId::from_ulid(Ulid::new()),
                key: OrderKey::new(ns, seq),
                store_device: StoreDevice::Cpu,
            },
            TensorTriplet::new(tag, "p", "n"),
        )
    }

    #[test]
    fn lists_in_key_order() {
        let store = MemoryStore::new();
        let q = QueueName::new("q");
        store.put(&q, artifact(20, 1, "late")).unwrap();
        store.put(&q, artifact(10, 0, "early")).unwrap();

        let keys: Vec<_> = store.list(&q).unwrap().iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![OrderKey::new(10, 0), OrderKey::new(20, 1)]);
    }

    #[test]
    fn unknown_queue_lists_empty() {
        let store = MemoryStore::new();
        assert!(store.list(&QueueName::new("nope")).unwrap().is_empty());
    }

    #[test]
    fn get_with_delete_removes() {
        let store = MemoryStore::new();
        let q = QueueName::new("q");
        let handle = store.put(&q, artifact(1, 0, "x")).unwrap();

        let peeked = store.get(&q, &handle, false).unwrap();
        assert_eq!(peeked.payload.primary.as_bytes(), b"x");
        assert_eq!(store.list(&q).unwrap().len(), 1);

        store.get(&q, &handle, true).unwrap();
        assert!(store.list(&q).unwrap().is_empty());

        let err = store.get(&q, &handle, true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn refuses_to_overwrite() {
        let store = MemoryStore::new();
        let q = QueueName::new("q");
        let a = artifact(1, 0, "x");
        store.put(&q, a.clone()).unwrap();
        assert!(matches!(store.put(&q, a), Err(StoreError::Storage(_))));
    }
}
