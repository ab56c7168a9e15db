//! DeviceStore - accelerator 常駐の BackendStore（mode = gpu）
//!
//! 各 artifact の 3 成分を DevicePool の slot に置き、index（メタ情報と slot）だけを
//! プロセスメモリに持ちます。
//!
//! # stale handle
//! ホストが device メモリを回収すると slot の読み出しが `StaleHandle` で失敗します。
//! その artifact は二度と読めないので index から外し、エラーはそのまま返します
//! （壊れたデータを黙って返さない）。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::domain::{
    Artifact, ArtifactMeta, Blob, QueueName, StorageMode, StoreError, TensorTriplet,
    COMPONENT_COUNT,
};
use crate::ports::{BackendStore, DevicePool, DeviceSlot, StorageHandle, StoredEntry};

#[derive(Debug, Clone)]
struct DeviceEntry {
    meta: ArtifactMeta,
    slots: [DeviceSlot; COMPONENT_COUNT],
}

pub struct DeviceStore {
    pool: Arc<dyn DevicePool>,
    queues: Mutex<HashMap<QueueName, Vec<DeviceEntry>>>,
}

impl DeviceStore {
    pub fn new(pool: Arc<dyn DevicePool>) -> Self {
        Self {
            pool,
            queues: Mutex::new(HashMap::new()),
        }
    }

    fn upload_all(&self, payload: &TensorTriplet) -> Result<[DeviceSlot; COMPONENT_COUNT], StoreError> {
        let mut slots = Vec::with_capacity(COMPONENT_COUNT);
        for blob in payload.components() {
            match self.pool.upload(blob) {
                Ok(slot) => slots.push(slot),
                Err(e) => {
                    for slot in slots {
                        self.pool.release(slot);
                    }
                    return Err(e);
                }
            }
        }
        slots
            .try_into()
            .map_err(|_| StoreError::Storage("component count mismatch".to_string()))
    }

    fn download_all(&self, entry: &DeviceEntry) -> Result<TensorTriplet, StoreError> {
        let mut blobs: Vec<Blob> = Vec::with_capacity(COMPONENT_COUNT);
        for slot in entry.slots {
            blobs.push(self.pool.download(slot)?);
        }
        let components: [Blob; COMPONENT_COUNT] = blobs
            .try_into()
            .map_err(|_| StoreError::Storage("component count mismatch".to_string()))?;
        Ok(TensorTriplet::from_components(components))
    }
}

impl BackendStore for DeviceStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Gpu
    }

    fn put(&self, queue: &QueueName, artifact: Artifact) -> Result<StorageHandle, StoreError> {
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| StoreError::poisoned("device store"))?;
        let entries = queues.entry(queue.clone()).or_default();
        if entries.iter().any(|e| e.meta.id == artifact.id()) {
            return Err(StoreError::Storage(format!(
                "artifact {} already stored in queue '{queue}'",
                artifact.id()
            )));
        }
        let slots = self.upload_all(&artifact.payload)?;
        let handle = StorageHandle::Device(artifact.id());
        let pos = entries.partition_point(|e| e.meta.key < artifact.key());
        entries.insert(
            pos,
            DeviceEntry {
                meta: artifact.meta,
                slots,
            },
        );
        Ok(handle)
    }

    fn list(&self, queue: &QueueName) -> Result<Vec<StoredEntry>, StoreError> {
        let queues = self
            .queues
            .lock()
            .map_err(|_| StoreError::poisoned("device store"))?;
        Ok(queues
            .get(queue)
            .map(|entries| {
                entries
                    .iter()
                    .map(|e| StoredEntry {
                        handle: StorageHandle::Device(e.meta.id),
                        key: e.meta.key,
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
        let StorageHandle::Device(id) = handle else {
            return Err(StoreError::Storage(format!(
                "handle {handle} does not belong to the device store"
            )));
        };
        let mut queues = self
            .queues
            .lock()
            .map_err(|_| StoreError::poisoned("device store"))?;
        let entries = queues
            .get_mut(queue)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        let pos = entries
            .iter()
            .position(|e| e.meta.id == *id)
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;

        let payload = match self.download_all(&entries[pos]) {
            Ok(payload) => payload,
            Err(err @ StoreError::StaleHandle(_)) => {
                let dead = entries.remove(pos);
                for slot in dead.slots {
                    self.pool.release(slot);
                }
                warn!(
                    device = self.pool.device_name(),
                    queue = %queue,
                    handle = %handle,
                    error = %err,
                    "dropping stale device artifact"
                );
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let meta = if delete {
            let entry = entries.remove(pos);
            for slot in entry.slots {
                self.pool.release(slot);
            }
            entry.meta
        } else {
            entries[pos].meta.clone()
        };
        Ok(Artifact::new(meta, payload))
    }
}
