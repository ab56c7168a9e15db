//! QueueManager - 3 つの backend にまたがる cursor 付き Save / Load

use std::sync::Arc;

use tracing::{debug, info};

use super::cursor::{self, CursorStart};
use super::registry::QueueRegistry;
use crate::domain::{
    Artifact, ArtifactMeta, LoadDevice, Placement, QueueKey, StorageMode, StoreDevice, StoreError,
    TensorTriplet,
};
use crate::observability::QueueSnapshot;
use crate::ports::{BackendStore, Clock, IdGenerator, KeySequencer, StorageHandle, UlidGenerator};

/// One backend per mode.
#[derive(Clone)]
pub struct BackendSet {
    pub cpu: Arc<dyn BackendStore>,
    pub gpu: Arc<dyn BackendStore>,
    pub disk: Arc<dyn BackendStore>,
}

impl BackendSet {
    pub fn for_mode(&self, mode: StorageMode) -> &Arc<dyn BackendStore> {
        let store = match mode {
            StorageMode::Cpu => &self.cpu,
            StorageMode::Gpu => &self.gpu,
            StorageMode::Disk => &self.disk,
        };
        debug_assert_eq!(store.mode(), mode, "backend wired to the wrong mode");
        store
    }
}

/// Result of a Save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub key: QueueKey,
    pub meta: ArtifactMeta,
    pub handle: StorageHandle,
    pub queue_size: usize,
    /// The payload handed back unchanged, so the producing job can keep using it.
    pub payload: TensorTriplet,
}

impl SaveOutcome {
    pub fn summary(&self) -> String {
        format!(
            "saved {} to {} (queue size {})",
            self.meta.key, self.key, self.queue_size
        )
    }
}

/// Inputs of a Load besides the queue key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub consume: bool,
    pub start: CursorStart,
    pub load_device: LoadDevice,
}

impl Default for LoadRequest {
    fn default() -> Self {
        Self {
            consume: true,
            start: CursorStart::Stored,
            load_device: LoadDevice::Auto,
        }
    }
}

impl LoadRequest {
    pub fn consume() -> Self {
        Self::default()
    }

    pub fn peek() -> Self {
        Self {
            consume: false,
            ..Self::default()
        }
    }

    pub fn with_start(mut self, start: CursorStart) -> Self {
        self.start = start;
        self
    }

    pub fn with_load_device(mut self, load_device: LoadDevice) -> Self {
        self.load_device = load_device;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedArtifact {
    pub artifact: Artifact,
    pub placement: Placement,
    /// Position the artifact had in the listing it was read from.
    pub position: usize,
}

/// Result of a Load. `artifact` is `None` when the queue is exhausted for this read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome {
    pub key: QueueKey,
    pub artifact: Option<LoadedArtifact>,
    /// The start position actually used.
    pub cursor_before: usize,
    pub cursor_after: usize,
    pub size_before: usize,
    pub size_after: usize,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.artifact.is_none()
    }

    pub fn summary(&self) -> String {
        match &self.artifact {
            Some(loaded) => format!(
                "loaded {} from {} on {} (cursor {} -> {}, size {} -> {})",
                loaded.artifact.key(),
                self.key,
                loaded.placement,
                self.cursor_before,
                self.cursor_after,
                self.size_before,
                self.size_after
            ),
            None => format!(
                "{} has nothing to load at cursor {} (size {})",
                self.key, self.cursor_before, self.size_before
            ),
        }
    }
}

pub struct QueueManager {
    stores: BackendSet,
    registry: QueueRegistry,
    ids: Box<dyn IdGenerator>,
    keys: KeySequencer<Arc<dyn Clock>>,
    auto_device: String,
}

impl QueueManager {
    pub fn new(stores: BackendSet, clock: Arc<dyn Clock>, auto_device: impl Into<String>) -> Self {
        Self {
            stores,
            registry: QueueRegistry::new(),
            ids: Box::new(UlidGenerator::new(Arc::clone(&clock))),
            keys: KeySequencer::new(clock),
            auto_device: auto_device.into(),
        }
    }

    /// Append `payload` to the queue. The cursor is not touched.
    pub fn save(
        &self,
        key: &QueueKey,
        payload: TensorTriplet,
        store_device: StoreDevice,
    ) -> Result<SaveOutcome, StoreError> {
        let store = self.stores.for_mode(key.mode);
        let slot = self.registry.slot(key)?;
        let _state = slot.lock()?;

        let meta = ArtifactMeta {
            id: self.ids.generate_artifact_id(),
            key: self.keys.next_key(),
            store_device: match key.mode {
                StorageMode::Gpu => StoreDevice::Keep,
                _ => store_device,
            },
        };
        let handle = store.put(&key.name, Artifact::new(meta.clone(), payload.clone()))?;
        let queue_size = store.list(&key.name)?.len();

        info!(
            queue = %key,
            artifact = %meta.id,
            bytes = payload.total_bytes(),
            queue_size,
            "artifact saved"
        );
        Ok(SaveOutcome {
            key: key.clone(),
            meta,
            handle,
            queue_size,
            payload,
        })
    }

    /// Read the item at the effective start position, optionally deleting it.
    ///
    /// The whole list -> select -> read -> delete/advance sequence runs under
    /// the queue's lock, so two consuming loads never receive the same item.
    /// Deletion happens only after the payload has been read.
    pub fn load(&self, key: &QueueKey, request: LoadRequest) -> Result<LoadOutcome, StoreError> {
        let store = self.stores.for_mode(key.mode);
        let slot = self.registry.slot(key)?;
        let mut state = slot.lock()?;

        let start = request.start.resolve(state.cursor);
        let entries = store.list(&key.name)?;
        let size_before = entries.len();
        let step = cursor::step(start, size_before, request.consume);

        let Some(entry) = entries.get(start) else {
            state.cursor = step.stored;
            debug!(queue = %key, start, size = size_before, "queue exhausted for this read");
            return Ok(LoadOutcome {
                key: key.clone(),
                artifact: None,
                cursor_before: start,
                cursor_after: step.cursor_after,
                size_before,
                size_after: size_before,
            });
        };

        let artifact = store.get(&key.name, &entry.handle, request.consume)?;
        let size_after = if request.consume {
            size_before - 1
        } else {
            size_before
        };
        state.cursor = step.stored;

        info!(
            queue = %key,
            artifact = %artifact.id(),
            consume = request.consume,
            cursor_before = start,
            cursor_after = step.cursor_after,
            size_before,
            size_after,
            "artifact loaded"
        );
        Ok(LoadOutcome {
            key: key.clone(),
            artifact: Some(LoadedArtifact {
                artifact,
                placement: self.placement(request.load_device),
                position: start,
            }),
            cursor_before: start,
            cursor_after: step.cursor_after,
            size_before,
            size_after,
        })
    }

    /// Current items and cursor of a queue. Does not create the queue.
    pub fn snapshot(&self, key: &QueueKey) -> Result<QueueSnapshot, StoreError> {
        let store = self.stores.for_mode(key.mode);
        let (cursor, entries) = match self.registry.get(key)? {
            Some(slot) => {
                let state = slot.lock()?;
                (state.cursor, store.list(&key.name)?)
            }
            None => (0, store.list(&key.name)?),
        };
        Ok(QueueSnapshot {
            key: key.clone(),
            cursor: cursor.min(entries.len()),
            items: entries.into_iter().map(|e| e.key).collect(),
        })
    }

    fn placement(&self, load_device: LoadDevice) -> Placement {
        match load_device {
            LoadDevice::Cpu => Placement::Host,
            LoadDevice::Auto if self.auto_device.eq_ignore_ascii_case("cpu") => Placement::Host,
            LoadDevice::Auto => Placement::Device(self.auto_device.clone()),
        }
    }
}
