//! QueueRegistry - (mode, queue 名) ごとに遅延生成される slot
//!
//! map のロックは slot の検索と挿入の間だけ保持します。slot はそれぞれ
//! 自分のロックを持つので、別々の queue が互いに待たされることはありません。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::{QueueKey, StoreError};

/// Mutable per-queue state. Items themselves live in the backend store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueState {
    /// Index of the next unread item in the current listing.
    pub cursor: usize,
}

#[derive(Debug, Default)]
pub struct QueueSlot {
    state: Mutex<QueueState>,
}

impl QueueSlot {
    /// Exclusive access for a whole list -> select -> mutate sequence.
    pub fn lock(&self) -> Result<MutexGuard<'_, QueueState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::poisoned("queue"))
    }
}

#[derive(Debug, Default)]
pub struct QueueRegistry {
    slots: Mutex<HashMap<QueueKey, Arc<QueueSlot>>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `key`, created on first use.
    pub fn slot(&self, key: &QueueKey) -> Result<Arc<QueueSlot>, StoreError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::poisoned("queue registry"))?;
        Ok(Arc::clone(slots.entry(key.clone()).or_default()))
    }

    /// Slot for `key` if one exists. Never creates.
    pub fn get(&self, key: &QueueKey) -> Result<Option<Arc<QueueSlot>>, StoreError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::poisoned("queue registry"))?;
        Ok(slots.get(key).cloned())
    }

    /// Known queue keys, sorted.
    pub fn keys(&self) -> Result<Vec<QueueKey>, StoreError> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| StoreError::poisoned("queue registry"))?;
        let mut keys: Vec<QueueKey> = slots.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
