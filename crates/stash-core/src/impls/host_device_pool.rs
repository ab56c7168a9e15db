//! HostDevicePool - accelerator メモリのホスト側エミュレーション
//!
//! 実デバイスを持たない環境（CI、CPU のみのホスト）で DevicePool を提供します。
//! `reclaim()` はホストによるメモリ回収を再現し、それ以前の slot をすべて stale にします。

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::domain::{Blob, StoreError};
use crate::ports::{DevicePool, DeviceSlot};

struct PoolState {
    epoch: u64,
    next_index: u64,
    slots: HashMap<u64, Blob>,
    used_bytes: usize,
}

pub struct HostDevicePool {
    name: String,
    capacity_bytes: Option<usize>,
    state: Mutex<PoolState>,
}

impl HostDevicePool {
    pub fn new(name: impl Into<String>, capacity_bytes: Option<usize>) -> Self {
        Self {
            name: name.into(),
            capacity_bytes,
            state: Mutex::new(PoolState {
                epoch: 0,
                next_index: 0,
                slots: HashMap::new(),
                used_bytes: 0,
            }),
        }
    }

    /// Drop every slot and start a new epoch, as if the host evicted the device memory.
    pub fn reclaim(&self) -> Result<(), StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::poisoned("device pool"))?;
        state.slots.clear();
        state.used_bytes = 0;
        state.epoch += 1;
        debug!(device = %self.name, epoch = state.epoch, "device memory reclaimed");
        Ok(())
    }

    pub fn used_bytes(&self) -> Result<usize, StoreError> {
        self.state
            .lock()
            .map(|s| s.used_bytes)
            .map_err(|_| StoreError::poisoned("device pool"))
    }
}

impl DevicePool for HostDevicePool {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn upload(&self, blob: &Blob) -> Result<DeviceSlot, StoreError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StoreError::poisoned("device pool"))?;
        if let Some(capacity) = self.capacity_bytes {
            let available = capacity.saturating_sub(state.used_bytes);
            if blob.len() > available {
                return Err(StoreError::DeviceOutOfMemory {
                    requested: blob.len(),
                    available,
                });
            }
        }
        let slot = DeviceSlot {
            index: state.next_index,
            epoch: state.epoch,
        };
        state.next_index += 1;
        state.used_bytes += blob.len();
        state.slots.insert(slot.index, blob.clone());
        Ok(slot)
    }

    fn download(&self, slot: DeviceSlot) -> Result<Blob, StoreError> {
        let state = self
            .state
            .lock()
            .map_err(|_| StoreError::poisoned("device pool"))?;
        if slot.epoch != state.epoch {
            return Err(StoreError::StaleHandle(format!(
                "{slot} on {} (current epoch {})",
                self.name, state.epoch
            )));
        }
        state
            .slots
            .get(&slot.index)
            .cloned()
            .ok_or_else(|| StoreError::StaleHandle(format!("{slot} on {} was released", self.name)))
    }

    fn release(&self, slot: DeviceSlot) {
        let Ok(mut state) = self.state.lock() else {
            warn!(device = %self.name, %slot, "device pool lock poisoned; slot not released");
            return;
        };
        if slot.epoch == state.epoch
            && let Some(blob) = state.slots.remove(&slot.index)
        {
            state.used_bytes = state.used_bytes.saturating_sub(blob.len());
        }
    }
}
