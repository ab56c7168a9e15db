//! DevicePool port - accelerator メモリの抽象化
//!
//! 実際のデバイス転送はホスト側の責務です。この core が必要とするのは
//! 「確保・読み出し・解放」と「ホストに回収されたら読み出しが失敗すること」だけです。

use std::fmt;

use crate::domain::{Blob, StoreError};

/// A slot in accelerator memory.
///
/// `epoch` is the pool generation the slot was allocated in; a pool that has
/// been reclaimed by the host bumps its epoch and every older slot goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceSlot {
    pub index: u64,
    pub epoch: u64,
}

impl fmt::Display for DeviceSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}@epoch {}", self.index, self.epoch)
    }
}

pub trait DevicePool: Send + Sync {
    /// Device name reported in placements (e.g. `cuda:0`).
    fn device_name(&self) -> &str;

    fn upload(&self, blob: &Blob) -> Result<DeviceSlot, StoreError>;

    /// Fails with `StoreError::StaleHandle` if the slot was reclaimed.
    fn download(&self, slot: DeviceSlot) -> Result<Blob, StoreError>;

    /// Releasing an already-reclaimed slot is a no-op.
    fn release(&self, slot: DeviceSlot);
}
