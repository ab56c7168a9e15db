//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **MemoryStore**: プロセスメモリ（mode = cpu）
//! - **DeviceStore**: accelerator 常駐（mode = gpu）、DevicePool 経由
//! - **DiskStore**: ファイル（mode = disk）、container 形式で 1 artifact = 1 ファイル
//! - **HostDevicePool**: 実デバイスが無い環境用の DevicePool

pub mod container;
pub mod device_store;
pub mod disk_store;
pub mod host_device_pool;
pub mod memory_store;

pub use self::device_store::DeviceStore;
pub use self::disk_store::DiskStore;
pub use self::host_device_pool::HostDevicePool;
pub use self::memory_store::MemoryStore;
