//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 保存媒体・時刻・ID 生成・accelerator メモリを trait で切り離し、
//! Queue Manager はこれらの実装を知りません。

pub mod backend_store;
pub mod clock;
pub mod device_pool;
pub mod id_generator;

pub use self::backend_store::{BackendStore, StorageHandle, StoredEntry};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::device_pool::{DevicePool, DeviceSlot};
pub use self::id_generator::{IdGenerator, KeySequencer, UlidGenerator};
