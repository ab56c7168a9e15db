//! stash-core - パイプラインのステージ間で tensor triplet を受け渡す queue と、
//! ファイルシステム上のエントリを index で選ぶ Selector
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, artifact, queue key, errors）
//! - **ports**: 抽象化レイヤー（BackendStore, DevicePool, Clock, IdGenerator）
//! - **impls**: 実装（MemoryStore, DeviceStore, DiskStore, HostDevicePool）
//! - **queue**: queue registry と Save / Load（cursor 付き）
//! - **select**: natural sort と Indexed Selector
//! - **app**: Stash（窓口）、Reporter、preview エンドポイント
//! - **config**: TOML 設定
//! - **observability**: queue の読み取り専用ビュー

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod select;

pub use app::{PreviewRequest, PreviewResponse, Reporter, Stash, StashBuilder};
pub use config::StashConfig;
pub use domain::{
    Artifact, LoadDevice, Placement, QueueKey, QueueName, StashError, StorageMode, StoreDevice,
    StoreError, TensorTriplet,
};
pub use queue::{CursorStart, LoadOutcome, LoadRequest, SaveOutcome};
pub use select::{EntryKind, OutOfRangePolicy, Selection, SelectionQuery, SortOrder};
