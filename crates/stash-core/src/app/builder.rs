//! StashBuilder - Stash の構築とワイヤリング
//!
//! 設定から 3 つの Backend Store・QueueManager・Selector を組み立てます。
//! プロセス全体で共有するグローバル状態はなく、registry は [`Stash`] が所有します。

use std::sync::Arc;

use tracing::info;

use super::preview::{PreviewRequest, PreviewResponse, PreviewService};
use super::status::Reporter;
use crate::config::StashConfig;
use crate::domain::{
    ConfigError, QueueKey, QueueName, SelectError, StashError, StorageMode, StoreDevice, StoreError,
    TensorTriplet,
};
use crate::impls::{DeviceStore, DiskStore, HostDevicePool, MemoryStore};
use crate::observability::QueueSnapshot;
use crate::ports::{Clock, DevicePool, SystemClock};
use crate::queue::{BackendSet, LoadOutcome, LoadRequest, QueueManager, SaveOutcome};
use crate::select::{Selection, SelectionQuery, Selector};

/// Device name used for the emulated pool when `auto_device` is `"cpu"`.
const EMULATED_DEVICE_NAME: &str = "accel:0";

/// StashBuilder は Stash を構築
///
/// # 使用例
/// ```ignore
/// let stash = StashBuilder::new(StashConfig::from_path("stash.toml")?)
///     .clock(Arc::new(FixedClock::new(at)))
///     .build()?;
/// ```
///
/// # Fail-fast
/// `build()` で設定を検証し、不正な値は [`ConfigError`] として返す
pub struct StashBuilder {
    config: StashConfig,
    clock: Option<Arc<dyn Clock>>,
    device_pool: Option<Arc<dyn DevicePool>>,
}

impl StashBuilder {
    pub fn new(config: StashConfig) -> Self {
        Self {
            config,
            clock: None,
            device_pool: None,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 既定は設定の容量を持つ [`HostDevicePool`]
    pub fn device_pool(mut self, pool: Arc<dyn DevicePool>) -> Self {
        self.device_pool = Some(pool);
        self
    }

    pub fn build(self) -> Result<Stash, ConfigError> {
        self.config.validate()?;

        let device_pool = self.device_pool.unwrap_or_else(|| {
            let auto = &self.config.device.auto_device;
            let name = if auto.eq_ignore_ascii_case("cpu") {
                EMULATED_DEVICE_NAME
            } else {
                auto.as_str()
            };
            Arc::new(HostDevicePool::new(name, self.config.device.capacity_bytes))
        });
        let disk = Arc::new(DiskStore::new(self.config.storage.disk_root.clone()));
        let stores = BackendSet {
            cpu: Arc::new(MemoryStore::new()),
            gpu: Arc::new(DeviceStore::new(device_pool)),
            disk: disk.clone(),
        };
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let manager = QueueManager::new(stores, clock, self.config.device.auto_device.clone());

        info!(
            disk_root = %self.config.storage.disk_root.display(),
            auto_device = %self.config.device.auto_device,
            "stash ready"
        );
        Ok(Stash {
            manager,
            disk,
            selector: Selector::new(),
            config: self.config,
        })
    }
}

/// Stash は Save / Load / Resolve / Describe / Preview の窓口
pub struct Stash {
    manager: QueueManager,
    disk: Arc<DiskStore>,
    selector: Selector,
    config: StashConfig,
}

impl Stash {
    pub fn builder(config: StashConfig) -> StashBuilder {
        StashBuilder::new(config)
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    pub fn manager(&self) -> &QueueManager {
        &self.manager
    }

    /// 空の queue 名は設定の `default_queue` になる
    pub fn queue_key(&self, mode: StorageMode, queue_name: &str) -> QueueKey {
        if queue_name.trim().is_empty() {
            QueueKey::new(mode, self.config.storage.default_queue.clone())
        } else {
            QueueKey::new(mode, QueueName::new(queue_name))
        }
    }

    pub fn save(
        &self,
        mode: StorageMode,
        queue_name: &str,
        payload: TensorTriplet,
        store_device: StoreDevice,
    ) -> Result<SaveOutcome, StoreError> {
        self.manager
            .save(&self.queue_key(mode, queue_name), payload, store_device)
    }

    pub fn load(
        &self,
        mode: StorageMode,
        queue_name: &str,
        request: LoadRequest,
    ) -> Result<LoadOutcome, StoreError> {
        self.manager.load(&self.queue_key(mode, queue_name), request)
    }

    pub fn resolve(&self, query: &SelectionQuery) -> Result<Selection, SelectError> {
        self.selector.resolve(query)
    }

    pub fn snapshot(&self, mode: StorageMode, queue_name: &str) -> Result<QueueSnapshot, StoreError> {
        self.manager.snapshot(&self.queue_key(mode, queue_name))
    }

    pub fn describe_queue(&self, mode: StorageMode, queue_name: &str) -> Result<Vec<String>, StashError> {
        let snapshot = self.snapshot(mode, queue_name)?;
        Ok(self.reporter().describe_queue(&snapshot))
    }

    /// 失敗しても Err にならない。理由は 1 行で返る
    pub fn describe_selection(&self, query: &SelectionQuery) -> Vec<String> {
        self.reporter().describe_selection(&self.selector, query)
    }

    pub fn preview(&self, request: &PreviewRequest) -> PreviewResponse {
        self.preview_service().handle(request)
    }

    pub fn preview_service(&self) -> PreviewService {
        PreviewService::new(self.selector, self.config.preview.max_list_items)
    }

    /// 空になった disk queue ディレクトリを削除
    pub fn prune_disk_queues(&self) -> Result<usize, StoreError> {
        self.disk.prune_empty_queues()
    }

    fn reporter(&self) -> Reporter {
        Reporter::new(self.config.preview.max_list_items)
    }
}
