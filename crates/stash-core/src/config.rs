//! Config - TOML 設定
//!
//! ```toml
//! [storage]
//! disk_root = "output/stash_queues"
//! default_queue = "default"
//!
//! [device]
//! auto_device = "cuda:0"
//! capacity_bytes = 8589934592
//!
//! [preview]
//! max_list_items = 20
//!
//! [log]
//! filter = "info"
//! ```
//!
//! セクションもフィールドもすべて省略可能です。

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, QueueName};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    pub storage: StorageConfig,
    pub device: DeviceConfig,
    pub preview: PreviewConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// One sub-directory per queue name lives under this root.
    pub disk_root: PathBuf,
    pub default_queue: QueueName,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            disk_root: PathBuf::from("output").join("stash_queues"),
            default_queue: QueueName::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// What `load_device = auto` resolves to; `"cpu"` means host memory.
    pub auto_device: String,
    /// Accelerator budget for gpu-mode queues. `None` = unlimited.
    pub capacity_bytes: Option<usize>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            auto_device: "cpu".to_string(),
            capacity_bytes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub max_list_items: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { max_list_items: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl StashConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: StashConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.disk_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.disk_root must not be empty".to_string()));
        }
        if self.device.auto_device.trim().is_empty() {
            return Err(ConfigError::Invalid("device.auto_device must not be empty".to_string()));
        }
        if self.preview.max_list_items == 0 {
            return Err(ConfigError::Invalid(
                "preview.max_list_items must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
