//! Domain - ドメインモデル（ids, artifact payload, queue key, errors）

pub mod artifact;
pub mod errors;
pub mod ids;
pub mod queue_key;

pub use self::artifact::{
    Artifact, ArtifactMeta, Blob, LoadDevice, OrderKey, Placement, StoreDevice, TensorTriplet,
    COMPONENT_COUNT,
};
pub use self::errors::{ConfigError, FilterKind, SelectError, StashError, StoreError};
pub use self::ids::{ArtifactId, Id, IdMarker};
pub use self::queue_key::{QueueKey, QueueName, StorageMode, UnknownMode, DEFAULT_QUEUE_NAME};
