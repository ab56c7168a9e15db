//! Artifact - tensor triplet と順序メタ情報
//!
//! core は payload の中身を見ません。[`TensorTriplet`] は 3 つのバイト列
//! （primary と 2 つの conditioning）で、ステージ間をそのまま運ばれます。

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ArtifactId;

/// Number of components in every payload.
pub const COMPONENT_COUNT: usize = 3;

/// An immutable, cheaply clonable byte string.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Blob(Arc<[u8]>);

impl Blob {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<&str> for Blob {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().into())
    }
}

/// The staged payload: a primary blob plus two conditioning blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorTriplet {
    pub primary: Blob,
    pub positive: Blob,
    pub negative: Blob,
}

impl TensorTriplet {
    pub fn new(primary: impl Into<Blob>, positive: impl Into<Blob>, negative: impl Into<Blob>) -> Self {
        Self {
            primary: primary.into(),
            positive: positive.into(),
            negative: negative.into(),
        }
    }

    /// Components in their fixed order (primary, positive, negative).
    pub fn components(&self) -> [&Blob; COMPONENT_COUNT] {
        [&self.primary, &self.positive, &self.negative]
    }

    pub fn from_components([primary, positive, negative]: [Blob; COMPONENT_COUNT]) -> Self {
        Self {
            primary,
            positive,
            negative,
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.components().iter().map(|b| b.len()).sum()
    }
}

/// Total order of artifacts inside a queue.
///
/// `created_at_ns` is monotonic per process; `seq` breaks ties between
/// inserts that land on the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderKey {
    pub created_at_ns: i64,
    pub seq: u64,
}

impl OrderKey {
    pub fn new(created_at_ns: i64, seq: u64) -> Self {
        Self { created_at_ns, seq }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.created_at_ns)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{}",
            self.created_at().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
            self.seq
        )
    }
}

/// Where the caller asked the payload to live while it is queued.
///
/// `Cpu` copies to host memory; `Keep` leaves it on whatever device it came
/// from. Accelerator mode always keeps it device-resident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreDevice {
    #[default]
    Cpu,
    Keep,
}

/// Device the loaded payload should be handed back on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadDevice {
    /// The configured auto device (`device.auto_device`).
    #[default]
    Auto,
    Cpu,
}

/// Placement hint attached to a loaded artifact. Bytes are identical either way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "device", rename_all = "snake_case")]
pub enum Placement {
    Host,
    Device(String),
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Host => f.write_str("cpu"),
            Placement::Device(name) => f.write_str(name),
        }
    }
}

/// Immutable metadata recorded at Save time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub id: ArtifactId,
    pub key: OrderKey,
    #[serde(default)]
    pub store_device: StoreDevice,
}

/// A stored artifact: metadata plus payload. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub meta: ArtifactMeta,
    pub payload: TensorTriplet,
}

impl Artifact {
    pub fn new(meta: ArtifactMeta, payload: TensorTriplet) -> Self {
        Self { meta, payload }
    }

    pub fn id(&self) -> ArtifactId {
        self.meta.id
    }

    pub fn key(&self) -> OrderKey {
        self.meta.key
    }
}
