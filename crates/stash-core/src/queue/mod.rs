//! Queue - registry、cursor 規則、Save / Load の manager
//!
//! # 設計
//! - 項目を持つのは Backend Store、queue が持つのは読み出し cursor だけ
//! - 「読んだか」(cursor) と「まだ存在するか」(物理削除) を分けているので、
//!   同じ仕組みで queue を消費しながら読むことも、残したまま辿ることもできる

pub mod cursor;
mod manager;
mod registry;

pub use cursor::CursorStart;
pub use manager::{BackendSet, LoadOutcome, LoadRequest, LoadedArtifact, QueueManager, SaveOutcome};
pub use registry::{QueueRegistry, QueueSlot, QueueState};
