//! IdGenerator port - ID と順序キーの生成
//!
//! # 実装
//! - **UlidGenerator**: Clock ベースの ULID で ArtifactId を生成
//! - **KeySequencer**: キュー内の総順序 (`OrderKey`) を生成

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use ulid::Ulid;

use crate::domain::{ArtifactId, OrderKey};
use crate::ports::Clock;

/// IdGenerator は ArtifactId を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の job から同時に Save される）
pub trait IdGenerator: Send + Sync {
    fn generate_artifact_id(&self) -> ArtifactId;
}

/// ULID-based generator; the timestamp part comes from the injected clock.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_artifact_id(&self) -> ArtifactId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        ArtifactId::from(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}

/// Hands out strictly increasing [`OrderKey`]s.
///
/// The timestamp never goes backwards even if the wall clock does, and the
/// sequence number is unique per process, so `(created_at_ns, seq)` is a
/// total order matching call order.
pub struct KeySequencer<C> {
    clock: C,
    last_ns: AtomicI64,
    next_seq: AtomicU64,
}

impl<C: Clock> KeySequencer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            last_ns: AtomicI64::new(i64::MIN),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn next_key(&self) -> OrderKey {
        let now_ns = self
            .clock
            .now()
            .timestamp_nanos_opt()
            .unwrap_or(i64::MAX);
        // fetch_max returns the previous value; the effective stamp is the larger one.
        let prev = self.last_ns.fetch_max(now_ns, Ordering::SeqCst);
        let created_at_ns = prev.max(now_ns);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        OrderKey::new(created_at_ns, seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_artifact_id();
        let id2 = id_gen.generate_artifact_id();

        assert_ne!(id1, id2);
    }

    #[test]
    fn ulid_generator_uses_clock_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id = id_gen.generate_artifact_id();
        assert_eq!(id.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn sequencer_breaks_same_timestamp_ties() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let seq = KeySequencer::new(FixedClock::new(fixed_time));

        let a = seq.next_key();
        let b = seq.next_key();
        let c = seq.next_key();

        assert_eq!(a.created_at_ns, b.created_at_ns);
        assert!(a < b && b < c);
    }

    #[test]
    fn sequencer_is_monotonic_across_threads() {
        let seq = std::sync::Arc::new(KeySequencer::new(SystemClock));
        let mut keys: Vec<OrderKey> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let seq = &seq;
                    s.spawn(move || (0..100).map(|_| seq.next_key()).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }
}
