//! Observability - status 行と CLI 向けの queue 状態の読み取り専用ビュー

use serde::{Deserialize, Serialize};

use crate::domain::{OrderKey, QueueKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub total: usize,
    pub read: usize,
    pub unread: usize,
}

/// Point-in-time view of one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub key: QueueKey,
    /// Stored cursor, clamped to the current length.
    pub cursor: usize,
    /// Keys of every item in creation order.
    pub items: Vec<OrderKey>,
}

impl QueueSnapshot {
    pub fn counts(&self) -> QueueCounts {
        let total = self.items.len();
        let read = self.cursor.min(total);
        QueueCounts {
            total,
            read,
            unread: total - read,
        }
    }

    /// Unread items paired with their position.
    pub fn unread(&self) -> impl Iterator<Item = (usize, &OrderKey)> {
        self.items.iter().enumerate().skip(self.cursor)
    }
}
