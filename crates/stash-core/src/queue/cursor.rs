//! Cursor - Load の cursor 計算
//!
//! ロックにも保存媒体にも触れないので、規則だけを単体でテストできます。
//! - 開始位置: `reset_cursor` > 明示的な override > 保存済み cursor
//! - `start >= size` はエラーではなく空の読み出し
//! - consume では cursor は消費した位置に留まる（次の項目が詰めて入る）
//! - peek では cursor は読んだ項目の 1 つ後ろに進む
//! - 保存される cursor は queue の長さを超えない

/// Where a Load starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorStart {
    /// Use the queue's stored cursor.
    #[default]
    Stored,
    /// Start from position 0 (`reset_cursor`).
    Reset,
    /// Start from this position for this call only.
    Override(usize),
}

impl CursorStart {
    /// Combine the host-facing inputs. A negative override means "use the stored cursor".
    pub fn from_inputs(reset_cursor: bool, cursor_override: i64) -> Self {
        if reset_cursor {
            CursorStart::Reset
        } else if cursor_override >= 0 {
            CursorStart::Override(usize::try_from(cursor_override).unwrap_or(usize::MAX))
        } else {
            CursorStart::Stored
        }
    }

    pub fn resolve(self, stored: usize) -> usize {
        match self {
            CursorStart::Stored => stored,
            CursorStart::Reset => 0,
            CursorStart::Override(k) => k,
        }
    }
}

/// Result of applying one Load to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStep {
    /// Reported to the caller.
    pub cursor_after: usize,
    /// Written back to the queue.
    pub stored: usize,
}

pub fn step(start: usize, size: usize, consume: bool) -> CursorStep {
    if start >= size {
        return CursorStep {
            cursor_after: start,
            stored: size,
        };
    }
    if consume {
        CursorStep {
            cursor_after: start,
            stored: start,
        }
    } else {
        CursorStep {
            cursor_after: start + 1,
            stored: start + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::reset_wins(true, 7, CursorStart::Reset)]
    #[case::override_used(false, 3, CursorStart::Override(3))]
    #[case::override_zero(false, 0, CursorStart::Override(0))]
    #[case::negative_means_stored(false, -1, CursorStart::Stored)]
    fn start_precedence(#[case] reset: bool, #[case] over: i64, #[case] expected: CursorStart) {
        assert_eq!(CursorStart::from_inputs(reset, over), expected);
    }

    #[test]
    fn resolve_uses_stored_only_when_asked() {
        assert_eq!(CursorStart::Stored.resolve(4), 4);
        assert_eq!(CursorStart::Reset.resolve(4), 0);
        assert_eq!(CursorStart::Override(2).resolve(4), 2);
    }

    #[rstest]
    #[case::consume(1, 3, true, 1, 1)]
    #[case::peek(1, 3, false, 2, 2)]
    #[case::peek_last(2, 3, false, 3, 3)]
    #[case::exhausted(3, 3, true, 3, 3)]
    #[case::past_end_saturates(9, 3, false, 9, 3)]
    #[case::empty_queue(0, 0, true, 0, 0)]
    fn step_rules(
        #[case] start: usize,
        #[case] size: usize,
        #[case] consume: bool,
        #[case] cursor_after: usize,
        #[case] stored: usize,
    ) {
        assert_eq!(
            step(start, size, consume),
            CursorStep {
                cursor_after,
                stored
            }
        );
    }
}
