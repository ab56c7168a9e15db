//! Status - 表示用の行を組み立てる Reporter
//!
//! Queue Manager と Selector の状態を読むだけで、何も変更しません。
//! 出力はそのまま UI / CLI に流せる `Vec<String>` です。

use crate::domain::SelectError;
use crate::observability::QueueSnapshot;
use crate::select::{resolve_in, SelectionEntry, SelectionQuery, Selector};

/// Reporter は queue と selection の説明行を生成
///
/// `max_items` は返す行数の上限です（ヘッダ行と `...` 行を含む）。
/// selection では選択中の行だけは必ず残します。
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    max_items: usize,
}

impl Reporter {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items: max_items.max(1),
        }
    }

    /// 未読項目を cursor 位置から作成時刻付きで列挙
    ///
    /// # 出力例
    /// ```text
    /// disk:batch: 2 unread / 3 total (cursor 1)
    ///   [1] 2026-01-02T03:04:05.000000006Z #7
    ///   [2] 2026-01-02T03:04:05.000000010Z #8
    /// ```
    pub fn describe_queue(&self, snapshot: &QueueSnapshot) -> Vec<String> {
        let counts = snapshot.counts();
        let mut lines = vec![format!(
            "{}: {} unread / {} total (cursor {})",
            snapshot.key, counts.unread, counts.total, snapshot.cursor
        )];
        let budget = self.max_items - 1;
        if budget == 0 {
            return lines;
        }
        if counts.unread == 0 {
            lines.push("  (no unread items)".to_string());
            return lines;
        }
        let shown = if counts.unread <= budget {
            counts.unread
        } else {
            budget - 1
        };
        lines.extend(
            snapshot
                .unread()
                .take(shown)
                .map(|(position, key)| format!("  [{position}] {key}")),
        );
        if counts.unread > shown {
            lines.push(format!("  ... {} more", counts.unread - shown));
        }
        lines
    }

    /// 選択中の項目の周辺を `>` 付きで列挙
    ///
    /// Selector が失敗しても Err は返さず、理由を 1 行で返します（preview 用）。
    pub fn describe_selection(&self, selector: &Selector, query: &SelectionQuery) -> Vec<String> {
        match self.selection_lines(selector, query) {
            Ok(lines) => lines,
            Err(e) => vec![format!("error: {e}")],
        }
    }

    /// [`describe_selection`](Self::describe_selection) の失敗を伝播する版
    pub fn selection_lines(
        &self,
        selector: &Selector,
        query: &SelectionQuery,
    ) -> Result<Vec<String>, SelectError> {
        let entries = selector.candidates(query)?;
        let selection = resolve_in(query, &entries)?;
        let selected = selection.index_used;

        // ヘッダも入らない上限なら選択中の 1 行だけ
        if self.max_items == 1 {
            return Ok(vec![entry_line(selected, &entries[selected], selected)]);
        }

        let mut lines = vec![format!(
            "{} {} under {} (sort {}): index {} -> {}",
            selection.total,
            query.kind,
            query.root_dir.display(),
            query.sort,
            query.index,
            selected
        )];
        let layout = Layout::fit(selected, entries.len(), self.max_items - 1);
        if layout.markers && layout.start > 0 {
            lines.push(format!("  ... {} before", layout.start));
        }
        lines.extend(
            entries[layout.start..layout.end]
                .iter()
                .enumerate()
                .map(|(offset, entry)| entry_line(layout.start + offset, entry, selected)),
        );
        if layout.markers && layout.end < entries.len() {
            lines.push(format!("  ... {} after", entries.len() - layout.end));
        }
        Ok(lines)
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(20)
    }
}

fn entry_line(position: usize, entry: &SelectionEntry, selected: usize) -> String {
    let marker = if position == selected { '>' } else { ' ' };
    format!("{marker} [{position}] {}", entry.name)
}

/// `budget` 行に収まる表示区間。`...` 行も 1 行として数える
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    start: usize,
    end: usize,
    markers: bool,
}

impl Layout {
    fn fit(selected: usize, total: usize, budget: usize) -> Self {
        let mut size = total.min(budget).max(1);
        loop {
            let (start, end) = window(selected, total, size);
            let markers = usize::from(start > 0) + usize::from(end < total);
            if size + markers <= budget {
                return Self { start, end, markers: true };
            }
            if size == 1 {
                return Self { start, end, markers: false };
            }
            size -= 1;
        }
    }
}

/// `selected` を含む長さ `size` 以下の区間 `[start, end)`。可能なら中央に置く。
fn window(selected: usize, total: usize, size: usize) -> (usize, usize) {
    if total <= size {
        return (0, total);
    }
    let start = selected.saturating_sub(size / 2).min(total - size);
    (start, start + size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderKey, QueueKey, StorageMode};
    use crate::select::{EntryKind, OutOfRangePolicy};
    use rstest::rstest;
    use std::fs;

    fn snapshot(cursor: usize, n: usize) -> QueueSnapshot {
        QueueSnapshot {
            key: QueueKey::new(StorageMode::Disk, "batch"),
            cursor,
            items: (0..n)
                .map(|i| OrderKey::new(1_700_000_000_000_000_000 + i as i64, i as u64))
                .collect(),
        }
    }

    #[test]
    fn describe_queue_lists_unread_from_cursor() {
        let lines = Reporter::new(10).describe_queue(&snapshot(1, 3));
        assert_eq!(lines[0], "disk:batch: 2 unread / 3 total (cursor 1)");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("  [1] 2023-11-14T"));
        assert!(lines[2].ends_with("#2"));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(10, 7)]
    fn describe_queue_stays_within_max_items(#[case] max: usize, #[case] expected: usize) {
        let lines = Reporter::new(max).describe_queue(&snapshot(0, 6));
        assert_eq!(lines.len(), expected);
        if max > 1 && max < 7 {
            assert_eq!(lines.last().unwrap(), &format!("  ... {} more", 6 - (max - 2)));
        }
    }

    #[test]
    fn describe_queue_when_drained() {
        let lines = Reporter::new(5).describe_queue(&snapshot(2, 2));
        assert_eq!(lines, vec![
            "disk:batch: 0 unread / 2 total (cursor 2)".to_string(),
            "  (no unread items)".to_string(),
        ]);
    }

    #[rstest]
    #[case(0, 10, 4, (0, 4))]
    #[case(5, 10, 4, (3, 7))]
    #[case(9, 10, 4, (6, 10))]
    #[case(2, 3, 4, (0, 3))]
    fn window_contains_selected(
        #[case] selected: usize,
        #[case] total: usize,
        #[case] size: usize,
        #[case] expected: (usize, usize),
    ) {
        assert_eq!(window(selected, total, size), expected);
    }

    #[rstest]
    #[case(1, 5, 2, Layout { start: 2, end: 3, markers: false })]
    #[case(2, 5, 2, Layout { start: 2, end: 3, markers: false })]
    #[case(3, 5, 2, Layout { start: 2, end: 3, markers: true })]
    #[case(4, 5, 2, Layout { start: 1, end: 3, markers: true })]
    #[case(10, 5, 2, Layout { start: 0, end: 5, markers: true })]
    fn layout_counts_markers_against_budget(
        #[case] budget: usize,
        #[case] total: usize,
        #[case] selected: usize,
        #[case] expected: Layout,
    ) {
        assert_eq!(Layout::fit(selected, total, budget), expected);
    }

    #[test]
    fn describe_selection_marks_selected() {
        let root = tempfile::tempdir().unwrap();
        for name in ["shot10", "shot2", "shot1"] {
            fs::create_dir(root.path().join(name)).unwrap();
        }
        let query = SelectionQuery::new(root.path(), EntryKind::Dirs).with_index(4);
        let lines = Reporter::new(10).describe_selection(&Selector::new(), &query);

        assert!(lines[0].starts_with("3 dirs under"));
        assert!(lines[0].ends_with("index 4 -> 1"));
        assert_eq!(&lines[1..], ["  [0] shot1", "> [1] shot2", "  [2] shot10"]);
    }

    #[test]
    fn describe_selection_downgrades_errors_to_one_line() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("only")).unwrap();
        let query = SelectionQuery::new(root.path(), EntryKind::Dirs)
            .with_index(3)
            .with_policy(OutOfRangePolicy::Error);

        let lines = Reporter::new(10).describe_selection(&Selector::new(), &query);
        assert_eq!(lines, vec!["error: index 3 out of range (total=1)".to_string()]);
    }
}
