//! Selector - ディレクトリの子を index で 1 つ選ぶ
//!
//! 呼び出しのたびにディレクトリを列挙し直し、呼び出し間で何も覚えません。
//! 「実行ごとに次の項目」が欲しい呼び出し側は、自分で増やす `index` を渡します。

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter::EntryFilter;
use super::natural::natural_cmp;
use super::options::{EntryKind, OutOfRangePolicy, SortOrder};
use crate::domain::SelectError;

/// Inputs of one selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionQuery {
    pub root_dir: PathBuf,
    #[serde(default)]
    pub kind: EntryKind,
    #[serde(default)]
    pub sort: SortOrder,
    #[serde(default)]
    pub include_regex: Option<String>,
    #[serde(default)]
    pub exclude_regex: Option<String>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub on_out_of_range: OutOfRangePolicy,
}

impl SelectionQuery {
    pub fn new(root_dir: impl Into<PathBuf>, kind: EntryKind) -> Self {
        Self {
            root_dir: root_dir.into(),
            kind,
            sort: SortOrder::default(),
            include_regex: None,
            exclude_regex: None,
            extensions: Vec::new(),
            index: 0,
            on_out_of_range: OutOfRangePolicy::default(),
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_index(mut self, index: i64) -> Self {
        self.index = index;
        self
    }

    pub fn with_policy(mut self, policy: OutOfRangePolicy) -> Self {
        self.on_out_of_range = policy;
        self
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include_regex = Some(pattern.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_regex = Some(pattern.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

/// A candidate child of the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub name: String,
    pub full_path: PathBuf,
    pub mtime: SystemTime,
}

/// The resolved entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub path: PathBuf,
    pub name: String,
    /// File name without extension; directories keep their full name.
    pub stem: String,
    pub index_used: usize,
    pub total: usize,
}

/// Stateless; see the module docs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selector;

impl Selector {
    pub fn new() -> Self {
        Self
    }

    /// Filtered and sorted candidates. May be empty.
    pub fn candidates(&self, query: &SelectionQuery) -> Result<Vec<SelectionEntry>, SelectError> {
        let filter = EntryFilter::new(
            query.include_regex.as_deref(),
            query.exclude_regex.as_deref(),
            &query.extensions,
        )?;
        let mut entries = list_children(&query.root_dir, query.kind)?;
        entries.retain(|e| filter.matches(&e.name, query.kind));
        sort_entries(&mut entries, query.sort);
        debug!(
            root = %query.root_dir.display(),
            kind = %query.kind,
            sort = %query.sort,
            total = entries.len(),
            "selection candidates"
        );
        Ok(entries)
    }

    pub fn resolve(&self, query: &SelectionQuery) -> Result<Selection, SelectError> {
        let entries = self.candidates(query)?;
        resolve_in(query, &entries)
    }
}

/// Apply the index policy to an already computed candidate list.
pub fn resolve_in(query: &SelectionQuery, entries: &[SelectionEntry]) -> Result<Selection, SelectError> {
    if entries.is_empty() {
        return Err(SelectError::EmptySelection {
            root: query.root_dir.clone(),
        });
    }
    let total = entries.len();
    let index_used = query.on_out_of_range.apply(query.index, total)?;
    let entry = &entries[index_used];
    let stem = match query.kind {
        EntryKind::Dirs => entry.name.clone(),
        EntryKind::Files => Path::new(&entry.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| entry.name.clone()),
    };
    Ok(Selection {
        path: entry.full_path.clone(),
        name: entry.name.clone(),
        stem,
        index_used,
        total,
    })
}

fn list_children(root: &Path, kind: EntryKind) -> Result<Vec<SelectionEntry>, SelectError> {
    let read_dir = fs::read_dir(root).map_err(|source| SelectError::Root {
        path: root.to_path_buf(),
        source,
    })?;
    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|source| SelectError::Root {
            path: root.to_path_buf(),
            source,
        })?;
        let full_path = entry.path();
        // Follows symlinks; dangling links are skipped.
        let Ok(meta) = fs::metadata(&full_path) else {
            continue;
        };
        let wanted = match kind {
            EntryKind::Dirs => meta.is_dir(),
            EntryKind::Files => meta.is_file(),
        };
        if !wanted {
            continue;
        }
        entries.push(SelectionEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            full_path,
            mtime: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        });
    }
    Ok(entries)
}

pub fn sort_entries(entries: &mut [SelectionEntry], sort: SortOrder) {
    let by_name = |a: &SelectionEntry, b: &SelectionEntry| natural_cmp(&a.name, &b.name);
    match sort {
        SortOrder::Natural => entries.sort_by(by_name),
        SortOrder::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::NameDesc => entries.sort_by(|a, b| b.name.cmp(&a.name)),
        SortOrder::Mtime => entries.sort_by(|a, b| a.mtime.cmp(&b.mtime).then_with(|| by_name(a, b))),
        SortOrder::MtimeDesc => entries.sort_by(|a, b| match b.mtime.cmp(&a.mtime) {
            Ordering::Equal => by_name(a, b),
            other => other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    fn tree(dirs: &[&str], files: &[&str]) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for d in dirs {
            fs::create_dir(root.path().join(d)).unwrap();
        }
        for f in files {
            fs::write(root.path().join(f), b"x").unwrap();
        }
        root
    }

    fn names(entries: &[SelectionEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn dirs_and_files_are_separated() {
        let root = tree(&["b", "a"], &["c.txt"]);
        let sel = Selector::new();

        let dirs = sel.candidates(&SelectionQuery::new(root.path(), EntryKind::Dirs)).unwrap();
        let files = sel.candidates(&SelectionQuery::new(root.path(), EntryKind::Files)).unwrap();

        assert_eq!(names(&dirs), vec!["a", "b"]);
        assert_eq!(names(&files), vec!["c.txt"]);
    }

    #[rstest]
    #[case(SortOrder::Natural, vec!["img1", "img2", "img10"])]
    #[case(SortOrder::Name, vec!["img1", "img10", "img2"])]
    #[case(SortOrder::NameDesc, vec!["img2", "img10", "img1"])]
    fn name_sorts(#[case] sort: SortOrder, #[case] expected: Vec<&str>) {
        let root = tree(&["img10", "img2", "img1"], &[]);
        let query = SelectionQuery::new(root.path(), EntryKind::Dirs).with_sort(sort);
        let entries = Selector::new().candidates(&query).unwrap();
        assert_eq!(names(&entries), expected);
    }

    #[test]
    fn mtime_sorts_with_name_tiebreak() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let entry = |name: &str, secs: u64| SelectionEntry {
            name: name.to_string(),
            full_path: PathBuf::from(name),
            mtime: t0 + Duration::from_secs(secs),
        };
        let mut entries = vec![entry("new", 20), entry("b", 10), entry("a", 10)];

        sort_entries(&mut entries, SortOrder::Mtime);
        assert_eq!(names(&entries), vec!["a", "b", "new"]);

        sort_entries(&mut entries, SortOrder::MtimeDesc);
        assert_eq!(names(&entries), vec!["new", "a", "b"]);
    }

    #[rstest]
    #[case(OutOfRangePolicy::Wrap, 5, 0)]
    #[case(OutOfRangePolicy::Wrap, -1, 4)]
    #[case(OutOfRangePolicy::Clamp, 99, 4)]
    #[case(OutOfRangePolicy::Clamp, -1, 0)]
    fn resolves_with_policy(
        #[case] policy: OutOfRangePolicy,
        #[case] index: i64,
        #[case] expected: usize,
    ) {
        let root = tree(&["d0", "d1", "d2", "d3", "d4"], &[]);
        let query = SelectionQuery::new(root.path(), EntryKind::Dirs)
            .with_index(index)
            .with_policy(policy);
        let selection = Selector::new().resolve(&query).unwrap();
        assert_eq!(selection.index_used, expected);
        assert_eq!(selection.total, 5);
        assert_eq!(selection.name, format!("d{expected}"));
    }

    #[test]
    fn error_policy_reports_index_and_total() {
        let root = tree(&["d0", "d1", "d2", "d3", "d4"], &[]);
        let query = SelectionQuery::new(root.path(), EntryKind::Dirs)
            .with_index(5)
            .with_policy(OutOfRangePolicy::Error);
        let err = Selector::new().resolve(&query).unwrap_err();
        assert!(matches!(err, SelectError::IndexOutOfRange { index: 5, total: 5 }));
    }

    #[rstest]
    #[case(OutOfRangePolicy::Wrap)]
    #[case(OutOfRangePolicy::Clamp)]
    #[case(OutOfRangePolicy::Error)]
    fn empty_selection_fails_under_every_policy(#[case] policy: OutOfRangePolicy) {
        let root = tree(&[], &["only_a_file.txt"]);
        let query = SelectionQuery::new(root.path(), EntryKind::Dirs).with_policy(policy);
        let err = Selector::new().resolve(&query).unwrap_err();
        assert!(matches!(err, SelectError::EmptySelection { .. }));
    }

    #[test]
    fn files_get_stem_and_filters_apply() {
        let root = tree(&[], &["b.PNG", "a.png", "skip_me.png", "c.txt", "archive.tar.gz"]);
        let query = SelectionQuery::new(root.path(), EntryKind::Files)
            .with_exclude("^skip")
            .with_extensions(["png"]);

        let entries = Selector::new().candidates(&query).unwrap();
        assert_eq!(names(&entries), vec!["a.png", "b.PNG"]);

        let picked = Selector::new().resolve(&query.clone().with_index(1)).unwrap();
        assert_eq!(picked.stem, "b");
        assert_eq!(picked.path, root.path().join("b.PNG"));
    }

    #[test]
    fn malformed_regex_fails_before_listing() {
        let query = SelectionQuery::new("/definitely/not/here", EntryKind::Dirs).with_include("[");
        let err = Selector::new().resolve(&query).unwrap_err();
        assert!(matches!(err, SelectError::Filter { .. }));
    }

    #[test]
    fn missing_root_is_reported() {
        let query = SelectionQuery::new("/definitely/not/here", EntryKind::Dirs);
        let err = Selector::new().resolve(&query).unwrap_err();
        assert!(matches!(err, SelectError::Root { .. }));
    }
}
