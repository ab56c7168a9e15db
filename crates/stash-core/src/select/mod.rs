//! Select - ファイルシステム上のエントリに対する Indexed Selector
//!
//! - **natural**: 数字の並びを数値として比較する順序（queue の一覧にも使う）
//! - **options**: entry kind、sort order、範囲外 policy
//! - **filter**: include / exclude regex と拡張子の許可リスト
//! - **selector**: 列挙 -> filter -> sort -> index の解決

pub mod filter;
pub mod natural;
pub mod options;
pub mod selector;

pub use self::filter::{parse_extensions, EntryFilter};
pub use self::natural::{natural_cmp, natural_sort};
pub use self::options::{EntryKind, OutOfRangePolicy, SortOrder, UnknownOption};
pub use self::selector::{resolve_in, Selection, SelectionEntry, SelectionQuery, Selector};
