//! Options - entry kind、sort order、範囲外 policy

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::SelectError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}' (expected one of: {})", expected.join(", "))]
pub struct UnknownOption {
    pub what: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

macro_rules! string_enum {
    ($ty:ident, $what:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(UnknownOption {
                        what: $what,
                        value: s.to_string(),
                        expected: &[$($name),+],
                    }),
                }
            }
        }
    };
}

/// Which children of the root are candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[default]
    Dirs,
    Files,
}

string_enum!(EntryKind, "kind", { Dirs => "dirs", Files => "files" });

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Natural,
    Name,
    NameDesc,
    Mtime,
    MtimeDesc,
}

string_enum!(SortOrder, "sort", {
    Natural => "natural",
    Name => "name",
    NameDesc => "name_desc",
    Mtime => "mtime",
    MtimeDesc => "mtime_desc",
});

/// What to do with an index outside `0..total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Floored modulo; negative indices count from the end.
    #[default]
    Wrap,
    /// Saturate to the first / last entry.
    Clamp,
    Error,
}

string_enum!(OutOfRangePolicy, "on_out_of_range", {
    Wrap => "wrap",
    Clamp => "clamp",
    Error => "error",
});

impl OutOfRangePolicy {
    /// Effective index for `index` against `total` entries. `total` must be non-zero.
    pub fn apply(self, index: i64, total: usize) -> Result<usize, SelectError> {
        debug_assert!(total > 0);
        let total_i = i64::try_from(total).unwrap_or(i64::MAX);
        match self {
            OutOfRangePolicy::Wrap => Ok(index.rem_euclid(total_i) as usize),
            OutOfRangePolicy::Clamp => Ok(index.clamp(0, total_i - 1) as usize),
            OutOfRangePolicy::Error if (0..total_i).contains(&index) => Ok(index as usize),
            OutOfRangePolicy::Error => Err(SelectError::IndexOutOfRange { index, total }),
        }
    }
}
