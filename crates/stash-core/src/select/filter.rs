//! Filter - 名前の include / exclude regex と拡張子の許可リスト

use regex::Regex;

use super::options::EntryKind;
use crate::domain::{FilterKind, SelectError};

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
    /// Lowercased, without the leading dot. Empty = allow all.
    extensions: Vec<String>,
}

impl EntryFilter {
    /// Blank patterns count as absent.
    pub fn new(
        include: Option<&str>,
        exclude: Option<&str>,
        extensions: &[String],
    ) -> Result<Self, SelectError> {
        Ok(Self {
            include: compile(FilterKind::Include, include)?,
            exclude: compile(FilterKind::Exclude, exclude)?,
            extensions: normalize_extensions(extensions),
        })
    }

    /// Regexes apply to every candidate; the extension list only to files.
    pub fn matches(&self, name: &str, kind: EntryKind) -> bool {
        if let Some(include) = &self.include
            && !include.is_match(name)
        {
            return false;
        }
        if let Some(exclude) = &self.exclude
            && exclude.is_match(name)
        {
            return false;
        }
        kind == EntryKind::Dirs || self.extension_allowed(name)
    }

    fn extension_allowed(&self, name: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let lower = name.to_lowercase();
        self.extensions
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
    }
}

fn compile(which: FilterKind, pattern: Option<&str>) -> Result<Option<Regex>, SelectError> {
    let Some(pattern) = pattern.filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    Regex::new(pattern)
        .map(Some)
        .map_err(|source| SelectError::Filter {
            which,
            pattern: pattern.to_string(),
            message: source.to_string(),
        })
}

fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Split a comma-separated extension list (`"png, .JPG,,webp"`).
pub fn parse_extensions(csv: &str) -> Vec<String> {
    normalize_extensions(
        &csv.split(',')
            .map(str::to_string)
            .collect::<Vec<String>>(),
    )
}
