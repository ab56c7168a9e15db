//! Natural - 埋め込まれた数字を数値として比較する順序
//!
//! 単純な辞書順と違い `"frame2" < "frame10"` になります。文字の部分は大文字小文字を
//! 区別せずに比較します。この規則で等しい名前は先頭の 0 が少ない方を先にし、
//! 最後は生のバイト列で比べるので、順序は全順序です。

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    Digits(&'a str),
    Text(&'a str),
}

impl<'a> Run<'a> {
    fn as_str(&self) -> &'a str {
        match self {
            Run::Digits(s) | Run::Text(s) => s,
        }
    }
}

struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Run<'a>> {
        let first = self.rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if is_digit {
            Run::Digits(run)
        } else {
            Run::Text(run)
        })
    }
}

fn runs(s: &str) -> Runs<'_> {
    Runs { rest: s }
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    // Same digit count after stripping zeros: lexical order equals numeric order.
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn cmp_run(a: Run<'_>, b: Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Digits(x), Run::Digits(y)) => cmp_digits(x, y),
        _ => cmp_text(a.as_str(), b.as_str()),
    }
}

/// Orders by run values only; `Equal` means "same under natural rules".
fn cmp_runs(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp_run(x, y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// Fewer leading zeros first: `img1 < img01`.
fn cmp_leading_zeros(a: &str, b: &str) -> Ordering {
    let digit_lens = |s: &str| -> Vec<usize> {
        runs(s)
            .filter_map(|r| match r {
                Run::Digits(d) => Some(d.len()),
                Run::Text(_) => None,
            })
            .collect()
    };
    digit_lens(a).cmp(&digit_lens(b))
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    cmp_runs(a, b)
        .then_with(|| cmp_leading_zeros(a, b))
        .then_with(|| a.cmp(b))
}

/// Sort in place with [`natural_cmp`].
pub fn natural_sort<S: AsRef<str>>(items: &mut [S]) {
    items.sort_by(|a, b| natural_cmp(a.as_ref(), b.as_ref()));
}
