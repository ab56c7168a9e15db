//! Preview - JSON リクエストを受けて表示行を返すエンドポイント
//!
//! 失敗をデータとして返す唯一の境界です。壊れた JSON や未知のオプション、
//! Selector のエラーはどれも `Err` ではなく `{"ok": false, "error": "..."}` になります。

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::status::Reporter;
use crate::select::{parse_extensions, EntryKind, OutOfRangePolicy, SelectionQuery, Selector, SortOrder};

/// Returned as the only line when `root_dir` is blank.
pub const SET_ROOT_DIR_MESSAGE: &str = "set root_dir to preview entries";

/// Request body. Option fields are plain strings so a bad value becomes an
/// `ok: false` response rather than a parse failure of the whole body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewRequest {
    pub root_dir: String,
    pub kind: String,
    /// JSON の数値なら何でも受け付け、小数は切り捨てます（`3.7` → 3, `-0.5` → -1）。
    #[serde(deserialize_with = "floor_index")]
    pub index: i64,
    pub sort: String,
    pub on_out_of_range: String,
    pub include_regex: String,
    pub exclude_regex: String,
    /// Comma-separated, e.g. `"png,jpg"`.
    pub extensions: String,
    pub max_list_items: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PreviewResponse {
    pub fn success(lines: Vec<String>) -> Self {
        Self {
            ok: true,
            lines: Some(lines),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            lines: None,
            error: Some(error.into()),
        }
    }
}

impl PreviewRequest {
    /// Blank option strings fall back to their defaults.
    pub fn to_query(&self) -> Result<SelectionQuery, String> {
        let mut query = SelectionQuery::new(PathBuf::from(self.root_dir.trim()), EntryKind::default());
        if let Some(kind) = non_blank(&self.kind) {
            query.kind = kind.parse::<EntryKind>().map_err(|e| e.to_string())?;
        }
        if let Some(sort) = non_blank(&self.sort) {
            query.sort = sort.parse::<SortOrder>().map_err(|e| e.to_string())?;
        }
        if let Some(policy) = non_blank(&self.on_out_of_range) {
            query.on_out_of_range = policy.parse::<OutOfRangePolicy>().map_err(|e| e.to_string())?;
        }
        query.include_regex = non_blank(&self.include_regex).map(str::to_string);
        query.exclude_regex = non_blank(&self.exclude_regex).map(str::to_string);
        query.extensions = parse_extensions(&self.extensions);
        query.index = self.index;
        Ok(query)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IndexNumber {
    Integer(i64),
    Float(f64),
}

fn floor_index<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IndexNumber::deserialize(deserializer)? {
        IndexNumber::Integer(index) => Ok(index),
        // `as` は範囲外を飽和させる
        IndexNumber::Float(index) => Ok(index.floor() as i64),
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Answers preview requests. Cheap to clone.
#[derive(Debug, Clone, Copy)]
pub struct PreviewService {
    selector: Selector,
    default_max_items: usize,
}

impl PreviewService {
    pub fn new(selector: Selector, default_max_items: usize) -> Self {
        Self {
            selector,
            default_max_items,
        }
    }

    pub fn handle(&self, request: &PreviewRequest) -> PreviewResponse {
        if request.root_dir.trim().is_empty() {
            return PreviewResponse::success(vec![SET_ROOT_DIR_MESSAGE.to_string()]);
        }
        let query = match request.to_query() {
            Ok(query) => query,
            Err(message) => return PreviewResponse::failure(message),
        };
        let reporter = Reporter::new(request.max_list_items.unwrap_or(self.default_max_items));
        match reporter.selection_lines(&self.selector, &query) {
            Ok(lines) => PreviewResponse::success(lines),
            Err(e) => {
                debug!(root = %query.root_dir.display(), error = %e, "preview failed");
                PreviewResponse::failure(e.to_string())
            }
        }
    }

    /// Raw JSON in, JSON out.
    pub fn handle_json(&self, body: &str) -> String {
        let response = match serde_json::from_str::<PreviewRequest>(body) {
            Ok(request) => self.handle(&request),
            Err(e) => PreviewResponse::failure(format!("invalid request body: {e}")),
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|e| format!(r#"{{"ok":false,"error":"cannot encode response: {e}"}}"#))
    }

    /// Runs [`handle`](Self::handle) on the blocking pool; listing a directory is file I/O.
    pub async fn serve(&self, request: PreviewRequest) -> PreviewResponse {
        let service = *self;
        match tokio::task::spawn_blocking(move || service.handle(&request)).await {
            Ok(response) => response,
            Err(e) => PreviewResponse::failure(format!("preview task failed: {e}")),
        }
    }
}

impl Default for PreviewService {
    fn default() -> Self {
        Self::new(Selector::new(), 20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.jpg", "c.txt"] {
            fs::write(root.path().join(name), b"x").unwrap();
        }
        fs::create_dir(root.path().join("sub")).unwrap();
        root
    }

    fn request(root: &tempfile::TempDir) -> PreviewRequest {
        PreviewRequest {
            root_dir: root.path().display().to_string(),
            kind: "files".to_string(),
            ..PreviewRequest::default()
        }
    }

    #[test]
    fn blank_root_short_circuits() {
        let response = PreviewService::default().handle(&PreviewRequest::default());
        assert_eq!(response, PreviewResponse::success(vec![SET_ROOT_DIR_MESSAGE.to_string()]));
    }

    #[test]
    fn lists_filtered_files() {
        let root = fixture();
        let req = PreviewRequest {
            extensions: "png, JPG".to_string(),
            index: 1,
            ..request(&root)
        };
        let response = PreviewService::default().handle(&req);
        assert!(response.ok);
        let lines = response.lines.unwrap();
        assert_eq!(&lines[1..], ["  [0] a.png", "> [1] b.jpg"]);
    }

    #[test]
    fn selector_errors_become_messages() {
        let root = fixture();
        let req = PreviewRequest {
            index: 7,
            on_out_of_range: "error".to_string(),
            ..request(&root)
        };
        let response = PreviewService::default().handle(&req);
        assert!(!response.ok);
        assert_eq!(response.error.as_deref(), Some("index 7 out of range (total=3)"));
    }

    #[test]
    fn unknown_option_is_reported() {
        let root = fixture();
        let req = PreviewRequest {
            sort: "sideways".to_string(),
            ..request(&root)
        };
        let response = PreviewService::default().handle(&req);
        assert!(!response.ok);
        assert!(response.error.unwrap().contains("unknown sort 'sideways'"));
    }

    #[test]
    fn max_list_items_caps_lines() {
        let root = fixture();
        let req = PreviewRequest {
            max_list_items: Some(1),
            ..request(&root)
        };
        let lines = PreviewService::default().handle(&req).lines.unwrap();
        assert_eq!(lines, vec!["> [0] a.png".to_string()]);

        let req = PreviewRequest {
            max_list_items: Some(3),
            ..request(&root)
        };
        let lines = PreviewService::default().handle(&req).lines.unwrap();
        assert!(lines.len() <= 3);
        assert_eq!(&lines[1..], ["> [0] a.png", "  ... 2 after"]);
    }

    #[test]
    fn json_boundary() {
        let service = PreviewService::default();
        let body = service.handle_json("{not json");
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["ok"], false);
        assert!(value.get("lines").is_none());

        let body = service.handle_json(r#"{"root_dir": ""}"#);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["lines"][0], SET_ROOT_DIR_MESSAGE);
    }

    #[test]
    fn fractional_index_is_floored() {
        let root = fixture();
        let root_json = serde_json::to_string(&root.path().display().to_string()).unwrap();
        for (index, expected) in [("1.0", 1), ("1.9", 1), ("-0.5", -1), ("2", 2)] {
            let body = format!(r#"{{"root_dir": {root_json}, "kind": "files", "index": {index}}}"#);
            let request: PreviewRequest = serde_json::from_str(&body).unwrap();
            assert_eq!(request.index, expected, "{index}");
        }

        let body = format!(r#"{{"root_dir": {root_json}, "kind": "files", "index": 1.0}}"#);
        let value: serde_json::Value =
            serde_json::from_str(&PreviewService::default().handle_json(&body)).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["lines"][2], "> [1] b.jpg");

        let body = r#"{"index": "one"}"#;
        let value: serde_json::Value =
            serde_json::from_str(&PreviewService::default().handle_json(body)).unwrap();
        assert_eq!(value["ok"], false);
    }

    #[tokio::test]
    async fn serve_runs_on_blocking_pool() {
        let root = fixture();
        let response = PreviewService::default().serve(request(&root)).await;
        assert!(response.ok);
        assert_eq!(response.lines.unwrap().len(), 4);
    }
}
