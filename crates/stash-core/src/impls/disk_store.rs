//! DiskStore - ファイルによる BackendStore（mode = disk）
//!
//! # レイアウト
//! `{root}/{queue_name}/{created_at_ns:020}-{seq:012}-{pid}.stash`
//!
//! ファイル名の辞書順 = 作成順。書き込みは `.{name}.tmp` に行ってから rename するので、
//! 並行する `list` が書きかけのファイルを見ることはありません。

use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::container;
use crate::domain::{Artifact, OrderKey, QueueName, StorageMode, StoreError};
use crate::ports::{BackendStore, StorageHandle, StoredEntry};
use crate::select::natural_cmp;

pub const ARTIFACT_EXTENSION: &str = "stash";

pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn queue_dir(&self, queue: &QueueName) -> PathBuf {
        self.root.join(queue.as_str())
    }

    /// Remove queue directories that hold no files. Returns how many were removed.
    pub fn prune_empty_queues(&self) -> Result<usize, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let is_empty = fs::read_dir(&path)
                .map(|mut it| it.next().is_none())
                .unwrap_or(false);
            // remove_dir fails if a concurrent Save refilled it.
            if is_empty && fs::remove_dir(&path).is_ok() {
                debug!(dir = %path.display(), "pruned empty queue directory");
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn write_atomically(&self, dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
        let final_path = dir.join(file_name);
        if final_path.exists() {
            return Err(StoreError::Storage(format!(
                "refusing to overwrite {}",
                final_path.display()
            )));
        }
        let tmp_path = dir.join(format!(".{file_name}.tmp"));

        let write_result = (|| -> Result<(), StoreError> {
            let file = File::options()
                .write(true)
                .create_new(true)
                .open(&tmp_path)
                .map_err(|e| StoreError::io(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(bytes)
                .map_err(|e| StoreError::io(&tmp_path, e))?;
            let file = writer
                .into_inner()
                .map_err(|e| StoreError::io(&tmp_path, e.into_error()))?;
            file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
            Ok(())
        })();

        if let Err(error) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(error);
        }

        fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::io(&final_path, e)
        })?;
        Ok(final_path)
    }
}

/// File name for an artifact. Zero padding keeps lexical order equal to key order.
pub fn artifact_file_name(key: OrderKey) -> String {
    let ns = u64::try_from(key.created_at_ns).unwrap_or(0);
    format!(
        "{ns:020}-{seq:012}-{pid}.{ARTIFACT_EXTENSION}",
        seq = key.seq,
        pid = std::process::id()
    )
}

/// Parse a file name produced by [`artifact_file_name`]; anything else is ignored.
pub fn parse_file_name(name: &str) -> Option<OrderKey> {
    let stem = name.strip_suffix(&format!(".{ARTIFACT_EXTENSION}"))?;
    let mut parts = stem.splitn(3, '-');
    let ns_part = parts.next()?;
    let seq_part = parts.next()?;
    let pid_part = parts.next()?;
    if ns_part.len() != 20 || !pid_part.chars().all(|c| c.is_ascii_digit()) || pid_part.is_empty() {
        return None;
    }
    let ns: i64 = ns_part.parse().ok()?;
    let seq: u64 = seq_part.parse().ok()?;
    Some(OrderKey::new(ns, seq))
}

impl BackendStore for DiskStore {
    fn mode(&self) -> StorageMode {
        StorageMode::Disk
    }

    fn put(&self, queue: &QueueName, artifact: Artifact) -> Result<StorageHandle, StoreError> {
        let dir = self.queue_dir(queue);
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        let bytes = container::encode(&artifact)?;
        let path = self.write_atomically(&dir, &artifact_file_name(artifact.key()), &bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(StorageHandle::File(path))
    }

    fn list(&self, queue: &QueueName) -> Result<Vec<StoredEntry>, StoreError> {
        let dir = self.queue_dir(queue);
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut rows: Vec<(OrderKey, String, PathBuf)> = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| StoreError::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(key) = parse_file_name(&name) else {
                continue;
            };
            rows.push((key, name, entry.path()));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| natural_cmp(&a.1, &b.1)));

        Ok(rows
            .into_iter()
            .map(|(key, _, path)| StoredEntry {
                handle: StorageHandle::File(path),
                key,
            })
            .collect())
    }

    fn get(
        &self,
        queue: &QueueName,
        handle: &StorageHandle,
        delete: bool,
    ) -> Result<Artifact, StoreError> {
        let StorageHandle::File(path) = handle else {
            return Err(StoreError::Storage(format!(
                "handle {handle} does not belong to the disk store"
            )));
        };
        if path.parent() != Some(self.queue_dir(queue).as_path()) {
            return Err(StoreError::Storage(format!(
                "{} is not in queue '{queue}'",
                path.display()
            )));
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(handle.to_string()));
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let artifact = container::decode(&bytes)?;

        if delete {
            match fs::remove_file(path) {
                Ok(()) => {}
                // Consumed by another process after our read.
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(path = %path.display(), "artifact vanished during consume");
                    return Err(StoreError::NotFound(handle.to_string()));
                }
                Err(e) => return Err(StoreError::io(path, e)),
            }
        }
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ArtifactId, ArtifactMeta, StoreDevice, TensorTriplet};
    use ulid::Ulid;

    fn artifact(ns: i64, seq: u64, tag: &str) -> Artifact {
        Artifact::new(
            ArtifactMeta {
                id: ArtifactId::from_ulid(Ulid::new()),
                key: OrderKey::new(ns, seq),
                store_device: StoreDevice::Cpu,
            },
            TensorTriplet::new(tag, "pos", "neg"),
        )
    }

    #[test]
    fn file_names_sort_like_keys() {
        let a = artifact_file_name(OrderKey::new(9, 99));
        let b = artifact_file_name(OrderKey::new(10, 1));
        let c = artifact_file_name(OrderKey::new(10, 2));
        assert!(a < b && b < c);
        assert_eq!(parse_file_name(&b), Some(OrderKey::new(10, 1)));
    }

    #[test]
    fn ignores_foreign_and_temp_files() {
        assert_eq!(parse_file_name("notes.txt"), None);
        assert_eq!(parse_file_name(".00000000000000000010-000000000001-1.stash.tmp"), None);
        assert_eq!(parse_file_name("10-1-1.stash"), None);
    }

    #[test]
    fn put_list_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let q = QueueName::new("batch");

        store.put(&q, artifact(2_000, 1, "second")).unwrap();
        store.put(&q, artifact(1_000, 0, "first")).unwrap();
        fs::write(store.queue_dir(&q).join("README.md"), "hi").unwrap();

        let listed = store.list(&q).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].key, OrderKey::new(1_000, 0));

        let first = store.get(&q, &listed[0].handle, true).unwrap();
        assert_eq!(first.payload.primary.as_bytes(), b"first");
        assert_eq!(store.list(&q).unwrap().len(), 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let q = QueueName::new("q");
        let handle = store.put(&q, artifact(1, 0, "x")).unwrap();

        store.get(&q, &handle, true).unwrap();
        let err = store.get(&q, &handle, true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn corrupt_file_is_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        let q = QueueName::new("q");
        let handle = store.put(&q, artifact(1, 0, "x")).unwrap();
        let StorageHandle::File(path) = &handle else {
            panic!("disk handle expected");
        };
        fs::write(path, b"garbage").unwrap();

        assert!(matches!(store.get(&q, &handle, true), Err(StoreError::Codec(_))));
        assert!(path.exists());
    }

    #[test]
    fn unknown_queue_lists_empty_and_prune_removes_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskStore::new(dir.path());
        assert!(store.list(&QueueName::new("never")).unwrap().is_empty());

        let q = QueueName::new("drained");
        let handle = store.put(&q, artifact(1, 0, "x")).unwrap();
        store.get(&q, &handle, true).unwrap();

        assert_eq!(store.prune_empty_queues().unwrap(), 1);
        assert!(!store.queue_dir(&q).exists());
    }
}
