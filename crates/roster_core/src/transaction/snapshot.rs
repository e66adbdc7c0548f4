//! Whole-file snapshots of tracked artifacts.
//!
//! # Invariants
//! - A snapshot directory exists only while a batch is open; finding one at
//!   capture time means an earlier session never finished.
//! - Artifacts absent at capture are deleted again by `restore`.
//! - `manifest.json` holds the batch id, every original path with its copy,
//!   and the pending change list, so an abandoned batch can be reopened.

use super::BatchError;
use crate::repo::tier_repo::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SnapshotEntry {
    original: PathBuf,
    /// `None` when the artifact did not exist at capture time.
    copy: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    batch_id: Uuid,
    entries: Vec<SnapshotEntry>,
    #[serde(default)]
    pending: Vec<String>,
}

/// Pre-batch copy of every tracked artifact.
#[derive(Debug)]
pub struct Snapshot {
    dir: PathBuf,
    batch_id: Uuid,
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    /// Copies every existing artifact into a fresh `dir`.
    pub fn capture(dir: &Path, batch_id: Uuid, artifacts: &[PathBuf]) -> Result<Self, BatchError> {
        if dir.exists() {
            return Err(BatchError::SnapshotExists(dir.to_path_buf()));
        }
        std::fs::create_dir_all(dir).map_err(|source| BatchError::Snapshot {
            path: dir.to_path_buf(),
            source,
        })?;

        let snapshot = Self {
            dir: dir.to_path_buf(),
            batch_id,
            entries: Vec::with_capacity(artifacts.len()),
        };
        match snapshot.fill(artifacts) {
            Ok(snapshot) => Ok(snapshot),
            Err(err) => {
                let _ = std::fs::remove_dir_all(dir);
                Err(err)
            }
        }
    }

    /// Reopens the snapshot left in `dir` by an unfinished batch.
    ///
    /// Returns `None` when no snapshot directory exists, along with the
    /// pending change list otherwise.
    pub fn open(dir: &Path) -> Result<Option<(Self, Vec<String>)>, BatchError> {
        if !dir.exists() {
            return Ok(None);
        }
        let manifest_path = dir.join(MANIFEST_FILE);
        let bytes = std::fs::read(&manifest_path).map_err(|source| BatchError::Snapshot {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|err| BatchError::Snapshot {
                path: manifest_path,
                source: std::io::Error::other(err),
            })?;
        let snapshot = Self {
            dir: dir.to_path_buf(),
            batch_id: manifest.batch_id,
            entries: manifest.entries,
        };
        Ok(Some((snapshot, manifest.pending)))
    }

    fn fill(mut self, artifacts: &[PathBuf]) -> Result<Self, BatchError> {
        for (index, original) in artifacts.iter().enumerate() {
            let copy = match std::fs::read(original) {
                Ok(bytes) => {
                    let file_name = original
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "artifact".to_string());
                    let copy = self.dir.join(format!("{index:02}-{file_name}"));
                    write_atomic(&copy, &bytes).map_err(|source| BatchError::Snapshot {
                        path: copy.clone(),
                        source,
                    })?;
                    Some(copy)
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
                Err(source) => {
                    return Err(BatchError::Snapshot {
                        path: original.clone(),
                        source,
                    })
                }
            };
            self.entries.push(SnapshotEntry {
                original: original.clone(),
                copy,
            });
        }
        self.write_manifest(&[])?;
        Ok(self)
    }

    /// Rewrites `manifest.json` with the current pending change list.
    pub fn write_manifest(&self, pending: &[String]) -> Result<(), BatchError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        let manifest = Manifest {
            batch_id: self.batch_id,
            entries: self.entries.clone(),
            pending: pending.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&manifest).map_err(|err| BatchError::Snapshot {
            path: manifest_path.clone(),
            source: std::io::Error::other(err),
        })?;
        write_atomic(&manifest_path, &bytes).map_err(|source| BatchError::Snapshot {
            path: manifest_path,
            source,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    /// Original paths covered by this snapshot.
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .map(|entry| entry.original.clone())
            .collect()
    }

    /// Writes every artifact back to its captured content.
    ///
    /// Stops at the first failure; the snapshot stays intact on disk.
    pub fn restore(&self) -> Result<(), BatchError> {
        for entry in &self.entries {
            let result = match &entry.copy {
                Some(copy) => {
                    std::fs::read(copy).and_then(|bytes| write_atomic(&entry.original, &bytes))
                }
                None => match std::fs::remove_file(&entry.original) {
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    other => other,
                },
            };
            result.map_err(|source| BatchError::RestoreFailed {
                path: entry.original.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Deletes the snapshot directory.
    pub fn remove(self) -> Result<(), BatchError> {
        std::fs::remove_dir_all(&self.dir).map_err(|source| BatchError::Snapshot {
            path: self.dir.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;
    use crate::transaction::BatchError;
    use uuid::Uuid;

    #[test]
    fn restore_reverts_changes_and_removes_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("top.json");
        let created = dir.path().join("CHANGELOG.md");
        std::fs::write(&kept, b"[]\n").unwrap();

        let snap_dir = dir.path().join("snap");
        let snapshot =
            Snapshot::capture(&snap_dir, Uuid::new_v4(), &[kept.clone(), created.clone()]).unwrap();
        std::fs::write(&kept, b"[{\"changed\": true}]\n").unwrap();
        std::fs::write(&created, b"# Changelog\n").unwrap();

        snapshot.restore().unwrap();
        assert_eq!(std::fs::read(&kept).unwrap(), b"[]\n");
        assert!(!created.exists());

        let snapshot_dir = snapshot.dir().to_path_buf();
        snapshot.remove().unwrap();
        assert!(!snapshot_dir.exists());
    }

    #[test]
    fn capture_refuses_existing_snapshot_dir() {
        let dir = tempfile::tempdir().unwrap();
        let snap_dir = dir.path().join("snap");
        std::fs::create_dir_all(&snap_dir).unwrap();

        let err = Snapshot::capture(&snap_dir, Uuid::new_v4(), &[]).unwrap_err();
        assert!(matches!(err, BatchError::SnapshotExists(path) if path == snap_dir));
    }

    #[test]
    fn open_reads_back_manifest_and_pending_list() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("mid.json");
        std::fs::write(&artifact, b"[]\n").unwrap();
        let snap_dir = dir.path().join("snap");
        let id = Uuid::new_v4();

        let snapshot = Snapshot::capture(&snap_dir, id, &[artifact.clone()]).unwrap();
        snapshot
            .write_manifest(&["Added A".to_string(), "Removed B".to_string()])
            .unwrap();
        drop(snapshot);

        let (reopened, pending) = Snapshot::open(&snap_dir).unwrap().unwrap();
        assert_eq!(reopened.batch_id(), id);
        assert_eq!(reopened.tracked(), vec![artifact]);
        assert_eq!(pending, vec!["Added A".to_string(), "Removed B".to_string()]);
        assert!(Snapshot::open(&dir.path().join("absent")).unwrap().is_none());
    }

    #[test]
    fn open_rejects_directory_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("snap")).unwrap();

        let err = Snapshot::open(&dir.path().join("snap")).unwrap_err();
        assert!(matches!(err, BatchError::Snapshot { .. }));
    }
}
