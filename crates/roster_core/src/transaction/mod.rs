//! Batch session bracketing with snapshot-backed rollback.
//!
//! # Responsibility
//! - Capture tracked artifacts when a batch opens.
//! - Collect pending change descriptions while operations persist directly.
//! - Close the batch by publishing, restoring, or discarding the snapshot.
//!
//! # Invariants
//! - `Idle` has no snapshot and no pending changes.
//! - A failed publish or failed restore leaves the batch `Active` with its
//!   snapshot intact.
//! - Rollback reverts every operation since `begin`, including saved ones.
//! - A snapshot left by an unfinished process is reopened with `resume`,
//!   never overwritten by `begin`.

mod snapshot;

pub use snapshot::Snapshot;

use crate::publish::vcs::{PublishError, VcsPublisher};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Batch state machine errors.
#[derive(Debug)]
pub enum BatchError {
    AlreadyActive,
    NotActive,
    /// A snapshot from an unfinished session is still on disk.
    SnapshotExists(PathBuf),
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Restoring an artifact failed; manual recovery from the snapshot is needed.
    RestoreFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    Publish(PublishError),
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyActive => write!(f, "a batch session is already active"),
            Self::NotActive => write!(f, "no batch session is active"),
            Self::SnapshotExists(path) => write!(
                f,
                "snapshot `{}` from an unfinished session exists; recover or remove it first",
                path.display()
            ),
            Self::Snapshot { path, source } => {
                write!(f, "snapshot i/o failed on `{}`: {source}", path.display())
            }
            Self::RestoreFailed { path, source } => write!(
                f,
                "rollback failed restoring `{}`: {source}; snapshot kept for manual recovery",
                path.display()
            ),
            Self::Publish(err) => write!(f, "publish failed: {err}"),
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Snapshot { source, .. } => Some(source),
            Self::RestoreFailed { source, .. } => Some(source),
            Self::Publish(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PublishError> for BatchError {
    fn from(value: PublishError) -> Self {
        Self::Publish(value)
    }
}

/// Observable batch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Active,
}

/// How a commit closed the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Pending changes were published.
    Published { changes: usize },
    /// Nothing was pending; the batch closed without a publish call.
    NothingToPublish,
}

struct ActiveBatch {
    id: Uuid,
    snapshot: Snapshot,
    pending: Vec<String>,
}

/// Owns the optional active batch and its snapshot.
pub struct TransactionManager {
    snapshot_dir: PathBuf,
    active: Option<ActiveBatch>,
}

impl TransactionManager {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            active: None,
        }
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    pub fn state(&self) -> BatchState {
        if self.active.is_some() {
            BatchState::Active
        } else {
            BatchState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the active batch, used to correlate log events.
    pub fn batch_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|batch| batch.id)
    }

    /// Opens a batch by snapshotting `artifacts`.
    pub fn begin(&mut self, artifacts: &[PathBuf]) -> Result<Uuid, BatchError> {
        if self.active.is_some() {
            return Err(BatchError::AlreadyActive);
        }
        let id = Uuid::new_v4();
        let snapshot = Snapshot::capture(&self.snapshot_dir, id, artifacts)?;
        info!(
            "event=batch_begin module=transaction status=ok batch_id={id} artifacts={}",
            artifacts.len()
        );
        self.active = Some(ActiveBatch {
            id,
            snapshot,
            pending: Vec::new(),
        });
        Ok(id)
    }

    /// Adds one committed operation description to the pending list.
    pub fn record(&mut self, description: impl Into<String>) -> Result<(), BatchError> {
        let batch = self.active.as_mut().ok_or(BatchError::NotActive)?;
        batch.pending.push(description.into());
        if let Err(err) = batch.snapshot.write_manifest(&batch.pending) {
            warn!(
                "event=batch_record module=transaction status=error batch_id={} error={err}",
                batch.id
            );
        }
        Ok(())
    }

    /// Returns whether a snapshot from an unfinished batch is on disk.
    pub fn has_abandoned_snapshot(&self) -> bool {
        self.active.is_none() && self.snapshot_dir.exists()
    }

    /// Reopens a batch abandoned by an earlier process, with its pending list.
    ///
    /// Returns `None` when there is nothing to resume.
    pub fn resume(&mut self) -> Result<Option<Uuid>, BatchError> {
        if self.active.is_some() {
            return Err(BatchError::AlreadyActive);
        }
        let Some((snapshot, pending)) = Snapshot::open(&self.snapshot_dir)? else {
            return Ok(None);
        };
        let id = snapshot.batch_id();
        info!(
            "event=batch_resume module=transaction status=ok batch_id={id} pending={}",
            pending.len()
        );
        self.active = Some(ActiveBatch {
            id,
            snapshot,
            pending,
        });
        Ok(Some(id))
    }

    /// Pending change descriptions, empty when idle.
    pub fn pending(&self) -> &[String] {
        self.active
            .as_ref()
            .map_or(&[][..], |batch| batch.pending.as_slice())
    }

    /// Aggregated commit message for the pending changes.
    pub fn commit_message(&self) -> String {
        let pending = self.pending();
        let mut message = format!("Batch update ({} changes)\n", pending.len());
        if !pending.is_empty() {
            message.push('\n');
        }
        for description in pending {
            message.push_str("- ");
            message.push_str(description);
            message.push('\n');
        }
        message
    }

    /// Publishes tracked artifacts and closes the batch.
    ///
    /// On publish failure the batch stays active so the caller can retry,
    /// roll back, or discard. Once the publish succeeded the batch is closed
    /// even if the snapshot directory cannot be removed.
    pub fn commit<P: VcsPublisher + ?Sized>(
        &mut self,
        publisher: &P,
    ) -> Result<CommitOutcome, BatchError> {
        let batch = self.active.as_ref().ok_or(BatchError::NotActive)?;
        let changes = batch.pending.len();
        let outcome = if changes == 0 {
            CommitOutcome::NothingToPublish
        } else {
            let artifacts = batch.snapshot.tracked();
            if let Err(err) = publisher.publish(&artifacts, &self.commit_message()) {
                error!(
                    "event=batch_commit module=transaction status=error batch_id={} pending={changes}",
                    batch.id
                );
                return Err(err.into());
            }
            CommitOutcome::Published { changes }
        };

        self.close("batch_commit");
        Ok(outcome)
    }

    /// Restores every tracked artifact and closes the batch.
    ///
    /// Returns the number of reverted operations.
    pub fn rollback(&mut self) -> Result<usize, BatchError> {
        let batch = self.active.as_ref().ok_or(BatchError::NotActive)?;
        if let Err(err) = batch.snapshot.restore() {
            error!(
                "event=batch_rollback module=transaction status=error batch_id={} snapshot={}",
                batch.id,
                batch.snapshot.dir().display()
            );
            return Err(err);
        }
        let reverted = batch.pending.len();
        self.close("batch_rollback");
        Ok(reverted)
    }

    /// Keeps on-disk changes without publishing and closes the batch.
    ///
    /// Returns the number of operations that became permanent.
    pub fn discard(&mut self) -> Result<usize, BatchError> {
        let kept = self
            .active
            .as_ref()
            .ok_or(BatchError::NotActive)?
            .pending
            .len();
        self.close("batch_discard");
        Ok(kept)
    }

    /// Ends the active batch. A leftover snapshot directory is logged and
    /// later surfaces through `has_abandoned_snapshot`.
    fn close(&mut self, event: &str) {
        let Some(batch) = self.active.take() else {
            return;
        };
        let id = batch.id;
        let pending = batch.pending.len();
        match batch.snapshot.remove() {
            Ok(()) => {
                info!("event={event} module=transaction status=ok batch_id={id} pending={pending}")
            }
            Err(err) => warn!(
                "event={event} module=transaction status=error batch_id={id} error_code=snapshot_cleanup_failed error={err}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchError, BatchState, CommitOutcome, TransactionManager};
    use crate::publish::vcs::{PublishError, VcsPublisher};
    use std::path::PathBuf;

    struct FailingPublisher;

    impl VcsPublisher for FailingPublisher {
        fn publish(&self, _artifacts: &[PathBuf], _message: &str) -> Result<(), PublishError> {
            Err(PublishError::Failed {
                step: "git push",
                stderr: "remote rejected".to_string(),
            })
        }
    }

    #[test]
    fn state_transitions_follow_begin_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = TransactionManager::new(dir.path().join("snap"));
        assert_eq!(manager.state(), BatchState::Idle);
        assert!(matches!(manager.record("x"), Err(BatchError::NotActive)));

        manager.begin(&[]).unwrap();
        assert_eq!(manager.state(), BatchState::Active);
        assert!(matches!(manager.begin(&[]), Err(BatchError::AlreadyActive)));

        manager.record("Added A").unwrap();
        assert_eq!(manager.pending(), ["Added A".to_string()]);
        assert_eq!(manager.discard().unwrap(), 1);
        assert_eq!(manager.state(), BatchState::Idle);
        assert!(manager.pending().is_empty());
        assert!(!manager.snapshot_dir().exists());
    }

    #[test]
    fn failed_publish_keeps_batch_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = TransactionManager::new(dir.path().join("snap"));
        manager.begin(&[]).unwrap();
        manager.record("Moved A").unwrap();

        let err = manager.commit(&FailingPublisher).unwrap_err();
        assert!(matches!(err, BatchError::Publish(_)));
        assert!(manager.is_active());
        assert_eq!(manager.pending().len(), 1);
        assert!(manager.snapshot_dir().exists());
    }

    #[test]
    fn empty_commit_skips_publish() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = TransactionManager::new(dir.path().join("snap"));
        manager.begin(&[]).unwrap();

        let outcome = manager.commit(&FailingPublisher).unwrap();
        assert_eq!(outcome, CommitOutcome::NothingToPublish);
        assert!(!manager.is_active());
    }

    #[test]
    fn commit_message_lists_pending_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = TransactionManager::new(dir.path().join("snap"));
        manager.begin(&[]).unwrap();
        manager.record("Added A").unwrap();
        manager.record("Removed B").unwrap();

        assert_eq!(
            manager.commit_message(),
            "Batch update (2 changes)\n\n- Added A\n- Removed B\n"
        );
    }

    #[test]
    fn closed_batch_survives_snapshot_cleanup_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut manager = TransactionManager::new(dir.path().join("snap"));
        manager.begin(&[]).unwrap();
        manager.record("Added A").unwrap();
        std::fs::remove_dir_all(manager.snapshot_dir()).unwrap();

        let outcome = manager.commit(&crate::publish::vcs::SimulatedPublisher).unwrap();
        assert_eq!(outcome, CommitOutcome::Published { changes: 1 });
        assert_eq!(manager.state(), BatchState::Idle);
    }

    #[test]
    fn resume_reopens_abandoned_batch_with_pending_list() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("top.json");
        std::fs::write(&artifact, b"[]\n").unwrap();
        let snap_dir = dir.path().join("snap");

        let mut first = TransactionManager::new(&snap_dir);
        let id = first.begin(&[artifact.clone()]).unwrap();
        first.record("Added A").unwrap();
        std::fs::write(&artifact, b"[\"changed\"]\n").unwrap();
        drop(first);

        let mut second = TransactionManager::new(&snap_dir);
        assert!(second.has_abandoned_snapshot());
        assert!(matches!(second.begin(&[]), Err(BatchError::SnapshotExists(_))));
        assert_eq!(second.resume().unwrap(), Some(id));
        assert_eq!(second.pending(), ["Added A".to_string()]);
        assert!(!second.has_abandoned_snapshot());

        assert_eq!(second.rollback().unwrap(), 1);
        assert_eq!(std::fs::read(&artifact).unwrap(), b"[]\n");
        assert!(!snap_dir.exists());
        assert_eq!(second.resume().unwrap(), None);
    }
}
