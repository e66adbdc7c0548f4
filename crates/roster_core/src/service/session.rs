//! Interactive session state.
//!
//! # Responsibility
//! - Carry everything one front-end session needs (service, collaborators,
//!   batch state) as one explicit value instead of process globals.
//! - Notify the changelog and publisher after each committed operation.
//!
//! # Invariants
//! - Outside a batch, every modifying operation is published on its own.
//! - Inside a batch, operations persist immediately but publishing is
//!   deferred to `commit_batch`.
//! - Changelog and publish failures never undo saved tier state.
//! - While a snapshot from an abandoned batch is on disk, modifying
//!   operations are refused until the batch is resumed and closed.

use crate::model::tier::RankedItem;
use crate::publish::changelog::ChangeLog;
use crate::publish::vcs::{PublishError, VcsPublisher};
use crate::repo::tier_repo::TierRepository;
use crate::service::roster_service::{
    Operation, OperationOutcome, RosterError, RosterResult, RosterService,
};
use crate::transaction::{BatchError, BatchState, CommitOutcome, TransactionManager};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use uuid::Uuid;

/// Errors surfaced by session entry points.
#[derive(Debug)]
pub enum SessionError {
    Roster(RosterError),
    Batch(BatchError),
    /// A standalone publish retry failed.
    Publish(PublishError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Roster(err) => write!(f, "{err}"),
            Self::Batch(err) => write!(f, "{err}"),
            Self::Publish(err) => write!(f, "publish failed: {err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Roster(err) => Some(err),
            Self::Batch(err) => Some(err),
            Self::Publish(err) => Some(err),
        }
    }
}

impl From<RosterError> for SessionError {
    fn from(value: RosterError) -> Self {
        Self::Roster(value)
    }
}

impl From<PublishError> for SessionError {
    fn from(value: PublishError) -> Self {
        Self::Publish(value)
    }
}

impl From<BatchError> for SessionError {
    fn from(value: BatchError) -> Self {
        Self::Batch(value)
    }
}

/// What happened to the publish step of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Published,
    /// Held for the batch commit.
    Deferred,
    /// Nothing changed, so nothing was logged or published.
    Skipped,
    /// Tier state is saved; the caller should retry publishing later.
    Failed(String),
}

/// Result of `Session::apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcome: OperationOutcome,
    pub publish: PublishStatus,
}

/// One interactive session over a roster.
pub struct Session<R: TierRepository, C: ChangeLog, P: VcsPublisher> {
    roster: RosterService<R>,
    changelog: C,
    publisher: P,
    transactions: TransactionManager,
}

impl<R: TierRepository, C: ChangeLog, P: VcsPublisher> Session<R, C, P> {
    pub fn new(
        roster: RosterService<R>,
        changelog: C,
        publisher: P,
        transactions: TransactionManager,
    ) -> Self {
        Self {
            roster,
            changelog,
            publisher,
            transactions,
        }
    }

    pub fn roster(&self) -> &RosterService<R> {
        &self.roster
    }

    pub fn list_all(&self) -> RosterResult<Vec<RankedItem>> {
        self.roster.list_all()
    }

    pub fn search(&self, query: &str) -> RosterResult<RankedItem> {
        self.roster.search(query)
    }

    /// Tier files plus the changelog, in that order.
    pub fn artifacts(&self) -> Vec<PathBuf> {
        let mut artifacts = self.roster.repo().artifact_paths();
        artifacts.extend(self.changelog.artifact_path());
        artifacts
    }

    /// Runs one operation and notifies collaborators.
    pub fn apply(&mut self, operation: Operation) -> Result<ApplyReport, SessionError> {
        let kind = operation.kind();
        if self.transactions.has_abandoned_snapshot() {
            let dir = self.transactions.snapshot_dir().to_path_buf();
            return Err(BatchError::SnapshotExists(dir).into());
        }
        let outcome = self.roster.execute(operation)?;
        if !outcome.modified {
            return Ok(ApplyReport {
                outcome,
                publish: PublishStatus::Skipped,
            });
        }

        let description = outcome.description();
        let recorder = self.roster.recorder();
        if let Err(err) = self.changelog.append(&description, recorder.date()) {
            warn!("event=changelog_append module=session status=error op={kind} error={err}");
        }

        let publish = if self.transactions.is_active() {
            self.transactions.record(description)?;
            PublishStatus::Deferred
        } else {
            match self.publisher.publish(&self.artifacts(), &description) {
                Ok(()) => PublishStatus::Published,
                Err(err) => {
                    warn!("event=publish module=session status=error op={kind}");
                    PublishStatus::Failed(err.to_string())
                }
            }
        };

        info!(
            "event=session_apply module=session status=ok op={kind} batch={}",
            self.transactions.is_active()
        );
        Ok(ApplyReport { outcome, publish })
    }

    pub fn batch_state(&self) -> BatchState {
        self.transactions.state()
    }

    pub fn is_batch_active(&self) -> bool {
        self.transactions.is_active()
    }

    pub fn begin_batch(&mut self) -> Result<Uuid, SessionError> {
        let artifacts = self.artifacts();
        Ok(self.transactions.begin(&artifacts)?)
    }

    /// Returns whether an earlier process left a batch open.
    pub fn has_abandoned_batch(&self) -> bool {
        self.transactions.has_abandoned_snapshot()
    }

    /// Reopens a batch left open by an earlier process.
    pub fn resume_batch(&mut self) -> Result<Option<Uuid>, SessionError> {
        Ok(self.transactions.resume()?)
    }

    /// Publishes every artifact with `message`, retrying after a failed
    /// immediate publish. Inside a batch use `commit_batch` instead.
    pub fn republish(&self, message: &str) -> Result<(), SessionError> {
        if self.transactions.is_active() {
            return Err(BatchError::AlreadyActive.into());
        }
        self.publisher.publish(&self.artifacts(), message)?;
        info!("event=session_republish module=session status=ok");
        Ok(())
    }

    /// Pending change descriptions of the active batch.
    pub fn pending(&self) -> &[String] {
        self.transactions.pending()
    }

    pub fn commit_batch(&mut self) -> Result<CommitOutcome, SessionError> {
        Ok(self.transactions.commit(&self.publisher)?)
    }

    /// Reverts every artifact to its pre-batch content.
    pub fn rollback_batch(&mut self) -> Result<usize, SessionError> {
        Ok(self.transactions.rollback()?)
    }

    /// Ends the batch keeping on-disk changes unpublished.
    pub fn discard_batch(&mut self) -> Result<usize, SessionError> {
        Ok(self.transactions.discard()?)
    }
}
