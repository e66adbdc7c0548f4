//! Core domain logic for the tiered roster.
//! This crate is the single source of truth for ranking invariants.

pub mod config;
pub mod logging;
pub mod model;
pub mod publish;
pub mod ranking;
pub mod repo;
pub mod service;
pub mod transaction;

pub use config::{ConfigError, RosterConfig, DEFAULT_CONFIG_FILE, SIMULATE_PUBLISH_ENV};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::item::{Item, RankLabel};
pub use model::tier::{InvariantViolation, RankedItem, Tier, TierSet, MID_CAPACITY, TOP_CAPACITY};
pub use publish::changelog::{ChangeLog, ChangeLogError, MarkdownChangeLog};
pub use publish::vcs::{
    is_git_work_tree, publisher_from_config, GitPublisher, PublishError, SimulatedPublisher,
    VcsPublisher,
};
pub use ranking::history::HistoryRecorder;
pub use ranking::position::ItemRef;
pub use repo::tier_repo::{JsonTierRepository, RepoError, RepoResult, TierRepository};
pub use service::roster_service::{
    parse_item_ref, InsertRequest, ItemUpdate, Operation, OperationOutcome, RosterError,
    RosterResult, RosterService,
};
pub use service::session::{ApplyReport, PublishStatus, Session, SessionError};
pub use transaction::{BatchError, BatchState, CommitOutcome, TransactionManager};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
