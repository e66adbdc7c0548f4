//! External collaborators notified after committed operations.
//!
//! # Responsibility
//! - Append human-readable descriptions to the changelog.
//! - Publish changed artifacts through a version-control capability.

pub mod changelog;
pub mod vcs;
