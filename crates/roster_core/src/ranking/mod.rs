//! Ranking rules over the three-tier state.
//!
//! # Responsibility
//! - Resolve user references to tier slots (`position`).
//! - Maintain top-tier audit trails (`history`).
//! - Restore tier capacities after structural changes (`cascade`).

pub mod cascade;
pub mod history;
pub mod position;
