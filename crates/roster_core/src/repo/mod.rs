//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-state load/save contract for tier data.
//! - Isolate file layout and serialization from ranking and service logic.
//!
//! # Invariants
//! - Repository writes must enforce `TierSet::validate()` before persistence.

pub mod tier_repo;
