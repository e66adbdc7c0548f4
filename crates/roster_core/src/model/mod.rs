//! Roster domain model.
//!
//! # Responsibility
//! - Define items, tiers and the combined tier state used by core logic.
//!
//! # Invariants
//! - Concatenating Top, Mid and Overflow in order yields the global ranking.
//! - Global positions are derived, never stored.

pub mod item;
pub mod tier;
