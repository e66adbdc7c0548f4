//! Global position and name resolution across tiers.
//!
//! # Invariants
//! - Lookups never clamp: an out-of-range position is "not found".
//! - Insertion points always clamp into `[0, tier.len()]`.
//! - Name lookup searches Top, then Mid, then Overflow and returns the first
//!   case-insensitive exact match.

use crate::model::tier::{Tier, TierSet};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// User reference to one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    /// 1-based global rank.
    Position(usize),
    Name(String),
}

impl ItemRef {
    /// Parses raw user input. Returns `None` for blank input.
    ///
    /// All-digit input is a position; anything else is a name.
    pub fn parse(input: &str) -> Option<ItemRef> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(position) = trimmed.parse::<usize>() {
                return Some(Self::Position(position));
            }
        }
        Some(Self::Name(trimmed.to_string()))
    }
}

impl Display for ItemRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position(position) => write!(f, "#{position}"),
            Self::Name(name) => write!(f, "`{name}`"),
        }
    }
}

/// 1-based global rank of `tier[index]`.
pub fn global_rank(tier: Tier, index: usize) -> usize {
    tier.offset() + index + 1
}

/// Maps a global position onto an existing item slot.
pub fn locate(tiers: &TierSet, position: usize) -> Option<(Tier, usize)> {
    if position == 0 {
        return None;
    }
    let tier = Tier::for_position(position);
    let index = position - tier.offset() - 1;
    (index < tiers.tier(tier).len()).then_some((tier, index))
}

/// Maps a global position onto an insertion slot, clamped to the tier end.
pub fn insertion_point(tiers: &TierSet, position: usize) -> (Tier, usize) {
    let position = position.max(1);
    let tier = Tier::for_position(position);
    let index = position - tier.offset() - 1;
    (tier, index.min(tiers.tier(tier).len()))
}

/// Clamps a requested 0-based local index into `[0, len]`; `None` means append.
pub fn clamp_insert_index(len: usize, requested: Option<usize>) -> usize {
    requested.map_or(len, |index| index.min(len))
}

/// First case-insensitive exact name match, searching tiers in rank order.
pub fn find_by_name(tiers: &TierSet, name: &str) -> Option<(Tier, usize)> {
    Tier::ALL.into_iter().find_map(|tier| {
        tiers
            .tier(tier)
            .iter()
            .position(|item| item.name_matches(name))
            .map(|index| (tier, index))
    })
}

pub fn resolve(tiers: &TierSet, item_ref: &ItemRef) -> Option<(Tier, usize)> {
    match item_ref {
        ItemRef::Position(position) => locate(tiers, *position),
        ItemRef::Name(name) => find_by_name(tiers, name),
    }
}

/// Lower-cased names that occur more than once across all tiers.
pub fn duplicate_names(tiers: &TierSet) -> Vec<String> {
    let mut counts = BTreeMap::<String, usize>::new();
    for tier in Tier::ALL {
        for item in tiers.tier(tier) {
            *counts.entry(item.name.trim().to_lowercase()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        clamp_insert_index, duplicate_names, find_by_name, global_rank, insertion_point, locate,
        ItemRef,
    };
    use crate::model::item::Item;
    use crate::model::tier::{Tier, TierSet};

    fn tiers(top: usize, mid: usize, overflow: usize) -> TierSet {
        let build = |prefix: &str, count: usize| {
            (0..count)
                .map(|index| Item::new(format!("{prefix}-{index}"), "c"))
                .collect::<Vec<_>>()
        };
        TierSet {
            top: build("top", top),
            mid: build("mid", mid),
            overflow: build("overflow", overflow),
        }
    }

    #[test]
    fn item_ref_parses_positions_and_names() {
        assert_eq!(ItemRef::parse(" 12 "), Some(ItemRef::Position(12)));
        assert_eq!(
            ItemRef::parse("Sonic Wave"),
            Some(ItemRef::Name("Sonic Wave".to_string()))
        );
        assert_eq!(ItemRef::parse("12b"), Some(ItemRef::Name("12b".to_string())));
        assert_eq!(ItemRef::parse("   "), None);
    }

    #[test]
    fn locate_rejects_out_of_range_positions() {
        let state = tiers(75, 10, 3);
        assert_eq!(locate(&state, 0), None);
        assert_eq!(locate(&state, 1), Some((Tier::Top, 0)));
        assert_eq!(locate(&state, 85), Some((Tier::Mid, 9)));
        assert_eq!(locate(&state, 86), None);
        assert_eq!(locate(&state, 153), Some((Tier::Overflow, 2)));
        assert_eq!(locate(&state, 154), None);
    }

    #[test]
    fn insertion_point_clamps_to_tier_end() {
        let state = tiers(75, 10, 3);
        assert_eq!(insertion_point(&state, 0), (Tier::Top, 0));
        assert_eq!(insertion_point(&state, 100), (Tier::Mid, 10));
        assert_eq!(insertion_point(&state, 400), (Tier::Overflow, 3));
        assert_eq!(clamp_insert_index(4, Some(9)), 4);
        assert_eq!(clamp_insert_index(4, None), 4);
        assert_eq!(clamp_insert_index(4, Some(1)), 1);
    }

    #[test]
    fn find_by_name_prefers_higher_tier() {
        let mut state = tiers(2, 2, 0);
        state.mid[1].name = "TOP-1".to_string();
        assert_eq!(find_by_name(&state, "top-1"), Some((Tier::Top, 1)));
        assert_eq!(find_by_name(&state, "missing"), None);
        assert_eq!(duplicate_names(&state), vec!["top-1".to_string()]);
    }

    #[test]
    fn global_rank_uses_fixed_offsets() {
        assert_eq!(global_rank(Tier::Top, 0), 1);
        assert_eq!(global_rank(Tier::Mid, 0), 76);
        assert_eq!(global_rank(Tier::Overflow, 49), 200);
    }
}
