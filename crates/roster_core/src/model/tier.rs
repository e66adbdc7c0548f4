//! Tier partitioning of the global ranking.
//!
//! # Responsibility
//! - Name the three ordered tiers and their capacity/offset constants.
//! - Hold the in-memory tier state loaded from and saved to storage.
//!
//! # Invariants
//! - `rank = tier.offset() + local_index + 1`.
//! - Top and Mid hold at most 75 items; Overflow is unbounded.
//! - An item carries history iff it is in the top tier.

use super::item::Item;
use std::fmt::{Display, Formatter};

/// Capacity of the top tier.
pub const TOP_CAPACITY: usize = 75;
/// Capacity of the mid tier.
pub const MID_CAPACITY: usize = 75;

/// One of the three ordered sub-lists forming the global ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Top,
    Mid,
    Overflow,
}

impl Tier {
    /// All tiers in ranking order.
    pub const ALL: [Tier; 3] = [Tier::Top, Tier::Mid, Tier::Overflow];

    /// Maximum item count, `None` when unbounded.
    pub fn capacity(self) -> Option<usize> {
        match self {
            Self::Top => Some(TOP_CAPACITY),
            Self::Mid => Some(MID_CAPACITY),
            Self::Overflow => None,
        }
    }

    /// Number of global ranks preceding this tier.
    pub fn offset(self) -> usize {
        match self {
            Self::Top => 0,
            Self::Mid => TOP_CAPACITY,
            Self::Overflow => TOP_CAPACITY + MID_CAPACITY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Top => "Top",
            Self::Mid => "Mid",
            Self::Overflow => "Overflow",
        }
    }

    /// Base file name (without extension) used by file-backed stores.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Mid => "mid",
            Self::Overflow => "overflow",
        }
    }

    /// Returns the tier owning a 1-based global position. Position 0 maps to Top.
    pub fn for_position(position: usize) -> Tier {
        if position <= TOP_CAPACITY {
            Self::Top
        } else if position <= TOP_CAPACITY + MID_CAPACITY {
            Self::Mid
        } else {
            Self::Overflow
        }
    }

    /// Parses user tier input (case-insensitive).
    pub fn parse(value: &str) -> Option<Tier> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" | "main" => Some(Self::Top),
            "mid" | "extended" => Some(Self::Mid),
            "overflow" | "legacy" => Some(Self::Overflow),
            _ => None,
        }
    }

    /// Next lower tier, if any.
    pub fn below(self) -> Option<Tier> {
        match self {
            Self::Top => Some(Self::Mid),
            Self::Mid => Some(Self::Overflow),
            Self::Overflow => None,
        }
    }
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Invariant breach detected on a tier state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    OverCapacity { tier: Tier, len: usize },
    UnexpectedHistory { tier: Tier, name: String },
    MissingHistory { name: String },
    BlankName { tier: Tier, index: usize },
}

impl Display for InvariantViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OverCapacity { tier, len } => write!(
                f,
                "{tier} tier holds {len} items, capacity is {}",
                tier.capacity().unwrap_or(usize::MAX)
            ),
            Self::UnexpectedHistory { tier, name } => {
                write!(f, "item `{name}` in {tier} tier must not carry history")
            }
            Self::MissingHistory { name } => {
                write!(f, "item `{name}` in Top tier is missing history")
            }
            Self::BlankName { tier, index } => {
                write!(f, "item at {tier} index {index} has a blank name")
            }
        }
    }
}

/// Full three-tier state, loaded and saved as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierSet {
    pub top: Vec<Item>,
    pub mid: Vec<Item>,
    pub overflow: Vec<Item>,
}

impl TierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, tier: Tier) -> &Vec<Item> {
        match tier {
            Tier::Top => &self.top,
            Tier::Mid => &self.mid,
            Tier::Overflow => &self.overflow,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut Vec<Item> {
        match tier {
            Tier::Top => &mut self.top,
            Tier::Mid => &mut self.mid,
            Tier::Overflow => &mut self.overflow,
        }
    }

    pub fn total_len(&self) -> usize {
        self.top.len() + self.mid.len() + self.overflow.len()
    }

    /// Returns every invariant breach in this state, empty when valid.
    pub fn validate(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        for tier in Tier::ALL {
            let items = self.tier(tier);
            if let Some(capacity) = tier.capacity() {
                if items.len() > capacity {
                    violations.push(InvariantViolation::OverCapacity {
                        tier,
                        len: items.len(),
                    });
                }
            }
            for (index, item) in items.iter().enumerate() {
                if item.name.trim().is_empty() {
                    violations.push(InvariantViolation::BlankName { tier, index });
                }
                let has_entries = item.history.as_ref().is_some_and(|entries| !entries.is_empty());
                match (tier, item.has_history()) {
                    (Tier::Top, _) if !has_entries => {
                        violations.push(InvariantViolation::MissingHistory {
                            name: item.name.clone(),
                        })
                    }
                    (Tier::Mid | Tier::Overflow, true) => {
                        violations.push(InvariantViolation::UnexpectedHistory {
                            tier,
                            name: item.name.clone(),
                        })
                    }
                    _ => {}
                }
            }
        }
        violations
    }
}

/// Read projection of one item with its resolved placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedItem {
    pub tier: Tier,
    pub index: usize,
    /// 1-based global rank.
    pub rank: usize,
    pub item: Item,
}
