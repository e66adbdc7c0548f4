//! Roster item domain model.
//!
//! # Responsibility
//! - Define the canonical record stored in every tier file.
//! - Keep category labels typed while preserving unknown stored values.
//!
//! # Invariants
//! - `name` is the lookup key and must not be blank.
//! - `history` is `Some` only while the item sits in the top tier.
//! - Serialization is lossless: unknown labels and a stored `0` external
//!   position are written back exactly as read.

use serde::{Deserialize, Serialize};

/// Category label attached to every item.
///
/// Known labels are matched exactly; anything else is kept verbatim in
/// `Other` so existing data survives a load/save cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RankLabel {
    Extreme,
    Insane,
    Hard,
    Medium,
    Easy,
    Other(String),
}

impl RankLabel {
    /// Stable string stored in tier files.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Extreme => "Extreme",
            Self::Insane => "Insane",
            Self::Hard => "Hard",
            Self::Medium => "Medium",
            Self::Easy => "Easy",
            Self::Other(value) => value.as_str(),
        }
    }

    /// Returns whether this label is outside the known category set.
    pub fn is_other(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl Default for RankLabel {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for RankLabel {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Extreme" => Self::Extreme,
            "Insane" => Self::Insane,
            "Hard" => Self::Hard,
            "Medium" => Self::Medium,
            "Easy" => Self::Easy,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for RankLabel {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RankLabel> for String {
    fn from(value: RankLabel) -> Self {
        match value {
            RankLabel::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RankLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ranked entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Display name, also used for case-insensitive lookup.
    pub name: String,
    #[serde(default)]
    pub creator: String,
    /// Optional media reference (video URL, image path, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    #[serde(default)]
    pub rank_label: RankLabel,
    #[serde(default)]
    pub scale: String,
    /// Position on an external list. `None` and `Some(0)` both mean unranked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_position: Option<u32>,
    /// Audit trail, present iff the item is in the top tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<String>>,
}

impl Item {
    /// Creates an item with empty optional fields and no history.
    pub fn new(name: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            creator: creator.into(),
            media: None,
            rank_label: RankLabel::default(),
            scale: String::new(),
            external_position: None,
            history: None,
        }
    }

    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    /// Returns whether the item holds a real position on the external list.
    pub fn is_externally_ranked(&self) -> bool {
        matches!(self.external_position, Some(position) if position > 0)
    }

    /// Case-insensitive exact name match against a trimmed query.
    pub fn name_matches(&self, query: &str) -> bool {
        self.name.trim().to_lowercase() == query.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, RankLabel};

    #[test]
    fn known_labels_parse_exactly() {
        assert_eq!(RankLabel::from("Extreme"), RankLabel::Extreme);
        assert_eq!(RankLabel::from("Easy"), RankLabel::Easy);
        assert_eq!(
            RankLabel::from("extreme"),
            RankLabel::Other("extreme".to_string())
        );
    }

    #[test]
    fn other_label_keeps_raw_value() {
        let label = RankLabel::from("Mythic");
        assert!(label.is_other());
        assert_eq!(String::from(label), "Mythic");
    }

    #[test]
    fn external_position_zero_is_unranked() {
        let mut item = Item::new("Alpha", "someone");
        assert!(!item.is_externally_ranked());
        item.external_position = Some(0);
        assert!(!item.is_externally_ranked());
        item.external_position = Some(12);
        assert!(item.is_externally_ranked());
    }

    #[test]
    fn name_match_ignores_case_and_outer_whitespace() {
        let item = Item::new("Bloodbath", "Riot");
        assert!(item.name_matches("  bloodBATH "));
        assert!(!item.name_matches("Bloodbat"));
    }
}
