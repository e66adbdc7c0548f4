//! Audit trail rules for top-tier items.
//!
//! # Responsibility
//! - Initialize, append to and strip item history as items enter, move
//!   within and leave the top tier.
//!
//! # Invariants
//! - Only items currently in the top tier ever receive entries.
//! - Leaving the top tier deletes the whole history; the exit is not logged.
//! - Entry order is chronological; wording is informational only.

use crate::model::item::Item;
use crate::model::tier::TierSet;

/// Writes dated history entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecorder {
    date: String,
}

impl HistoryRecorder {
    pub fn new(date: impl Into<String>) -> Self {
        Self { date: date.into() }
    }

    /// Recorder stamped with the local calendar date (`YYYY-MM-DD`).
    pub fn today() -> Self {
        Self::new(chrono::Local::now().format("%Y-%m-%d").to_string())
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Records a new item at `top[index]` and the downward shift of every
    /// item after it.
    pub fn record_insert(&self, top: &mut [Item], index: usize) {
        let text = format!("Placed at #{}{}", index + 1, neighbors(top, index));
        top[index].history = Some(vec![self.entry(&text)]);

        let name = top[index].name.clone();
        for item in top.iter_mut().skip(index + 1) {
            self.append(item, &format!("{name} was added above (-1)"));
        }
    }

    /// Records a move inside the top tier. `top` is already reordered: the
    /// mover sits at `to` and used to sit at `from`.
    pub fn record_move_within_top(&self, top: &mut [Item], from: usize, to: usize) {
        if from == to {
            return;
        }
        let delta = from as i64 - to as i64;
        let text = format!("Moved to #{} ({delta:+}){}", to + 1, neighbors(top, to));
        self.append(&mut top[to], &text);

        let name = top[to].name.clone();
        if to < from {
            for item in &mut top[to + 1..=from] {
                self.append(item, &format!("{name} moved above (-1)"));
            }
        } else {
            for item in &mut top[from..to] {
                self.append(item, &format!("{name} moved below (+1)"));
            }
        }
    }

    /// Records an item arriving at `top[index]` from a lower tier.
    pub fn record_entry_into_top(&self, top: &mut [Item], index: usize, old_rank: usize) {
        let new_rank = index + 1;
        let delta = old_rank as i64 - new_rank as i64;
        let text = format!(
            "Moved up to #{new_rank} from #{old_rank} ({delta:+}){}",
            neighbors(top, index)
        );
        top[index].history = Some(vec![self.entry(&text)]);

        let name = top[index].name.clone();
        for item in top.iter_mut().skip(index + 1) {
            self.append(item, &format!("{name} moved above (-1)"));
        }
    }

    /// Starts history for an item promoted into the top tier at `rank`.
    pub fn record_promotion(&self, item: &mut Item, from_rank: usize, rank: usize) {
        let text = format!("Promoted to #{rank} from #{from_rank}");
        item.history = Some(vec![self.entry(&text)]);
    }

    /// Restores history residency on loaded data: Top items without entries
    /// get a seed entry, items outside Top lose their history.
    ///
    /// Returns the number of items changed.
    pub fn repair(&self, tiers: &mut TierSet) -> usize {
        let mut repaired = 0;
        for (index, item) in tiers.top.iter_mut().enumerate() {
            if item.history.as_ref().map_or(true, Vec::is_empty) {
                item.history = Some(vec![self.entry(&format!("Recorded at #{}", index + 1))]);
                repaired += 1;
            }
        }
        for item in tiers.mid.iter_mut().chain(tiers.overflow.iter_mut()) {
            if item.history.take().is_some() {
                repaired += 1;
            }
        }
        repaired
    }

    /// Strips history from an item leaving the top tier.
    pub fn clear(item: &mut Item) {
        item.history = None;
    }

    fn entry(&self, text: &str) -> String {
        format!("{}: {text}", self.date)
    }

    fn append(&self, item: &mut Item, text: &str) {
        let entry = self.entry(text);
        item.history.get_or_insert_with(Vec::new).push(entry);
    }
}

fn neighbors(top: &[Item], index: usize) -> String {
    let above = index
        .checked_sub(1)
        .and_then(|above| top.get(above))
        .map(|item| item.name.as_str());
    let below = top.get(index + 1).map(|item| item.name.as_str());
    match (above, below) {
        (Some(above), Some(below)) => format!(" below {above} and above {below}"),
        (Some(above), None) => format!(" below {above}"),
        (None, Some(below)) => format!(" above {below}"),
        (None, None) => String::new(),
    }
}
