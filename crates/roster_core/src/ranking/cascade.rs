//! Tier capacity normalization.
//!
//! # Responsibility
//! - Push overflow down the tiers after a structural change (`cascade`).
//! - Pull one item up per tier after an item leaves (`fill_gaps`).
//!
//! # Invariants
//! - After `cascade`, Top and Mid are within capacity.
//! - `cascade` on a valid state changes nothing and reports nothing.
//! - `fill_gaps` promotes at most one item into each of Top and Mid.

use crate::model::item::Item;
use crate::model::tier::{Tier, TierSet, MID_CAPACITY, TOP_CAPACITY};
use crate::ranking::history::HistoryRecorder;
use crate::ranking::position::global_rank;
use log::debug;

/// Moves every item past Top capacity to the front of Mid, then every item
/// past Mid capacity to the front of Overflow. Returns one description per
/// relocated item.
pub fn cascade(tiers: &mut TierSet) -> Vec<String> {
    let mut changes = Vec::new();
    spill(tiers, Tier::Top, TOP_CAPACITY, &mut changes);
    spill(tiers, Tier::Mid, MID_CAPACITY, &mut changes);
    if !changes.is_empty() {
        debug!(
            "event=cascade module=ranking status=ok relocated={}",
            changes.len()
        );
    }
    changes
}

fn spill(tiers: &mut TierSet, from: Tier, capacity: usize, changes: &mut Vec<String>) {
    let Some(to) = from.below() else {
        return;
    };
    if tiers.tier(from).len() <= capacity {
        return;
    }

    let mut block: Vec<Item> = tiers.tier_mut(from).split_off(capacity);
    for (offset, item) in block.iter_mut().enumerate() {
        HistoryRecorder::clear(item);
        changes.push(format!(
            "{} dropped from {from} rank {} to {to} rank {}",
            item.name,
            global_rank(from, capacity + offset),
            global_rank(to, offset)
        ));
    }
    tiers.tier_mut(to).splice(0..0, block);
}

/// Backfills the gap left by a removed item: the first Mid item joins the
/// end of Top when Top is short, then the first Overflow item joins the end
/// of Mid when Mid is short.
pub fn fill_gaps(tiers: &mut TierSet, recorder: &HistoryRecorder) -> Vec<String> {
    let mut changes = Vec::new();

    if tiers.top.len() < TOP_CAPACITY && !tiers.mid.is_empty() {
        let mut item = tiers.mid.remove(0);
        let from_rank = global_rank(Tier::Mid, 0);
        let rank = global_rank(Tier::Top, tiers.top.len());
        recorder.record_promotion(&mut item, from_rank, rank);
        changes.push(format!(
            "{} promoted from Mid rank {from_rank} to Top rank {rank}",
            item.name
        ));
        tiers.top.push(item);
    }

    if tiers.mid.len() < MID_CAPACITY && !tiers.overflow.is_empty() {
        let mut item = tiers.overflow.remove(0);
        HistoryRecorder::clear(&mut item);
        let from_rank = global_rank(Tier::Overflow, 0);
        let rank = global_rank(Tier::Mid, tiers.mid.len());
        changes.push(format!(
            "{} promoted from Overflow rank {from_rank} to Mid rank {rank}",
            item.name
        ));
        tiers.mid.push(item);
    }

    changes
}
