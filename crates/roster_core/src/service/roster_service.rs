//! Roster use-case service.
//!
//! # Responsibility
//! - Provide list/search/insert/move/delete/edit entry points.
//! - Run every mutation as load -> mutate -> history -> cascade -> save.
//!
//! # Invariants
//! - A reference that does not resolve aborts before any mutation.
//! - Nothing is persisted unless the whole operation succeeded in memory.
//! - Saved state always satisfies `TierSet::validate()`.

use crate::model::item::{Item, RankLabel};
use crate::model::tier::{RankedItem, Tier, TierSet};
use crate::ranking::cascade::{cascade, fill_gaps};
use crate::ranking::history::HistoryRecorder;
use crate::ranking::position::{
    clamp_insert_index, global_rank, insertion_point, resolve, ItemRef,
};
use crate::repo::tier_repo::{RepoError, TierRepository};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RosterResult<T> = Result<T, RosterError>;

/// Service error for roster use-cases.
#[derive(Debug)]
pub enum RosterError {
    /// Caller supplied nothing to act on; treated as a cancel by front ends.
    EmptyInput,
    /// Name or position did not resolve to an item.
    NotFound(ItemRef),
    /// Item name is blank after trim.
    InvalidName,
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for RosterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "no input given"),
            Self::NotFound(item_ref) => write!(f, "no item matches {item_ref}"),
            Self::InvalidName => write!(f, "item name must not be blank"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RosterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for RosterError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Parses raw user input into an item reference, rejecting blank input.
pub fn parse_item_ref(input: &str) -> RosterResult<ItemRef> {
    ItemRef::parse(input).ok_or(RosterError::EmptyInput)
}

/// Request model for adding one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertRequest {
    pub tier: Tier,
    pub item: Item,
    /// 0-based index inside `tier`; clamped, `None` appends.
    pub index: Option<usize>,
}

/// Field replacements for an edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub creator: Option<String>,
    /// `Some(None)` clears the media reference.
    pub media: Option<Option<String>>,
    pub rank_label: Option<RankLabel>,
    pub scale: Option<String>,
    /// `Some(None)` marks the item as externally unranked.
    pub external_position: Option<Option<u32>>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.creator.is_none()
            && self.media.is_none()
            && self.rank_label.is_none()
            && self.scale.is_none()
            && self.external_position.is_none()
    }

    /// Applies replacements and returns the names of fields that changed.
    fn apply(&self, item: &mut Item) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if let Some(name) = &self.name {
            let name = name.trim();
            if item.name != name {
                item.name = name.to_string();
                changed.push("name");
            }
        }
        if let Some(creator) = &self.creator {
            if &item.creator != creator {
                item.creator = creator.clone();
                changed.push("creator");
            }
        }
        if let Some(media) = &self.media {
            if &item.media != media {
                item.media = media.clone();
                changed.push("media");
            }
        }
        if let Some(rank_label) = &self.rank_label {
            if &item.rank_label != rank_label {
                item.rank_label = rank_label.clone();
                changed.push("rank_label");
            }
        }
        if let Some(scale) = &self.scale {
            if &item.scale != scale {
                item.scale = scale.clone();
                changed.push("scale");
            }
        }
        if let Some(external_position) = self.external_position {
            if item.external_position != external_position {
                item.external_position = external_position;
                changed.push("external_position");
            }
        }
        changed
    }
}

/// One mutating roster command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Insert(InsertRequest),
    Move { target: ItemRef, position: usize },
    Delete(ItemRef),
    Edit { target: ItemRef, update: ItemUpdate },
}

impl Operation {
    /// Stable short name used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Insert(_) => "insert",
            Self::Move { .. } => "move",
            Self::Delete(_) => "delete",
            Self::Edit { .. } => "edit",
        }
    }
}

/// Result of one committed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    /// Human-readable description of the requested change.
    pub summary: String,
    /// Relocations performed while restoring tier capacities.
    pub changes: Vec<String>,
    /// `false` when the operation resolved but left storage untouched.
    pub modified: bool,
}

impl OperationOutcome {
    /// Summary followed by every relocation, for changelog/commit text.
    pub fn description(&self) -> String {
        if self.changes.is_empty() {
            return self.summary.clone();
        }
        format!("{} ({})", self.summary, self.changes.join("; "))
    }
}

/// Use-case service over a tier repository.
pub struct RosterService<R: TierRepository> {
    repo: R,
    fixed_date: Option<String>,
}

impl<R: TierRepository> RosterService<R> {
    /// Creates a service stamping history with the local date.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            fixed_date: None,
        }
    }

    /// Pins the date written into history entries.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.fixed_date = Some(date.into());
        self
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// History recorder for the current operation date.
    pub fn recorder(&self) -> HistoryRecorder {
        match &self.fixed_date {
            Some(date) => HistoryRecorder::new(date.clone()),
            None => HistoryRecorder::today(),
        }
    }

    /// Lists every item in global rank order.
    pub fn list_all(&self) -> RosterResult<Vec<RankedItem>> {
        let tiers = self.repo.load()?;
        let mut ranked = Vec::with_capacity(tiers.total_len());
        for tier in Tier::ALL {
            for (index, item) in tiers.tier(tier).iter().enumerate() {
                ranked.push(RankedItem {
                    tier,
                    index,
                    rank: global_rank(tier, index),
                    item: item.clone(),
                });
            }
        }
        Ok(ranked)
    }

    /// Resolves a name or global position to one item.
    pub fn search(&self, query: &str) -> RosterResult<RankedItem> {
        let item_ref = parse_item_ref(query)?;
        let tiers = self.repo.load()?;
        let (tier, index) =
            resolve(&tiers, &item_ref).ok_or_else(|| RosterError::NotFound(item_ref.clone()))?;
        Ok(RankedItem {
            tier,
            index,
            rank: global_rank(tier, index),
            item: tiers.tier(tier)[index].clone(),
        })
    }

    /// Runs one mutating operation.
    pub fn execute(&self, operation: Operation) -> RosterResult<OperationOutcome> {
        match operation {
            Operation::Insert(request) => self.insert(request),
            Operation::Move { target, position } => self.move_item(&target, position),
            Operation::Delete(target) => self.delete(&target),
            Operation::Edit { target, update } => self.edit(&target, &update),
        }
    }

    /// Inserts an item into a tier at a clamped local index.
    pub fn insert(&self, request: InsertRequest) -> RosterResult<OperationOutcome> {
        let InsertRequest {
            tier,
            mut item,
            index,
        } = request;
        let name = item.name.trim().to_string();
        if name.is_empty() {
            return Err(RosterError::InvalidName);
        }

        let recorder = self.recorder();
        let mut tiers = self.load_for_update(&recorder)?;
        if resolve(&tiers, &ItemRef::Name(name.clone())).is_some() {
            warn!("event=roster_insert module=service status=duplicate_name tier={tier}");
        }

        item.name = name.clone();
        item.history = None;
        let items = tiers.tier_mut(tier);
        let index = clamp_insert_index(items.len(), index);
        items.insert(index, item);
        if tier == Tier::Top {
            recorder.record_insert(&mut tiers.top, index);
        }
        let rank = global_rank(tier, index);
        let changes = cascade(&mut tiers);

        self.repo.save(&tiers)?;
        info!(
            "event=roster_insert module=service status=ok tier={tier} rank={rank} relocated={}",
            changes.len()
        );
        Ok(OperationOutcome {
            summary: format!("Added {name} to {tier} at rank {rank}"),
            changes,
            modified: true,
        })
    }

    /// Moves an item to a new global position.
    ///
    /// A move to a lower tier backfills the gap it leaves before the item is
    /// placed, so the item lands on the requested rank whenever that rank
    /// exists.
    pub fn move_item(&self, target: &ItemRef, position: usize) -> RosterResult<OperationOutcome> {
        let recorder = self.recorder();
        let mut tiers = self.load_for_update(&recorder)?;
        let (from_tier, from_index) =
            resolve(&tiers, target).ok_or_else(|| RosterError::NotFound(target.clone()))?;
        let old_rank = global_rank(from_tier, from_index);

        let mut item = tiers.tier_mut(from_tier).remove(from_index);
        let mut changes = Vec::new();
        if Tier::for_position(position.max(1)) > from_tier {
            changes.extend(fill_gaps(&mut tiers, &recorder));
        }

        let (to_tier, to_index) = insertion_point(&tiers, position);
        if to_tier != Tier::Top {
            HistoryRecorder::clear(&mut item);
        }
        let name = item.name.clone();
        tiers.tier_mut(to_tier).insert(to_index, item);
        match (from_tier, to_tier) {
            (Tier::Top, Tier::Top) => {
                recorder.record_move_within_top(&mut tiers.top, from_index, to_index)
            }
            (_, Tier::Top) => recorder.record_entry_into_top(&mut tiers.top, to_index, old_rank),
            _ => {}
        }
        let new_rank = global_rank(to_tier, to_index);
        changes.extend(cascade(&mut tiers));

        self.repo.save(&tiers)?;
        info!(
            "event=roster_move module=service status=ok from_rank={old_rank} to_rank={new_rank} relocated={}",
            changes.len()
        );
        Ok(OperationOutcome {
            summary: format!("Moved {name} from rank {old_rank} to rank {new_rank}"),
            changes,
            modified: true,
        })
    }

    /// Deletes an item and promotes at most one item per lower tier.
    pub fn delete(&self, target: &ItemRef) -> RosterResult<OperationOutcome> {
        let recorder = self.recorder();
        let mut tiers = self.load_for_update(&recorder)?;
        let (tier, index) =
            resolve(&tiers, target).ok_or_else(|| RosterError::NotFound(target.clone()))?;
        let rank = global_rank(tier, index);
        let removed = tiers.tier_mut(tier).remove(index);

        let mut changes = fill_gaps(&mut tiers, &recorder);
        changes.extend(cascade(&mut tiers));

        self.repo.save(&tiers)?;
        info!(
            "event=roster_delete module=service status=ok tier={tier} rank={rank} relocated={}",
            changes.len()
        );
        Ok(OperationOutcome {
            summary: format!("Removed {} from rank {rank}", removed.name),
            changes,
            modified: true,
        })
    }

    /// Replaces item fields in place. Never touches rank or history.
    pub fn edit(&self, target: &ItemRef, update: &ItemUpdate) -> RosterResult<OperationOutcome> {
        if update.is_empty() {
            return Err(RosterError::EmptyInput);
        }
        if matches!(&update.name, Some(name) if name.trim().is_empty()) {
            return Err(RosterError::InvalidName);
        }

        let mut tiers = self.load_for_update(&self.recorder())?;
        let (tier, index) =
            resolve(&tiers, target).ok_or_else(|| RosterError::NotFound(target.clone()))?;
        let item = &mut tiers.tier_mut(tier)[index];
        let old_name = item.name.clone();
        let changed = update.apply(item);
        let rank = global_rank(tier, index);

        if changed.is_empty() {
            return Ok(OperationOutcome {
                summary: format!("No changes to {old_name} at rank {rank}"),
                changes: Vec::new(),
                modified: false,
            });
        }

        self.repo.save(&tiers)?;
        info!(
            "event=roster_edit module=service status=ok rank={rank} fields={}",
            changed.join(",")
        );
        Ok(OperationOutcome {
            summary: format!("Edited {old_name} at rank {rank}: {}", changed.join(", ")),
            changes: Vec::new(),
            modified: true,
        })
    }

    /// Loads state for a mutation with tier capacities and history residency
    /// restored. Stored data may predate either rule.
    fn load_for_update(&self, recorder: &HistoryRecorder) -> RosterResult<TierSet> {
        let mut tiers = self.repo.load()?;
        let relocated = cascade(&mut tiers).len();
        let repaired = recorder.repair(&mut tiers);
        if relocated + repaired > 0 {
            warn!(
                "event=tier_repair module=service status=repaired relocated={relocated} history={repaired}"
            );
        }
        Ok(tiers)
    }
}
