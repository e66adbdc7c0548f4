//! Roster subcommands shared by one-shot invocations and the batch prompt.

use clap::{Args, Subcommand};
use roster_core::{
    parse_item_ref, ApplyReport, InsertRequest, Item, ItemUpdate, JsonTierRepository,
    MarkdownChangeLog, Operation, PublishStatus, RankLabel, RankedItem, RosterError, Session,
    SessionError, Tier, VcsPublisher,
};

pub type CliSession = Session<JsonTierRepository, MarkdownChangeLog, Box<dyn VcsPublisher>>;

#[derive(Debug, Subcommand)]
pub enum RosterCommand {
    /// List every item in rank order
    List,
    /// Find one item by exact name (case-insensitive) or global position
    Search { query: String },
    /// Add an item to a tier
    Insert(InsertArgs),
    /// Move an item to a new global position
    Move {
        /// Item name or current global position
        item: String,
        /// Target global position (1-based)
        position: usize,
    },
    /// Delete an item
    Delete {
        /// Item name or global position
        item: String,
    },
    /// Change item fields without affecting rank
    Edit(EditArgs),
}

#[derive(Debug, Args)]
pub struct InsertArgs {
    /// Target tier: top|mid|overflow
    #[arg(value_parser = parse_tier)]
    pub tier: Tier,
    pub name: String,
    #[arg(long, default_value = "")]
    pub creator: String,
    #[arg(long)]
    pub media: Option<String>,
    #[arg(long)]
    pub rank_label: Option<String>,
    #[arg(long, default_value = "")]
    pub scale: String,
    #[arg(long)]
    pub external_position: Option<u32>,
    /// 1-based position inside the tier (default: tier end, clamped)
    #[arg(long)]
    pub position: Option<usize>,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Item name or global position
    pub item: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub creator: Option<String>,
    #[arg(long, conflicts_with = "clear_media")]
    pub media: Option<String>,
    #[arg(long)]
    pub clear_media: bool,
    #[arg(long)]
    pub rank_label: Option<String>,
    #[arg(long)]
    pub scale: Option<String>,
    #[arg(long, conflicts_with = "clear_external_position")]
    pub external_position: Option<u32>,
    #[arg(long)]
    pub clear_external_position: bool,
}

fn parse_tier(value: &str) -> Result<Tier, String> {
    Tier::parse(value).ok_or_else(|| format!("unknown tier `{value}`; expected top|mid|overflow"))
}

impl InsertArgs {
    fn into_request(self) -> InsertRequest {
        let mut item = Item::new(self.name, self.creator);
        item.media = self.media;
        if let Some(label) = self.rank_label {
            item.rank_label = RankLabel::from(label);
        }
        item.scale = self.scale;
        item.external_position = self.external_position;
        InsertRequest {
            tier: self.tier,
            item,
            index: self.position.map(|position| position.saturating_sub(1)),
        }
    }
}

impl EditArgs {
    fn update(&self) -> ItemUpdate {
        ItemUpdate {
            name: self.name.clone(),
            creator: self.creator.clone(),
            media: if self.clear_media {
                Some(None)
            } else {
                self.media.clone().map(Some)
            },
            rank_label: self.rank_label.clone().map(RankLabel::from),
            scale: self.scale.clone(),
            external_position: if self.clear_external_position {
                Some(None)
            } else {
                self.external_position.map(Some)
            },
        }
    }
}

impl RosterCommand {
    fn into_operation(self) -> Result<Option<Operation>, RosterError> {
        let operation = match self {
            Self::List | Self::Search { .. } => return Ok(None),
            Self::Insert(args) => Operation::Insert(args.into_request()),
            Self::Move { item, position } => Operation::Move {
                target: parse_item_ref(&item)?,
                position,
            },
            Self::Delete { item } => Operation::Delete(parse_item_ref(&item)?),
            Self::Edit(args) => Operation::Edit {
                target: parse_item_ref(&args.item)?,
                update: args.update(),
            },
        };
        Ok(Some(operation))
    }
}

/// Runs one command against the session and prints its result.
///
/// Blank references cancel the command instead of failing it.
pub fn run_command(session: &mut CliSession, command: RosterCommand) -> Result<(), SessionError> {
    match command {
        RosterCommand::List => print_listing(&session.list_all()?),
        RosterCommand::Search { query } => match session.search(&query) {
            Ok(found) => print_item(&found),
            Err(RosterError::EmptyInput) => println!("Cancelled."),
            Err(err) => return Err(err.into()),
        },
        mutation => apply_mutation(session, mutation)?,
    }
    Ok(())
}

fn apply_mutation(session: &mut CliSession, command: RosterCommand) -> Result<(), SessionError> {
    let operation = match command.into_operation() {
        Ok(Some(operation)) => operation,
        Ok(None) => return Ok(()),
        Err(RosterError::EmptyInput) => {
            println!("Cancelled.");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    match session.apply(operation) {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(SessionError::Roster(RosterError::EmptyInput)) => {
            println!("Cancelled.");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn print_report(report: &ApplyReport) {
    println!("{}", report.outcome.summary);
    for change in &report.outcome.changes {
        println!("  - {change}");
    }
    match &report.publish {
        PublishStatus::Published => println!("Published."),
        PublishStatus::Deferred => println!("Pending until batch commit."),
        PublishStatus::Skipped => {}
        PublishStatus::Failed(reason) => {
            println!("Saved, but publishing failed: {reason}. Run `roster publish` to retry.")
        }
    }
}

fn print_listing(items: &[RankedItem]) {
    let mut current_tier = None;
    for ranked in items {
        if current_tier != Some(ranked.tier) {
            current_tier = Some(ranked.tier);
            println!("== {} ==", ranked.tier);
        }
        print_item(ranked);
    }
    if items.is_empty() {
        println!("The roster is empty.");
    }
}

fn print_item(ranked: &RankedItem) {
    let item = &ranked.item;
    let mut line = format!("{:>4}. {} by {}", ranked.rank, item.name, item.creator);
    if !item.rank_label.as_str().is_empty() {
        line.push_str(&format!(" [{}]", item.rank_label));
    }
    if !item.scale.is_empty() {
        line.push_str(&format!(" scale {}", item.scale));
    }
    if let Some(position) = item.external_position.filter(|_| item.is_externally_ranked()) {
        line.push_str(&format!(" ext #{position}"));
    }
    println!("{line}");
}

#[cfg(test)]
mod tests {
    use super::{EditArgs, RosterCommand};
    use roster_core::{ItemRef, Operation, RosterError};

    fn edit_args(item: &str) -> EditArgs {
        EditArgs {
            item: item.to_string(),
            name: None,
            creator: None,
            media: None,
            clear_media: true,
            rank_label: Some("Insane".to_string()),
            scale: None,
            external_position: Some(7),
            clear_external_position: false,
        }
    }

    #[test]
    fn edit_args_map_clear_flags() {
        let update = edit_args("Alpha").update();
        assert_eq!(update.media, Some(None));
        assert_eq!(update.external_position, Some(Some(7)));
        assert_eq!(update.rank_label, Some(roster_core::RankLabel::Insane));
    }

    #[test]
    fn blank_reference_is_empty_input() {
        let err = RosterCommand::Delete {
            item: "  ".to_string(),
        }
        .into_operation()
        .unwrap_err();
        assert!(matches!(err, RosterError::EmptyInput));
    }

    #[test]
    fn numeric_reference_becomes_position() {
        let operation = RosterCommand::Move {
            item: "12".to_string(),
            position: 3,
        }
        .into_operation()
        .unwrap();
        assert_eq!(
            operation,
            Some(Operation::Move {
                target: ItemRef::Position(12),
                position: 3
            })
        );
    }
}
