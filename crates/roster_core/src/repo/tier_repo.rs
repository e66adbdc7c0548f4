//! Tier repository contract and JSON file implementation.
//!
//! # Responsibility
//! - Load and save the three ordered tier collections as one unit.
//! - Keep serialization and file layout inside the persistence boundary.
//!
//! # Invariants
//! - Write paths reject a `TierSet` that fails `TierSet::validate()`.
//! - Every file write is atomic (temp file in the same directory, fsync,
//!   rename over the target).
//! - Read paths reject malformed JSON but only warn on invariant breaches,
//!   so existing data is never rewritten behind the caller's back.

use crate::model::item::Item;
use crate::model::tier::{InvariantViolation, Tier, TierSet};
use crate::ranking::position::duplicate_names;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for tier persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    Invariant(Vec<InvariantViolation>),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error on `{}`: {source}", path.display()),
            Self::Json { path, source } => {
                write!(f, "invalid tier data in `{}`: {source}", path.display())
            }
            Self::Invariant(violations) => {
                write!(f, "refusing to save invalid tier state: ")?;
                for (index, violation) in violations.iter().enumerate() {
                    if index > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Invariant(_) => None,
        }
    }
}

/// Repository interface for whole-state tier persistence.
pub trait TierRepository {
    fn load(&self) -> RepoResult<TierSet>;
    fn save(&self, tiers: &TierSet) -> RepoResult<()>;
    /// Files written by `save`, in tier order.
    fn artifact_paths(&self) -> Vec<PathBuf>;
}

impl<R: TierRepository + ?Sized> TierRepository for &R {
    fn load(&self) -> RepoResult<TierSet> {
        (**self).load()
    }

    fn save(&self, tiers: &TierSet) -> RepoResult<()> {
        (**self).save(tiers)
    }

    fn artifact_paths(&self) -> Vec<PathBuf> {
        (**self).artifact_paths()
    }
}

/// Tier repository storing one pretty-printed JSON array per tier.
#[derive(Debug, Clone)]
pub struct JsonTierRepository {
    data_dir: PathBuf,
}

impl JsonTierRepository {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the JSON file backing `tier`.
    pub fn tier_path(&self, tier: Tier) -> PathBuf {
        self.data_dir.join(format!("{}.json", tier.file_stem()))
    }

    fn load_tier(&self, tier: Tier) -> RepoResult<Vec<Item>> {
        let path = self.tier_path(tier);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            // Why: a fresh roster has no tier files yet.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(RepoError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| RepoError::Json { path, source })
    }
}

impl TierRepository for JsonTierRepository {
    fn load(&self) -> RepoResult<TierSet> {
        let started_at = Instant::now();
        let tiers = TierSet {
            top: self.load_tier(Tier::Top)?,
            mid: self.load_tier(Tier::Mid)?,
            overflow: self.load_tier(Tier::Overflow)?,
        };

        for violation in tiers.validate() {
            warn!("event=tier_load module=repo status=invalid detail={violation}");
        }
        for name in duplicate_names(&tiers) {
            warn!("event=tier_load module=repo status=duplicate_name name={name}");
        }

        info!(
            "event=tier_load module=repo status=ok top={} mid={} overflow={} duration_ms={}",
            tiers.top.len(),
            tiers.mid.len(),
            tiers.overflow.len(),
            started_at.elapsed().as_millis()
        );
        Ok(tiers)
    }

    fn save(&self, tiers: &TierSet) -> RepoResult<()> {
        let violations = tiers.validate();
        if !violations.is_empty() {
            error!(
                "event=tier_save module=repo status=error error_code=invariant count={}",
                violations.len()
            );
            return Err(RepoError::Invariant(violations));
        }

        std::fs::create_dir_all(&self.data_dir).map_err(|source| RepoError::Io {
            path: self.data_dir.clone(),
            source,
        })?;

        for tier in Tier::ALL {
            let path = self.tier_path(tier);
            let mut json = serde_json::to_string_pretty(tiers.tier(tier)).map_err(|source| {
                RepoError::Json {
                    path: path.clone(),
                    source,
                }
            })?;
            json.push('\n');
            write_atomic(&path, json.as_bytes())
                .map_err(|source| RepoError::Io { path, source })?;
        }

        info!(
            "event=tier_save module=repo status=ok top={} mid={} overflow={}",
            tiers.top.len(),
            tiers.mid.len(),
            tiers.overflow.len()
        );
        Ok(())
    }

    fn artifact_paths(&self) -> Vec<PathBuf> {
        Tier::ALL.iter().map(|tier| self.tier_path(*tier)).collect()
    }
}

/// Replaces `path` with `contents` via temp-file-then-rename.
///
/// The temp file lives in the target directory so the rename never crosses
/// filesystems.
pub fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_atomic;

    #[test]
    fn write_atomic_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"old contents that are longer").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
