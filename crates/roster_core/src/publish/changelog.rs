//! Human-readable changelog of committed operations.
//!
//! # Invariants
//! - Appends never rewrite earlier lines.
//! - The file starts with a `# Changelog` heading.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::{Path, PathBuf};

const CHANGELOG_HEADING: &str = "# Changelog\n\n";

/// Changelog write failure.
#[derive(Debug)]
pub struct ChangeLogError {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl Display for ChangeLogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to append changelog `{}`: {}",
            self.path.display(),
            self.source
        )
    }
}

impl Error for ChangeLogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Receives one description per committed operation.
pub trait ChangeLog {
    fn append(&self, description: &str, date: &str) -> Result<(), ChangeLogError>;
    /// File touched by `append`, if any; tracked by batch snapshots.
    fn artifact_path(&self) -> Option<PathBuf>;
}

/// Markdown changelog with one bullet per operation.
#[derive(Debug, Clone)]
pub struct MarkdownChangeLog {
    path: PathBuf,
}

impl MarkdownChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChangeLog for MarkdownChangeLog {
    fn append(&self, description: &str, date: &str) -> Result<(), ChangeLogError> {
        let wrap = |source| ChangeLogError {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(wrap)?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(wrap)?;
        let is_new = file.metadata().map_err(wrap)?.len() == 0;
        let line = format!("- {date}: {}\n", description.replace(['\n', '\r'], " "));
        if is_new {
            file.write_all(CHANGELOG_HEADING.as_bytes()).map_err(wrap)?;
        }
        file.write_all(line.as_bytes()).map_err(wrap)?;
        Ok(())
    }

    fn artifact_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }
}
