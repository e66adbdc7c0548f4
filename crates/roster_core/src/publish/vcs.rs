//! Version-control publishing of changed artifacts.
//!
//! # Responsibility
//! - Hide the concrete version-control tool behind `VcsPublisher`.
//! - Offer a no-op simulator selected by configuration for testing.
//!
//! # Invariants
//! - Publishing never touches tier contents; failure only means a missed
//!   external backup.

use crate::config::RosterConfig;
use log::{error, info};
use std::error::Error;
use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Publish step failure.
#[derive(Debug)]
pub enum PublishError {
    /// The tool could not be started.
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// The tool ran and reported failure.
    Failed { step: &'static str, stderr: String },
    /// Relative artifact paths could not be anchored to the working directory.
    WorkingDir(std::io::Error),
}

impl Display for PublishError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { program, source } => write!(f, "failed to spawn {program}: {source}"),
            Self::Failed { step, stderr } => write!(f, "{step} failed: {stderr}"),
            Self::WorkingDir(source) => {
                write!(f, "cannot resolve artifact paths against the working directory: {source}")
            }
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Failed { .. } => None,
            Self::WorkingDir(source) => Some(source),
        }
    }
}

/// Publishes a set of changed files with a message.
pub trait VcsPublisher {
    fn publish(&self, artifacts: &[PathBuf], message: &str) -> Result<(), PublishError>;
}

impl<P: VcsPublisher + ?Sized> VcsPublisher for Box<P> {
    fn publish(&self, artifacts: &[PathBuf], message: &str) -> Result<(), PublishError> {
        (**self).publish(artifacts, message)
    }
}

/// Publisher that commits (and optionally pushes) through the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    push: bool,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>, push: bool) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            push,
        }
    }

    fn run_git(&self, step: &'static str, args: &[&OsStr]) -> Result<(), PublishError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_dir)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|source| PublishError::Spawn {
                program: "git".to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!("event=vcs_publish module=publish status=error step={step}");
            return Err(PublishError::Failed { step, stderr });
        }
        Ok(())
    }
}

impl VcsPublisher for GitPublisher {
    /// Artifact paths are taken relative to the process working directory,
    /// not to `repo_dir`.
    fn publish(&self, artifacts: &[PathBuf], message: &str) -> Result<(), PublishError> {
        let artifacts = absolute_paths(artifacts)?;
        let mut add_args = vec![OsStr::new("add"), OsStr::new("--")];
        add_args.extend(artifacts.iter().map(|path| path.as_os_str()));
        self.run_git("git add", &add_args)?;
        self.run_git(
            "git commit",
            &[OsStr::new("commit"), OsStr::new("-m"), OsStr::new(message)],
        )?;
        if self.push {
            self.run_git("git push", &[OsStr::new("push")])?;
        }
        info!(
            "event=vcs_publish module=publish status=ok artifacts={} pushed={}",
            artifacts.len(),
            self.push
        );
        Ok(())
    }
}

/// Publisher that records nothing and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedPublisher;

impl VcsPublisher for SimulatedPublisher {
    fn publish(&self, artifacts: &[PathBuf], message: &str) -> Result<(), PublishError> {
        info!(
            "event=vcs_publish module=publish status=simulated artifacts={} message_chars={}",
            artifacts.len(),
            message.chars().count()
        );
        Ok(())
    }
}

/// Picks the simulator or the git publisher according to configuration.
pub fn publisher_from_config(config: &RosterConfig) -> Box<dyn VcsPublisher> {
    if config.simulate_publish {
        Box::new(SimulatedPublisher)
    } else {
        Box::new(GitPublisher::new(&config.repo_dir, config.push))
    }
}

fn absolute_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>, PublishError> {
    if paths.iter().all(|path| path.is_absolute()) {
        return Ok(paths.to_vec());
    }
    let cwd = std::env::current_dir().map_err(PublishError::WorkingDir)?;
    Ok(paths.iter().map(|path| cwd.join(path)).collect())
}

/// Returns whether `path` sits inside a git work tree, used for diagnostics.
pub fn is_git_work_tree(path: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(path)
        .args(["rev-parse", "--is-inside-work-tree"])
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{publisher_from_config, GitPublisher, SimulatedPublisher, VcsPublisher};
    use crate::config::RosterConfig;
    use std::path::{Path, PathBuf};
    use std::process::Command;

    fn git(dir: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new("git").arg("-C").arg(dir).args(args).output().ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[test]
    fn simulated_publisher_always_succeeds() {
        let result = SimulatedPublisher.publish(&[PathBuf::from("top.json")], "msg");
        assert!(result.is_ok());
    }

    #[test]
    fn config_switch_selects_simulator() {
        let config = RosterConfig {
            simulate_publish: true,
            ..RosterConfig::default()
        };
        let publisher = publisher_from_config(&config);
        assert!(publisher.publish(&[], "noop").is_ok());
    }

    #[test]
    fn git_publisher_resolves_artifacts_against_working_directory() {
        if Command::new("git").arg("--version").output().is_err() {
            return;
        }
        // Relative to the test's working directory, like paths from a config
        // file sitting in the current directory.
        let work = tempfile::tempdir_in(".").unwrap();
        let root = work.path();
        assert!(git(root, &["init", "-q"]).is_some());
        for (key, value) in [
            ("user.name", "Roster Test"),
            ("user.email", "roster@example.invalid"),
            ("commit.gpgsign", "false"),
        ] {
            assert!(git(root, &["config", key, value]).is_some());
        }
        let data = root.join("data");
        std::fs::create_dir_all(&data).unwrap();
        std::fs::write(data.join("top.json"), "[]\n").unwrap();
        std::fs::write(root.join("CHANGELOG.md"), "# Changelog\n").unwrap();

        let publisher = GitPublisher::new(&data, false);
        publisher
            .publish(
                &[data.join("top.json"), root.join("CHANGELOG.md")],
                "Add roster files",
            )
            .unwrap();

        assert_eq!(
            git(root, &["log", "--format=%s"]).as_deref(),
            Some("Add roster files")
        );
        assert_eq!(git(root, &["status", "--porcelain"]).as_deref(), Some(""));
    }
}
