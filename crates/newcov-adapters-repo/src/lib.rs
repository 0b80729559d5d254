//! Git and shell adapter implementing the newcov [`Workspace`] port.
//!
//! Every call is a blocking child process whose output is collected in full
//! before it is returned.

use newcov_ports::Workspace;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Workspace backed by the `git` executable and a shell coverage command.
#[derive(Debug, Clone)]
pub struct GitWorkspace {
    root: PathBuf,
    coverage_command: String,
}

impl GitWorkspace {
    /// Create a workspace rooted at `root` that runs `coverage_command` for
    /// [`Workspace::run_coverage`].
    pub fn new(root: impl Into<PathBuf>, coverage_command: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            coverage_command: coverage_command.into(),
        }
    }

    /// Directory git and the coverage command run in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> Result<String, String> {
        debug!(root = %self.root.display(), ?args, "running git");
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .output()
            .map_err(|e| format!("failed to run git {}: {}", args.join(" "), e))?;

        if !output.status.success() {
            return Err(format!(
                "git {} failed ({}): {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn shell(&self) -> Result<Output, std::io::Error> {
        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.args(["/C", &self.coverage_command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", &self.coverage_command]);
            c
        };
        command.current_dir(&self.root).output()
    }
}

impl Workspace for GitWorkspace {
    fn merge_base(&self, head: &str, candidates: &[String]) -> Result<String, String> {
        let mut args = vec!["merge-base", head];
        args.extend(candidates.iter().map(String::as_str));
        self.git(&args)
    }

    fn diff(&self, from_commit: &str) -> Result<String, String> {
        self.git(&["diff", from_commit])
    }

    fn run_coverage(&self) -> Result<String, String> {
        debug!(command = %self.coverage_command, "running coverage command");
        let output = self
            .shell()
            .map_err(|e| format!("failed to run '{}': {}", self.coverage_command, e))?;

        // Failing tests still print a report, so a non-zero exit is not fatal.
        if !output.status.success() {
            warn!(
                command = %self.coverage_command,
                status = %output.status,
                "coverage command exited unsuccessfully"
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Resolve the repository root: the explicit path, else git's top level,
/// else the current directory.
pub fn resolve_repo_root(root: Option<&Path>) -> PathBuf {
    if let Some(path) = root {
        return path.to_path_buf();
    }
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .output()
        && output.status.success()
    {
        let value = String::from_utf8_lossy(&output.stdout);
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
