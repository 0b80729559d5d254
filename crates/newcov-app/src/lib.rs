//! Application orchestration for newcov.
//!
//! This crate provides the [`run`] function that drives the whole pipeline:
//!
//! 1. Resolve the baseline commit (explicit ref or merge-base with mainline)
//! 2. Obtain the coverage report (file on disk or the coverage command)
//! 3. Parse the diff against the baseline
//! 4. Intersect new lines with missing lines
//!
//! All process access goes through the [`Workspace`] port.
//!
//! # Example
//!
//! ```rust,ignore
//! use newcov_app::{RunOptions, run};
//!
//! let options = RunOptions {
//!     base_ref: Some("main".to_string()),
//!     ..Default::default()
//! };
//! let report = run(&options, &workspace)?;
//! println!("{} new lines not covered", report.total());
//! ```

use newcov_adapters_coverage::{ReportError, parse_report_with_extension};
use newcov_adapters_diff::{DiffError, parse_diff};
use newcov_domain::{GapReport, analyze_with_extension};
use newcov_ports::{DEFAULT_SOURCE_EXTENSION, Workspace};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Ref the baseline is computed from.
pub const HEAD: &str = "HEAD";

// ============================================================================
// Request Types
// ============================================================================

/// Options for a single run, resolved by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Baseline override; the merge-base of `HEAD` and this ref is used.
    pub base_ref: Option<String>,
    /// Pre-generated coverage report. When absent the coverage command runs.
    pub report_path: Option<PathBuf>,
    /// Mainline refs for the default baseline.
    pub mainline: Vec<String>,
    /// Source-file extension, without the dot.
    pub source_extension: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_ref: None,
            report_path: None,
            mainline: vec!["master".to_string(), "origin/master".to_string()],
            source_extension: DEFAULT_SOURCE_EXTENSION.to_string(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during a run.
#[derive(Debug, Error)]
pub enum AppError {
    /// The merge-base query failed or printed no commit.
    #[error("could not determine baseline commit: {0}")]
    BaselineNotFound(String),

    /// `diff` against the baseline failed.
    #[error("failed to diff against {commit}: {reason}")]
    DiffUnavailable { commit: String, reason: String },

    /// The coverage command could not be started.
    #[error("failed to run coverage: {0}")]
    CoverageRunFailed(String),

    /// The coverage report file could not be read.
    #[error("failed to read coverage report '{}': {source}", path.display())]
    ReportUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The diff text was malformed.
    #[error(transparent)]
    DiffParse(#[from] DiffError),

    /// The coverage report was malformed.
    #[error(transparent)]
    ReportParse(#[from] ReportError),
}

// ============================================================================
// Baseline Resolution
// ============================================================================

/// Determine the commit to diff against.
///
/// With `explicit`, this is the merge-base of `HEAD` and that ref; otherwise
/// the merge-base of `HEAD` and every `mainline` ref.
pub fn resolve_baseline<W: Workspace>(
    workspace: &W,
    explicit: Option<&str>,
    mainline: &[String],
) -> Result<String, AppError> {
    let candidates: Vec<String> = match explicit {
        Some(reference) => vec![reference.to_string()],
        None => mainline.to_vec(),
    };

    let output = workspace
        .merge_base(HEAD, &candidates)
        .map_err(AppError::BaselineNotFound)?;

    output
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::BaselineNotFound(format!(
                "no common ancestor of {} and {}",
                HEAD,
                candidates.join(", ")
            ))
        })
}

// ============================================================================
// Report Loading
// ============================================================================

/// Read the coverage report from `path`, or run the coverage command.
pub fn load_report<W: Workspace>(workspace: &W, path: Option<&Path>) -> Result<String, AppError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "reading coverage report");
            std::fs::read_to_string(path).map_err(|source| AppError::ReportUnreadable {
                path: path.to_path_buf(),
                source,
            })
        }
        None => workspace.run_coverage().map_err(AppError::CoverageRunFailed),
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the full pipeline and return the uncovered new lines.
///
/// # Errors
///
/// Any failure aborts the run; no partial report is produced.
pub fn run<W: Workspace>(options: &RunOptions, workspace: &W) -> Result<GapReport, AppError> {
    let base = resolve_baseline(workspace, options.base_ref.as_deref(), &options.mainline)?;
    info!(%base, "resolved baseline");

    let report_text = load_report(workspace, options.report_path.as_deref())?;
    let coverage = parse_report_with_extension(&report_text, &options.source_extension)?;
    debug!(files = coverage.len(), "parsed coverage report");

    let diff_text = workspace
        .diff(&base)
        .map_err(|reason| AppError::DiffUnavailable {
            commit: base.clone(),
            reason,
        })?;
    let diff = parse_diff(&diff_text)?;
    debug!(files = diff.len(), "parsed diff");

    let report = analyze_with_extension(&coverage, &diff, &options.source_extension);
    info!(
        files = report.gaps().count(),
        total = report.total(),
        "analysis complete"
    );
    Ok(report)
}
