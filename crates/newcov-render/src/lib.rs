//! Rendering utilities for newcov gap reports.
//!
//! This crate turns a [`GapReport`] into one of the output formats:
//! - aligned plain text for terminals
//! - JSON for scripts and CI tooling
//!
//! # Example
//!
//! ```rust
//! use newcov_domain::GapReport;
//! use newcov_render::{render_json, render_text};
//!
//! let report = GapReport::default();
//! assert_eq!(render_text(&report), "0 new lines not covered\n");
//! assert!(render_json(&report).contains("\"total\": 0"));
//! ```

use newcov_domain::{FileGap, GapReport, compact};
use serde::Serialize;
use thiserror::Error;

/// Spaces between the path column and the line ranges.
pub const GUTTER: usize = 2;

/// Errors raised while laying out a report.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RenderError {
    /// No file has uncovered lines, so there is no column to align.
    #[error("no files with uncovered lines")]
    EmptyReportSet,
}

/// Width of the path column: the longest path plus [`GUTTER`].
pub fn column_width<'a, I>(gaps: I) -> Result<usize, RenderError>
where
    I: IntoIterator<Item = &'a FileGap>,
{
    gaps.into_iter()
        .map(|gap| gap.path.chars().count())
        .max()
        .map(|longest| longest + GUTTER)
        .ok_or(RenderError::EmptyReportSet)
}

/// Renders the report as aligned text lines followed by the total.
///
/// Files without uncovered lines are left out.
///
/// ```text
/// pkg/mod.py    5, 8
/// a.py          11, 20
/// 4 new lines not covered
/// ```
pub fn render_text(report: &GapReport) -> String {
    let mut out = String::new();

    // An empty set has nothing to align; only the total is printed.
    if let Ok(width) = column_width(report.gaps()) {
        for gap in report.gaps() {
            out.push_str(&format!(
                "{:<width$}{}\n",
                gap.path,
                compact(&gap.lines),
                width = width
            ));
        }
    }

    out.push_str(&format!("{} new lines not covered\n", report.total()));
    out
}

#[derive(Serialize)]
struct JsonReport<'a> {
    files: Vec<JsonFile<'a>>,
    total: usize,
}

#[derive(Serialize)]
struct JsonFile<'a> {
    path: &'a str,
    lines: &'a [u32],
    ranges: String,
}

/// Renders the report as pretty-printed JSON.
///
/// Only files with uncovered lines are listed; `ranges` holds the same compact
/// notation as the text output.
pub fn render_json(report: &GapReport) -> String {
    let json = JsonReport {
        files: report
            .gaps()
            .map(|gap| JsonFile {
                path: &gap.path,
                lines: &gap.lines,
                ranges: compact(&gap.lines),
            })
            .collect(),
        total: report.total(),
    };

    // Serializing plain strings and integers cannot fail.
    serde_json::to_string_pretty(&json).unwrap_or_default()
}
