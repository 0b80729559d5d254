//! Coverage report parser for newcov.
//!
//! This crate reads the tabular text report printed by coverage tools such as
//! `coverage report -m`:
//!
//! ```text
//! Name                 Stmts   Miss  Cover   Missing
//! --------------------------------------------------
//! pkg.mod                 10      2    80%   5, 8
//! --------------------------------------------------
//! TOTAL                   10      2    80%
//! ```
//!
//! and produces the missing lines of every listed file.

use std::collections::BTreeMap;

use newcov_ports::{CoverageMap, DEFAULT_SOURCE_EXTENSION, LineSpan};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur while parsing a coverage report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Invalid content in the data section.
    #[error("invalid coverage report: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Path Mapping
// ============================================================================

/// Map a report's `Name` column to the repo-relative path used by diffs.
///
/// Dotted module names become slash-separated paths with the source extension
/// appended. A name holding a path separator and ending in the extension is
/// already a file path and is only normalized.
///
/// # Examples
///
/// ```
/// use newcov_adapters_coverage::module_to_path;
///
/// assert_eq!(module_to_path("pkg.sub.mod", "py"), "pkg/sub/mod.py");
/// assert_eq!(module_to_path("setup", "py"), "setup.py");
/// assert_eq!(module_to_path("pkg.py", "py"), "pkg/py.py");
/// assert_eq!(module_to_path("pkg/sub/mod.py", "py"), "pkg/sub/mod.py");
/// assert_eq!(module_to_path(".\\pkg\\mod.py", "py"), "pkg/mod.py");
/// ```
pub fn module_to_path(name: &str, extension: &str) -> String {
    let suffix = format!(".{extension}");
    if name.contains(['/', '\\']) && name.ends_with(&suffix) {
        let name = name.replace('\\', "/");
        return name.strip_prefix("./").unwrap_or(&name).to_string();
    }

    format!("{}{}", name.replace('.', "/"), suffix)
}

// ============================================================================
// Report Parsing
// ============================================================================

/// Parse a coverage report, mapping module names to `.py` paths.
///
/// # Examples
///
/// ```
/// use newcov_adapters_coverage::parse_report;
/// use newcov_ports::LineSpan;
///
/// let report = "\
/// Name      Stmts   Miss  Cover   Missing
/// ---------------------------------------
/// pkg.mod      10      2    80%   5, 8
/// ---------------------------------------
/// TOTAL        10      2    80%
/// ";
///
/// let coverage = parse_report(report).unwrap();
/// assert_eq!(
///     coverage.missing("pkg/mod.py"),
///     Some(&[LineSpan::line(5), LineSpan::line(8)][..])
/// );
/// ```
pub fn parse_report(text: &str) -> Result<CoverageMap, ReportError> {
    parse_report_with_extension(text, DEFAULT_SOURCE_EXTENSION)
}

/// Parse a coverage report with a custom source-file extension.
///
/// The header row (`Name ... Missing`) fixes the delimiter: a run of `-` as
/// long as the trimmed header. Rows between the first and second delimiter
/// are data; anything after the second (the `TOTAL` row) is ignored. Text
/// with no recognizable header yields an empty map.
///
/// # Errors
///
/// Returns [`ReportError::InvalidFormat`] when a missing-line specifier is
/// not a number or a `first-last` range.
pub fn parse_report_with_extension(
    text: &str,
    extension: &str,
) -> Result<CoverageMap, ReportError> {
    let mut delimiter: Option<String> = None;
    let mut columns = 0usize;
    let mut started = false;
    let mut files: BTreeMap<String, Vec<LineSpan>> = BTreeMap::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();

        if delimiter.as_deref() == Some(line) {
            if started {
                break;
            }
            started = true;
            continue;
        }

        if !started {
            if line.starts_with("Name ") && line.ends_with(" Missing") {
                delimiter = Some("-".repeat(line.chars().count()));
                columns = line.split_whitespace().count();
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        let fields = split_fields(line, columns);
        let path = module_to_path(fields[0], extension);
        let missing = match fields.get(columns - 1) {
            Some(field) if fields.len() == columns => parse_missing(field, idx + 1)?,
            _ => Vec::new(),
        };
        files.entry(path).or_default().extend(missing);
    }

    Ok(CoverageMap::from(files))
}

/// Split on whitespace into at most `max` fields; the last field keeps the
/// remainder of the line, inner whitespace included.
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest.trim_end());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

/// Read a `Missing` column such as `"5, 8, 12-14"` into spans.
///
/// Branch arcs (`12->15`, `20->exit`) describe partial branches, not missing
/// lines, and are skipped.
fn parse_missing(field: &str, line_no: usize) -> Result<Vec<LineSpan>, ReportError> {
    let mut spans = Vec::new();

    for chunk in field.split(|c: char| c == ',' || c.is_whitespace()) {
        if chunk.is_empty() || chunk.contains("->") {
            continue;
        }

        let invalid = || {
            ReportError::InvalidFormat(format!(
                "invalid missing-line specifier '{}' at line {}",
                chunk, line_no
            ))
        };

        let span = match chunk.split_once('-') {
            Some((first, last)) => {
                let first: u32 = first.parse().map_err(|_| invalid())?;
                let last: u32 = last.parse().map_err(|_| invalid())?;
                LineSpan::new(first, last).ok_or_else(|| {
                    ReportError::InvalidFormat(format!(
                        "reversed range '{}' at line {}",
                        chunk, line_no
                    ))
                })?
            }
            None => LineSpan::line(chunk.parse().map_err(|_| invalid())?),
        };
        spans.push(span);
    }

    Ok(spans)
}

// ============================================================================
// Tests
// ============================================================================


// ============================================================================
// Property Tests
// ============================================================================
