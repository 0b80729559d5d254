//! Pure domain logic for newcov.
//!
//! This crate has no side effects. It intersects the lines a diff adds with
//! the lines a coverage report lists as missing, and provides the compact
//! `"3, 7-9, 12"` notation used to print line sets.

use newcov_ports::{CoverageMap, DEFAULT_SOURCE_EXTENSION, DiffMap, LineSpan};
use thiserror::Error;

// ============================================================================
// Line Range Codec
// ============================================================================

/// Errors from [`decompact`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A specifier was not a line number.
    #[error("invalid line number '{0}'")]
    InvalidNumber(String),

    /// A `first-last` range ended before it started.
    #[error("range '{0}' ends before it starts")]
    ReversedRange(String),
}

/// Render ascending, duplicate-free line numbers as comma-separated runs.
///
/// Consecutive numbers collapse into `first-last`; isolated numbers stay bare.
///
/// # Examples
///
/// ```
/// use newcov_domain::compact;
///
/// assert_eq!(compact(&[]), "");
/// assert_eq!(compact(&[5]), "5");
/// assert_eq!(compact(&[5, 6, 7]), "5-7");
/// assert_eq!(compact(&[1, 3, 4, 5, 9]), "1, 3-5, 9");
/// ```
pub fn compact(lines: &[u32]) -> String {
    let mut runs: Vec<String> = Vec::new();
    let mut iter = lines.iter().copied().peekable();

    while let Some(first) = iter.next() {
        let mut last = first;
        while let Some(&next) = iter.peek() {
            if last.checked_add(1) != Some(next) {
                break;
            }
            last = next;
            iter.next();
        }

        if first == last {
            runs.push(first.to_string());
        } else {
            runs.push(format!("{first}-{last}"));
        }
    }

    runs.join(", ")
}

/// Parse the notation produced by [`compact`] back into line numbers.
///
/// Specifiers may be separated by commas, whitespace, or both.
///
/// # Errors
///
/// Returns [`RangeError`] for a non-numeric specifier or a reversed range.
///
/// # Examples
///
/// ```
/// use newcov_domain::decompact;
///
/// assert_eq!(decompact("1, 3-5, 9").unwrap(), vec![1, 3, 4, 5, 9]);
/// assert!(decompact("").unwrap().is_empty());
/// ```
pub fn decompact(text: &str) -> Result<Vec<u32>, RangeError> {
    let mut lines = Vec::new();

    for chunk in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if chunk.is_empty() {
            continue;
        }

        let number = |s: &str| {
            s.parse::<u32>()
                .map_err(|_| RangeError::InvalidNumber(s.to_string()))
        };

        match chunk.split_once('-') {
            Some((first, last)) => {
                let (first, last) = (number(first)?, number(last)?);
                if last < first {
                    return Err(RangeError::ReversedRange(chunk.to_string()));
                }
                lines.extend(first..=last);
            }
            None => lines.push(number(chunk)?),
        }
    }

    Ok(lines)
}

// ============================================================================
// Gap Analysis
// ============================================================================

/// Uncovered new lines of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGap {
    /// Repo-relative path.
    pub path: String,
    /// Added lines the coverage report lists as missing, ascending.
    pub lines: Vec<u32>,
}

/// Result of intersecting a diff with a coverage report.
///
/// Holds one entry per source file in the diff, in diff order, including
/// files with no uncovered lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapReport {
    files: Vec<FileGap>,
    total: usize,
}

impl GapReport {
    /// Every analyzed file, including those without gaps.
    pub fn files(&self) -> &[FileGap] {
        &self.files
    }

    /// Files with at least one uncovered new line.
    pub fn gaps(&self) -> impl Iterator<Item = &FileGap> {
        self.files.iter().filter(|gap| !gap.lines.is_empty())
    }

    /// Total number of uncovered new lines across all files.
    pub fn total(&self) -> usize {
        self.total
    }
}

impl FromIterator<FileGap> for GapReport {
    fn from_iter<I: IntoIterator<Item = FileGap>>(iter: I) -> Self {
        let files: Vec<FileGap> = iter.into_iter().collect();
        let total = files.iter().map(|gap| gap.lines.len()).sum();
        Self { files, total }
    }
}

/// Intersect new lines with missing lines for `.py` sources.
///
/// # Examples
///
/// ```
/// use newcov_domain::analyze;
/// use newcov_ports::{CoverageMap, DiffMap};
///
/// let diff: DiffMap = vec![("a.py".to_string(), vec![10, 11, 12, 20])]
///     .into_iter()
///     .collect();
/// let coverage: CoverageMap = vec![("a.py".to_string(), vec![11, 20, 30])]
///     .into_iter()
///     .collect();
///
/// let report = analyze(&coverage, &diff);
/// assert_eq!(report.files()[0].lines, vec![11, 20]);
/// assert_eq!(report.total(), 2);
/// ```
pub fn analyze(coverage: &CoverageMap, diff: &DiffMap) -> GapReport {
    analyze_with_extension(coverage, diff, DEFAULT_SOURCE_EXTENSION)
}

/// Intersect new lines with missing lines for files ending in `.<extension>`.
///
/// A source file the coverage report does not list gets an empty gap: the
/// report had no data for it, so nothing is claimed about its lines.
pub fn analyze_with_extension(
    coverage: &CoverageMap,
    diff: &DiffMap,
    extension: &str,
) -> GapReport {
    let suffix = format!(".{extension}");

    diff.iter()
        .filter(|(path, _)| path.ends_with(&suffix))
        .map(|(path, added)| {
            let lines = match coverage.missing(path) {
                Some(spans) => {
                    let runs = disjoint_runs(spans);
                    added
                        .iter()
                        .copied()
                        .filter(|&line| runs_contain(&runs, line))
                        .collect()
                }
                None => Vec::new(),
            };
            FileGap {
                path: path.to_string(),
                lines,
            }
        })
        .collect()
}

/// Sort spans and merge overlapping ones into ascending, disjoint runs.
fn disjoint_runs(spans: &[LineSpan]) -> Vec<(u32, u32)> {
    let mut sorted: Vec<(u32, u32)> = spans.iter().map(|s| (s.first(), s.last())).collect();
    sorted.sort_unstable();

    let mut runs: Vec<(u32, u32)> = Vec::with_capacity(sorted.len());
    for (first, last) in sorted {
        match runs.last_mut() {
            Some((_, end)) if first <= *end => *end = (*end).max(last),
            _ => runs.push((first, last)),
        }
    }
    runs
}

fn runs_contain(runs: &[(u32, u32)], line: u32) -> bool {
    let idx = runs.partition_point(|&(_, last)| last < line);
    runs.get(idx).is_some_and(|&(first, _)| first <= line)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(entries: &[(&str, &[u32])]) -> DiffMap {
        entries
            .iter()
            .map(|(path, lines)| (path.to_string(), lines.to_vec()))
            .collect()
    }

    fn coverage(entries: &[(&str, &[u32])]) -> CoverageMap {
        entries
            .iter()
            .map(|(path, lines)| (path.to_string(), lines.to_vec()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Codec Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_compact_examples() {
        assert_eq!(compact(&[]), "");
        assert_eq!(compact(&[5]), "5");
        assert_eq!(compact(&[5, 6, 7]), "5-7");
        assert_eq!(compact(&[1, 3, 4, 5, 9]), "1, 3-5, 9");
    }

    #[test]
    fn test_compact_adjacent_pairs() {
        assert_eq!(compact(&[1, 2, 4, 5]), "1-2, 4-5");
    }

    #[test]
    fn test_compact_at_u32_max() {
        assert_eq!(
            compact(&[u32::MAX - 1, u32::MAX]),
            format!("{}-{}", u32::MAX - 1, u32::MAX)
        );
    }

    #[test]
    fn test_decompact_accepts_report_style_separators() {
        assert_eq!(decompact("5,8  10-11").unwrap(), vec![5, 8, 10, 11]);
    }

    #[test]
    fn test_decompact_errors() {
        assert_eq!(
            decompact("3, x").unwrap_err(),
            RangeError::InvalidNumber("x".to_string())
        );
        assert_eq!(
            decompact("9-4").unwrap_err(),
            RangeError::ReversedRange("9-4".to_string())
        );
    }

    // ------------------------------------------------------------------------
    // Analysis Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_analyze_intersects_new_and_missing_lines() {
        let report = analyze(
            &coverage(&[("a.py", &[11, 20, 30])]),
            &diff(&[("a.py", &[10, 11, 12, 20])]),
        );

        assert_eq!(
            report.files(),
            &[FileGap {
                path: "a.py".to_string(),
                lines: vec![11, 20],
            }]
        );
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn test_analyze_file_missing_from_coverage_has_no_gap() {
        let report = analyze(&coverage(&[]), &diff(&[("new.py", &[1, 2, 3])]));

        assert_eq!(report.files().len(), 1);
        assert!(report.files()[0].lines.is_empty());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_analyze_skips_non_source_files() {
        let report = analyze(
            &coverage(&[("README.md", &[1])]),
            &diff(&[("README.md", &[1]), ("setup.cfg", &[2])]),
        );

        assert!(report.files().is_empty());
    }

    #[test]
    fn test_analyze_keeps_diff_order_and_empty_entries() {
        let report = analyze(
            &coverage(&[("b.py", &[3]), ("a.py", &[])]),
            &diff(&[("b.py", &[3, 4]), ("a.py", &[1])]),
        );

        let paths: Vec<&str> = report.files().iter().map(|g| g.path.as_str()).collect();
        assert_eq!(paths, vec!["b.py", "a.py"]);
        let gaps: Vec<&str> = report.gaps().map(|g| g.path.as_str()).collect();
        assert_eq!(gaps, vec!["b.py"]);
        assert_eq!(report.total(), 1);
    }

    #[test]
    fn test_analyze_duplicate_missing_lines_match_once() {
        let report = analyze(
            &coverage(&[("a.py", &[4, 4, 4])]),
            &diff(&[("a.py", &[4, 5])]),
        );

        assert_eq!(report.files()[0].lines, vec![4]);
    }

    #[test]
    fn test_analyze_matches_inside_unexpanded_spans() {
        let spans = vec![
            LineSpan::new(40, 60).unwrap(),
            LineSpan::new(1, 3).unwrap(),
            LineSpan::new(50, 4_000_000_000).unwrap(),
        ];
        let coverage = CoverageMap::from(std::collections::BTreeMap::from([(
            "a.py".to_string(),
            spans,
        )]));

        let report = analyze(
            &coverage,
            &diff(&[("a.py", &[1, 4, 39, 40, 61, 3_999_999_999, 4_000_000_001])]),
        );
        assert_eq!(report.files()[0].lines, vec![1, 40, 61, 3_999_999_999]);
    }

    #[test]
    fn test_analyze_large_missing_list() {
        let missing: Vec<u32> = (1..=400_000).map(|n| n * 2).collect();
        let added: Vec<u32> = (1..=20_000).collect();
        let coverage: CoverageMap = vec![("big.py".to_string(), missing)].into_iter().collect();
        let diff: DiffMap = vec![("big.py".to_string(), added)].into_iter().collect();

        let report = analyze(&coverage, &diff);
        assert_eq!(report.total(), 10_000);
        assert_eq!(report.files()[0].lines[..3], [2, 4, 6]);
    }

    #[test]
    fn test_analyze_with_extension() {
        let report = analyze_with_extension(
            &coverage(&[("fast.pyx", &[2])]),
            &diff(&[("fast.pyx", &[2]), ("slow.py", &[1])]),
            "pyx",
        );

        assert_eq!(report.files().len(), 1);
        assert_eq!(report.total(), 1);
    }
}

// ============================================================================
// Property Tests
// ============================================================================
