//! Shared port traits and boundary types for newcov.
//!
//! The pipeline never spawns processes itself. Version-control queries and
//! the coverage run go through [`Workspace`], so tests can substitute a fake.
//! The parsed inputs cross crate boundaries as [`CoverageMap`] and [`DiffMap`].

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::RangeInclusive;

/// Extension of the source files a coverage report describes, without the dot.
pub const DEFAULT_SOURCE_EXTENSION: &str = "py";

// ============================================================================
// Boundary Types
// ============================================================================

/// Inclusive run of line numbers, as written `10-13` in a coverage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineSpan {
    first: u32,
    last: u32,
}

impl LineSpan {
    /// Span from `first` to `last`, or `None` when `last < first`.
    pub fn new(first: u32, last: u32) -> Option<Self> {
        (first <= last).then_some(Self { first, last })
    }

    /// Span holding a single line.
    pub fn line(line: u32) -> Self {
        Self {
            first: line,
            last: line,
        }
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn last(&self) -> u32 {
        self.last
    }

    pub fn contains(&self, line: u32) -> bool {
        self.first <= line && line <= self.last
    }

    /// The individual line numbers.
    pub fn lines(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }
}

/// Missing (uncovered) lines per file, as read from a coverage report.
///
/// Keys are repo-relative paths with forward slashes. Ranges stay unexpanded
/// and in the order the report listed them, so the map is never larger than
/// the report text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageMap {
    files: BTreeMap<String, Vec<LineSpan>>,
}

impl CoverageMap {
    /// Missing spans recorded for `path`, or `None` when the report has no
    /// row for that file.
    pub fn missing(&self, path: &str) -> Option<&[LineSpan]> {
        self.files.get(path).map(Vec::as_slice)
    }

    /// Number of files in the report.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` when the report contributed no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate files in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<LineSpan>> {
        self.files.iter()
    }
}

impl From<BTreeMap<String, Vec<LineSpan>>> for CoverageMap {
    fn from(files: BTreeMap<String, Vec<LineSpan>>) -> Self {
        Self { files }
    }
}

/// Each line becomes a single-line span; rows for the same path are
/// concatenated in iteration order.
impl FromIterator<(String, Vec<u32>)> for CoverageMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u32>)>>(iter: I) -> Self {
        let mut files: BTreeMap<String, Vec<LineSpan>> = BTreeMap::new();
        for (path, lines) in iter {
            files
                .entry(path)
                .or_default()
                .extend(lines.into_iter().map(LineSpan::line));
        }
        Self { files }
    }
}

/// Newly added line numbers per file, in the order files appear in the diff.
///
/// Each line list is ascending with no duplicates. Files that appear in the
/// diff without any added line are kept with an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffMap {
    entries: Vec<(String, Vec<u32>)>,
}

impl DiffMap {
    /// Added lines for `path`, or `None` when the diff does not touch it.
    pub fn get(&self, path: &str) -> Option<&[u32]> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, lines)| lines.as_slice())
    }

    /// Iterate `(path, added_lines)` in diff order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.entries
            .iter()
            .map(|(path, lines)| (path.as_str(), lines.as_slice()))
    }

    /// Number of files in the diff.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the diff named no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A path seen twice is merged into its first position; the merged list is
/// re-sorted and deduplicated.
impl FromIterator<(String, Vec<u32>)> for DiffMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u32>)>>(iter: I) -> Self {
        let mut entries: Vec<(String, Vec<u32>)> = Vec::new();
        for (path, lines) in iter {
            if let Some((_, existing)) = entries.iter_mut().find(|(p, _)| *p == path) {
                existing.extend(lines);
                existing.sort_unstable();
                existing.dedup();
            } else {
                entries.push((path, lines));
            }
        }
        Self { entries }
    }
}

// ============================================================================
// Ports
// ============================================================================

/// Port for the version-control and test-runner processes used by a run.
pub trait Workspace {
    /// Returns the best common ancestor of `head` and all of `candidates`.
    ///
    /// The commit id is returned as printed by the tool; surrounding
    /// whitespace is allowed.
    fn merge_base(&self, head: &str, candidates: &[String]) -> Result<String, String>;

    /// Returns the unified diff of the working tree against `from_commit`.
    fn diff(&self, from_commit: &str) -> Result<String, String>;

    /// Runs the test suite under coverage and returns the report text.
    fn run_coverage(&self) -> Result<String, String>;
}

impl<W: Workspace + ?Sized> Workspace for &W {
    fn merge_base(&self, head: &str, candidates: &[String]) -> Result<String, String> {
        (**self).merge_base(head, candidates)
    }

    fn diff(&self, from_commit: &str) -> Result<String, String> {
        (**self).diff(from_commit)
    }

    fn run_coverage(&self) -> Result<String, String> {
        (**self).run_coverage()
    }
}
