//! Diff parsing adapter for newcov.
//!
//! This crate parses unified diff text (as printed by `git diff`) and records,
//! per file, the line numbers that were added on the new side.

use newcov_ports::DiffMap;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during diff parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// A `@@` line did not follow the unified-diff hunk header grammar.
    #[error("malformed hunk header at line {line_no}: '{line}'")]
    MalformedHunkHeader {
        /// 1-based line number within the diff text.
        line_no: usize,
        /// The offending line.
        line: String,
    },
}

// ============================================================================
// Path Normalization
// ============================================================================

/// Normalize a path from a `+++ ` header to repo-relative format.
///
/// - Drops a trailing tab-separated timestamp
/// - Converts backslashes to forward slashes
/// - Strips the `b/` (or `a/`) prefix git puts on diff paths
/// - Removes leading `./`
///
/// # Examples
///
/// ```
/// use newcov_adapters_diff::normalize_path;
///
/// assert_eq!(normalize_path("b/pkg/mod.py"), "pkg/mod.py");
/// assert_eq!(normalize_path("a/pkg/mod.py"), "pkg/mod.py");
/// assert_eq!(normalize_path("./pkg/mod.py"), "pkg/mod.py");
/// assert_eq!(normalize_path("pkg\\mod.py"), "pkg/mod.py");
/// ```
pub fn normalize_path(path: &str) -> String {
    let path = path.split('\t').next().unwrap_or(path).trim();
    let path = path.replace('\\', "/");

    let path = path
        .strip_prefix("b/")
        .or_else(|| path.strip_prefix("a/"))
        .unwrap_or(&path);

    let path = path.strip_prefix("./").unwrap_or(path);

    path.to_string()
}

// ============================================================================
// Diff Parsing
// ============================================================================

/// Parse a unified diff and collect the added line numbers of every file.
///
/// Every `+++ ` header opens a file section, and the file is reported even if
/// the section adds nothing. Within a hunk, `+` lines are recorded at the
/// current new-side line number, context lines advance the counter, and
/// removals leave it alone.
///
/// # Errors
///
/// Returns [`DiffError::MalformedHunkHeader`] for a `@@ ` line that does not
/// match `@@ -<start>[,<count>] +<start>[,<count>] @@`.
///
/// # Examples
///
/// ```
/// use newcov_adapters_diff::parse_diff;
///
/// let diff = "\
/// diff --git a/foo.py b/foo.py
/// --- a/foo.py
/// +++ b/foo.py
/// @@ -1,3 +1,4 @@
///  import os
/// +import sys
///
/// ";
///
/// let map = parse_diff(diff).unwrap();
/// assert_eq!(map.get("foo.py"), Some(&[2][..]));
/// ```
pub fn parse_diff(text: &str) -> Result<DiffMap, DiffError> {
    let text = text.replace("\r\n", "\n");

    let mut files: Vec<(String, Vec<u32>)> = Vec::new();
    let mut current_file: Option<String> = None;
    let mut current_lines: Vec<u32> = Vec::new();
    let mut current_new_line: u32 = 0;
    let mut in_hunk = false;

    for (idx, line) in text.lines().enumerate() {
        if let Some(path) = line.strip_prefix("+++ ") {
            if let Some(file) = current_file.take() {
                files.push((file, std::mem::take(&mut current_lines)));
            }

            let path = path.trim();
            // Deleted files have no new side.
            if path != "/dev/null" {
                current_file = Some(normalize_path(path));
            }
            current_new_line = 0;
            in_hunk = false;
            continue;
        }

        if line.starts_with("@@ ") {
            let new_start =
                parse_hunk_header(line).ok_or_else(|| DiffError::MalformedHunkHeader {
                    line_no: idx + 1,
                    line: line.to_string(),
                })?;
            current_new_line = new_start;
            in_hunk = current_file.is_some();
            continue;
        }

        if !in_hunk {
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => {
                current_lines.push(current_new_line);
                current_new_line = current_new_line.saturating_add(1);
            }
            Some(b' ') => {
                current_new_line = current_new_line.saturating_add(1);
            }
            // Removals, "\ No newline at end of file" and anything else
            // leave the new-side counter alone.
            _ => {}
        }
    }

    if let Some(file) = current_file {
        files.push((file, current_lines));
    }

    Ok(files.into_iter().collect())
}

/// Parse a hunk header and return the new-side starting line number.
///
/// Accepts `@@ -old_start[,old_count] +new_start[,new_count] @@` with optional
/// trailing section context. The old-side fields are checked for shape only.
fn parse_hunk_header(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("@@ -")?;
    let (old, rest) = rest.split_once(' ')?;
    if !is_range_field(old) {
        return None;
    }

    let rest = rest.strip_prefix('+')?;
    let (new, rest) = rest.split_once(' ')?;
    if !is_range_field(new) || !rest.starts_with("@@") {
        return None;
    }

    new.split(',').next()?.parse().ok()
}

/// `<digits>` or `<digits>,<digits>`.
fn is_range_field(field: &str) -> bool {
    let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match field.split_once(',') {
        Some((start, count)) => is_number(start) && is_number(count),
        None => is_number(field),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_b_prefix() {
        assert_eq!(normalize_path("b/pkg/mod.py"), "pkg/mod.py");
    }

    #[test]
    fn test_normalize_path_timestamp_suffix() {
        assert_eq!(
            normalize_path("b/pkg/mod.py\t2024-01-01 10:00:00.000000000 +0000"),
            "pkg/mod.py"
        );
    }

    #[test]
    fn test_normalize_path_backslash() {
        assert_eq!(normalize_path("b\\pkg\\mod.py"), "pkg/mod.py");
    }

    #[test]
    fn test_normalize_path_no_change() {
        assert_eq!(normalize_path("pkg/mod.py"), "pkg/mod.py");
    }

    #[test]
    fn test_parse_diff_single_added_line_between_context() {
        let diff = "+++ b/foo.py\n@@ -1,3 +1,4 @@\n one\n+two\n three\n";

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("foo.py"), Some(&[2][..]));
    }

    #[test]
    fn test_parse_diff_new_file() {
        let diff = r#"diff --git a/pkg/util.py b/pkg/util.py
new file mode 100644
index 0000000..1111111
--- /dev/null
+++ b/pkg/util.py
@@ -0,0 +1,3 @@
+def add(a, b):
+    return a + b
+
"#;

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.get("pkg/util.py"), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_parse_diff_multiple_hunks() {
        let diff = r#"diff --git a/app.py b/app.py
index 1111111..2222222 100644
--- a/app.py
+++ b/app.py
@@ -1,3 +1,5 @@
 def main():
+    # setup
     run()
+
@@ -10,2 +12,4 @@ def other():
 def other():
+    log("a")
+    log("b")
"#;

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.get("app.py"), Some(&[2, 4, 13, 14][..]));
    }

    #[test]
    fn test_parse_diff_removals_do_not_advance_counter() {
        let diff = r#"--- a/app.py
+++ b/app.py
@@ -1,5 +1,5 @@
 def main():
-    old()
-    older()
+    new()
+    newer()
     common()
"#;

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.get("app.py"), Some(&[2, 3][..]));
    }

    #[test]
    fn test_parse_diff_file_without_additions_is_kept() {
        let diff = r#"--- a/app.py
+++ b/app.py
@@ -1,3 +1,2 @@
 def main():
-    old()
     common()
"#;

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("app.py"), Some(&[][..]));
    }

    #[test]
    fn test_parse_diff_deleted_file_is_skipped() {
        let diff = r#"diff --git a/gone.py b/gone.py
deleted file mode 100644
index 1111111..0000000
--- a/gone.py
+++ /dev/null
@@ -1,2 +0,0 @@
-x = 1
-y = 2
"#;

        let map = parse_diff(diff).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_parse_diff_multiple_files_keep_order() {
        let diff = r#"--- a/zeta.py
+++ b/zeta.py
@@ -0,0 +1,1 @@
+z = 1
--- a/README.md
+++ b/README.md
@@ -3,0 +4,2 @@
+more
+docs
--- a/alpha.py
+++ b/alpha.py
@@ -7 +7 @@
-a = 1
+a = 2
"#;

        let map = parse_diff(diff).unwrap();
        let entries: Vec<(&str, &[u32])> = map.iter().collect();
        assert_eq!(
            entries,
            vec![
                ("zeta.py", &[1][..]),
                ("README.md", &[4, 5][..]),
                ("alpha.py", &[7][..]),
            ]
        );
    }

    #[test]
    fn test_parse_diff_crlf() {
        let diff = "--- a/a.py\r\n+++ b/a.py\r\n@@ -0,0 +1,2 @@\r\n+one\r\n+two\r\n";

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.get("a.py"), Some(&[1, 2][..]));
    }

    #[test]
    fn test_parse_diff_no_newline_marker() {
        let diff = r#"--- a/a.py
+++ b/a.py
@@ -1 +1,2 @@
-x = 1
\ No newline at end of file
+x = 1
+y = 2
\ No newline at end of file
"#;

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.get("a.py"), Some(&[1, 2][..]));
    }

    #[test]
    fn test_parse_diff_lines_before_first_hunk_are_ignored() {
        let diff = "+++ b/a.py\n+stray\n@@ -1,1 +5,1 @@\n+real\n";

        let map = parse_diff(diff).unwrap();
        assert_eq!(map.get("a.py"), Some(&[5][..]));
    }

    #[test]
    fn test_parse_diff_empty() {
        assert!(parse_diff("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_diff_malformed_hunk_header_returns_error() {
        let diff = "--- a/a.py\n+++ b/a.py\n@@ -1,1 @@\n+line\n";

        let err = parse_diff(diff).unwrap_err();
        assert_eq!(
            err,
            DiffError::MalformedHunkHeader {
                line_no: 3,
                line: "@@ -1,1 @@".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_hunk_header_with_counts_and_context() {
        assert_eq!(parse_hunk_header("@@ -10,5 +20,8 @@ def ctx():"), Some(20));
    }

    #[test]
    fn test_parse_hunk_header_without_counts() {
        assert_eq!(parse_hunk_header("@@ -1 +1 @@"), Some(1));
    }

    #[test]
    fn test_parse_hunk_header_new_file() {
        assert_eq!(parse_hunk_header("@@ -0,0 +1,3 @@"), Some(1));
    }

    #[test]
    fn test_parse_hunk_header_rejects_bad_shapes() {
        assert_eq!(parse_hunk_header("@@ -10,5 @@"), None);
        assert_eq!(parse_hunk_header("@@ -a,5 +1,2 @@"), None);
        assert_eq!(parse_hunk_header("@@ -1,5 +x,2 @@"), None);
        assert_eq!(parse_hunk_header("@@ -1,5 +1, @@"), None);
        assert_eq!(parse_hunk_header("@@ -1,5 +1,2"), None);
        assert_eq!(parse_hunk_header("@@@ -1,2 -1,2 +1,3 @@@"), None);
    }
}

// ============================================================================
// Property Tests
// ============================================================================
