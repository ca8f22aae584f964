// src/diff.rs
//! Bounded unified-style line diffs between two snapshots of a source.
//!
//! Output mirrors the classic unified format with empty file names:
//! `--- ` / `+++ ` headers, `@@ -a,b +c,d @@` hunk headers and three lines of
//! context. Header lines count toward the line budget. Rendering stops as soon
//! as the budget is reached, so the earliest lines of the diff always win.

use similar::{Algorithm, ChangeTag, DiffOp, TextDiff};
use std::time::Duration;

/// Default budget used for alert snippets.
pub const DEFAULT_MAX_LINES: usize = 50;

const CONTEXT_LINES: usize = 3;

// Myers falls back to a coarser (still valid) diff past this deadline.
const DIFF_TIMEOUT: Duration = Duration::from_secs(2);

/// Unified diff of `previous` → `current`, capped at `max_lines` lines.
/// Empty when the texts are identical or `max_lines` is zero.
pub fn summarize(previous: &str, current: &str, max_lines: usize) -> String {
    if max_lines == 0 || previous == current {
        return String::new();
    }

    let old_lines: Vec<&str> = previous.lines().collect();
    let new_lines: Vec<&str> = current.lines().collect();

    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(DIFF_TIMEOUT)
        .diff_slices(&old_lines, &new_lines);

    let groups = diff.grouped_ops(CONTEXT_LINES);
    if groups.is_empty() {
        return String::new();
    }

    let mut out = Budgeted::new(max_lines);
    out.push("--- ".to_string());
    out.push("+++ ".to_string());

    for group in &groups {
        if out.full() {
            break;
        }
        out.push(hunk_header(group));
        for op in group {
            for change in diff.iter_changes(op) {
                if out.full() {
                    break;
                }
                let sign = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                out.push(format!("{sign}{}", change.value()));
            }
        }
    }

    out.lines.join("\n")
}

struct Budgeted {
    lines: Vec<String>,
    cap: usize,
}

impl Budgeted {
    fn new(cap: usize) -> Self {
        Self {
            lines: Vec::with_capacity(cap.min(256)),
            cap,
        }
    }

    fn full(&self) -> bool {
        self.lines.len() >= self.cap
    }

    fn push(&mut self, line: String) {
        if !self.full() {
            self.lines.push(line);
        }
    }
}

fn hunk_header(group: &[DiffOp]) -> String {
    let (first, last) = match (group.first(), group.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return "@@ -0,0 +0,0 @@".to_string(),
    };
    let old = format_range(first.old_range().start, last.old_range().end);
    let new = format_range(first.new_range().start, last.new_range().end);
    format!("@@ -{old} +{new} @@")
}

/// 1-based start plus length; a single line omits the length and an empty
/// range reports the line before it.
fn format_range(start: usize, stop: usize) -> String {
    let len = stop - start;
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_have_no_diff() {
        assert_eq!(summarize("a\nb", "a\nb", 50), "");
        assert_eq!(summarize("", "", 50), "");
    }

    #[test]
    fn single_line_replacement() {
        let out = summarize("a\nb\nc", "a\nB\nc", 50);
        assert_eq!(out, "--- \n+++ \n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c");
    }

    #[test]
    fn diff_against_empty_previous() {
        let out = summarize("", "first\nsecond", 50);
        assert_eq!(out, "--- \n+++ \n@@ -0,0 +1,2 @@\n+first\n+second");
    }

    #[test]
    fn context_is_three_lines() {
        let old: Vec<String> = (0..20).map(|i| format!("l{i}")).collect();
        let mut new = old.clone();
        new[10] = "changed".into();
        let out = summarize(&old.join("\n"), &new.join("\n"), 50);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[2], "@@ -8,7 +8,7 @@");
        assert_eq!(lines[3], " l7");
        assert!(lines.contains(&"-l10"));
        assert!(lines.contains(&"+changed"));
        assert_eq!(*lines.last().unwrap(), " l13");
    }

    #[test]
    fn budget_keeps_earliest_lines() {
        let new: String = (0..200).map(|i| format!("n{i}\n")).collect();
        let out = summarize("", &new, 5);
        assert_eq!(out, "--- \n+++ \n@@ -0,0 +1,200 @@\n+n0\n+n1");
    }

    #[test]
    fn zero_budget_is_empty() {
        assert_eq!(summarize("a", "b", 0), "");
    }

    #[test]
    fn single_line_ranges_omit_length() {
        assert_eq!(format_range(0, 1), "1");
        assert_eq!(format_range(4, 4), "4,0");
        assert_eq!(format_range(2, 5), "3,3");
    }
}
