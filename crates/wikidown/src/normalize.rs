//! Markdown normalizer.
//!
//! Final text-level cleanup pass over the assembled document. The pass is
//! idempotent: `normalize(normalize(x)) == normalize(x)` for all inputs.

use once_cell::sync::Lazy;
use regex::Regex;

static DUPLICATE_HASH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,5})\s+#(.*)$").expect("BUG: invalid heading pattern"));
static HEADING_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").expect("BUG: invalid spacing pattern"));
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6} ").expect("BUG: invalid heading marker pattern"));
static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d+\.) ").expect("BUG: invalid list marker pattern"));

/// Normalize assembled Markdown: collapse blank-line runs, separate block
/// markers from preceding content, repair nested-heading artifacts, and
/// collapse duplicated all-dash separator rows.
pub fn normalize(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let mut lines: Vec<String> = input.lines().map(fix_heading_line).collect();
    lines = collapse_dash_runs(lines);
    lines = collapse_blank_runs(lines);
    lines = insert_block_spacing(lines);

    // Trim leading/trailing blank lines, keep a single trailing newline.
    while lines.first().map(|l| is_blank(l)).unwrap_or(false) {
        lines.remove(0);
    }
    while lines.last().map(|l| is_blank(l)).unwrap_or(false) {
        lines.pop();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Collapse `# #` style artifacts produced by nested heading rendering and
/// force exactly one space after the leading hash run.
fn fix_heading_line(line: &str) -> String {
    let mut line = line.to_string();
    while let Some(captures) = DUPLICATE_HASH.captures(&line) {
        line = format!("{}#{}", &captures[1], &captures[2]);
    }
    if let Some(captures) = HEADING_SPACING.captures(&line) {
        return format!("{} {}", &captures[1], &captures[2]);
    }
    line
}

/// A row consisting only of dashes (a horizontal rule or a stray separator).
fn is_dash_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-')
}

/// Collapse runs of consecutive all-dash rows into a single row.
fn collapse_dash_runs(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if is_dash_row(&line) && out.last().map(|prev| is_dash_row(prev)).unwrap_or(false) {
            continue;
        }
        out.push(line);
    }
    out
}

/// Collapse runs of blank lines to exactly one blank line.
fn collapse_blank_runs(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if is_blank(&line) && out.last().map(|prev| is_blank(prev)).unwrap_or(false) {
            continue;
        }
        out.push(if is_blank(&line) {
            String::new()
        } else {
            line
        });
    }
    out
}

/// Insert a blank line before a heading, list marker or blockquote marker
/// that directly follows unrelated non-blank content.
fn insert_block_spacing(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(prev) = out.last() {
            if !is_blank(prev) && needs_leading_blank(prev, &line) {
                out.push(String::new());
            }
        }
        out.push(line);
    }
    out
}

fn needs_leading_blank(prev: &str, line: &str) -> bool {
    if HEADING.is_match(line) {
        return true;
    }
    if LIST_MARKER.is_match(line) {
        // Consecutive list items stay adjacent.
        return !LIST_MARKER.is_match(prev);
    }
    if line.starts_with("> ") {
        return !prev.starts_with("> ");
    }
    false
}
