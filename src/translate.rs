//! Unified-diff line translation: predicts where a line remembered at a
//! historical revision sits in the current version of the file.

use regex::Regex;

/// One parsed hunk: the `@@`-header ranges plus the body rows in order.
#[derive(Debug)]
pub struct Hunk {
    /// Body rows with their `+`/`-`/space prefix intact.
    pub body: Vec<String>,
    /// Line count on the new side.
    pub new_count: u32,
    /// Start line on the new side, as written in the header.
    pub new_start: u32,
    /// Line count on the old side.
    pub old_count: u32,
    /// Start line on the old side, as written in the header.
    pub old_start: u32,
}

/// Parse all hunks out of unified-diff text, in file order.
///
/// Body collection is bounded by the header counts, so file headers
/// (`--- a/...`, `+++ b/...`) between hunks are never mistaken for rows.
///
/// # Panics
///
/// Panics if the hardcoded hunk-header regex is invalid (compile-time invariant).
pub fn parse_hunks(diff: &str) -> Vec<Hunk> {
    let header = Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid regex");
    let mut hunks: Vec<Hunk> = Vec::new();
    let mut old_left = 0_u32;
    let mut new_left = 0_u32;

    for line in diff.lines() {
        if let Some(cap) = header.captures(line) {
            let old_start = parse_range_number(cap.get(1).map(|m| return m.as_str()), 0);
            let old_count = parse_range_number(cap.get(2).map(|m| return m.as_str()), 1);
            let new_start = parse_range_number(cap.get(3).map(|m| return m.as_str()), 0);
            let new_count = parse_range_number(cap.get(4).map(|m| return m.as_str()), 1);
            old_left = old_count;
            new_left = new_count;
            hunks.push(Hunk { body: Vec::new(), new_count, new_start, old_count, old_start });
            continue;
        }

        if old_left == 0 && new_left == 0 {
            continue;
        }
        let Some(hunk) = hunks.last_mut() else {
            continue;
        };
        if line.starts_with('+') {
            new_left = new_left.saturating_sub(1);
        } else if line.starts_with('-') {
            old_left = old_left.saturating_sub(1);
        } else if line.starts_with('\\') {
            // "\ No newline at end of file" belongs to neither side.
            continue;
        } else {
            old_left = old_left.saturating_sub(1);
            new_left = new_left.saturating_sub(1);
        }
        hunk.body.push(line.to_string());
    }

    return hunks;
}

/// Parse one captured range number, falling back to a default for the
/// omitted-count form (`@@ -10 +10 @@` means count 1).
fn parse_range_number(capture: Option<&str>, default: u32) -> u32 {
    return capture.and_then(|s| return s.parse().ok()).unwrap_or(default);
}

/// Map a line number valid before the diff to its expected position after.
///
/// Single left-to-right scan over the hunks: lines before a hunk are final,
/// lines after a hunk accumulate the hunk's net shift, and lines inside a
/// hunk are walked through the body (see [`walk_hunk_body`]). Empty diff
/// text passes the input through unchanged.
pub fn translate_line(diff: &str, lineno: u32) -> u32 {
    let mut shift = 0_i64;

    for hunk in parse_hunks(diff) {
        if lineno < hunk.old_start {
            break;
        }
        if lineno < hunk.old_start.saturating_add(hunk.old_count) {
            return walk_hunk_body(&hunk, lineno.saturating_sub(hunk.old_start));
        }
        let net = i64::from(hunk.new_count).saturating_sub(i64::from(hunk.old_count));
        shift = shift.saturating_add(net);
    }

    let translated = i64::from(lineno).saturating_add(shift);
    return u32::try_from(translated.max(0)).unwrap_or(u32::MAX);
}

/// Locate a line touched by a hunk by walking the body from the top.
///
/// `+` rows are pure insertions and push the output position forward;
/// every other row consumes one original-side row. The walk stops once
/// the consumed count reaches the target's offset within the hunk, and
/// the rows walked so far, anchored at the new-side start, give the
/// translated line.
fn walk_hunk_body(hunk: &Hunk, offset: u32) -> u32 {
    let mut consumed = 0_u32;
    let mut walked = 0_u32;

    for row in &hunk.body {
        if row.starts_with('+') {
            walked = walked.saturating_add(1);
            continue;
        }
        if consumed == offset {
            break;
        }
        consumed = consumed.saturating_add(1);
        walked = walked.saturating_add(1);
    }

    return hunk.new_start.saturating_add(walked);
}

#[cfg(test)]
mod tests {
    use super::*;

    const HUNK: &str = "\
--- a/src/main.rs
+++ b/src/main.rs
@@ -10,3 +10,5 @@ fn main() {
 context one
+inserted one
+inserted two
 context two
 context three
";

    #[test]
    fn empty_diff_passes_through() {
        assert_eq!(translate_line("", 42), 42);
    }

    #[test]
    fn line_before_hunk_is_unaffected() {
        assert_eq!(translate_line(HUNK, 9), 9);
    }

    #[test]
    fn line_after_hunk_gets_net_shift() {
        assert_eq!(translate_line(HUNK, 20), 22);
    }

    #[test]
    fn line_inside_hunk_walks_the_body() {
        // Offset 1: one context row consumed, two insertions skipped over.
        assert_eq!(translate_line(HUNK, 11), 13);
    }

    #[test]
    fn first_line_of_hunk_anchors_at_new_start() {
        assert_eq!(translate_line(HUNK, 10), 10);
    }

    #[test]
    fn omitted_counts_default_to_one() {
        let diff = "@@ -5 +5 @@\n-old line\n+new line\n";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_count, 1);
        assert_eq!(hunks[0].new_count, 1);
    }

    #[test]
    fn shifts_accumulate_across_hunks() {
        let diff = "\
@@ -2,2 +2,3 @@
 a
+b
 c
@@ -10,3 +11,1 @@
 d
-e
-f
";
        // +1 from the first hunk, -2 from the second.
        assert_eq!(translate_line(diff, 30), 29);
    }

    #[test]
    fn file_headers_between_hunks_are_not_body_rows() {
        let diff = "\
--- a/one.rs
+++ b/one.rs
@@ -1,1 +1,1 @@
-x
+y
--- a/two.rs
+++ b/two.rs
@@ -1,1 +1,2 @@
 z
+w
";
        let hunks = parse_hunks(diff);
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].body.len(), 2);
        assert_eq!(hunks[1].body.len(), 2);
    }
}
