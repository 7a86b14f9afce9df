//! Fuzzy line relocation: searches a bounded window around a candidate
//! line for the best textual match to remembered content.

use std::path::Path;

use crate::providers::DocumentProvider;

/// A successful fuzzy relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyHit {
    /// Edit distance between the remembered content and the matched line.
    pub distance: usize,
    /// Zero-based line number of the match.
    pub lineno: u32,
    /// Text of the matched line, used to re-anchor the fact.
    pub text: String,
}

/// Search up to `radius` offsets around `candidate` for the line closest to
/// `content`, in diamond order: offset 0, then +1, -1, +2, -2, and so on.
/// The first line achieving the minimum distance wins, which makes the
/// expansion order the tie-break.
///
/// A result is accepted only when the best distance is strictly less than
/// the character length of `content` — anything else is no better than
/// matching nothing at all, and `None` is returned so the caller can leave
/// the position untouched and flag it stale.
pub fn locate(
    docs: &mut dyn DocumentProvider,
    file: &Path,
    candidate: u32,
    content: &str,
    radius: u32,
) -> Option<FuzzyHit> {
    let line_count = docs.line_count(file)?;
    let mut best: Option<FuzzyHit> = None;

    for i in 0..radius {
        for lineno in probe_pair(candidate, i) {
            if lineno >= line_count {
                continue;
            }
            let Some(text) = docs.line_text(file, lineno) else {
                continue;
            };
            let distance = strsim::levenshtein(content, &text);
            let improves = best.as_ref().is_none_or(|b| return distance < b.distance);
            if improves {
                best = Some(FuzzyHit { distance, lineno, text });
            }
        }
    }

    let hit = best?;
    if hit.distance < content.chars().count() {
        return Some(hit);
    }
    return None;
}

/// The probe lines for one expansion step: `candidate + i` first, then
/// `candidate - i`. Offset 0 probes once; a negative underflow probes only
/// the upper line.
fn probe_pair(candidate: u32, i: u32) -> Vec<u32> {
    let mut probes = vec![candidate.saturating_add(i)];
    if i > 0 && let Some(below) = candidate.checked_sub(i) {
        probes.push(below);
    }
    return probes;
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    /// In-memory document provider for fuzzy tests.
    struct FixedDoc(Vec<&'static str>);

    impl DocumentProvider for FixedDoc {
        fn line_count(&mut self, _file: &Path) -> Option<u32> {
            return u32::try_from(self.0.len()).ok();
        }

        fn line_text(&mut self, _file: &Path, lineno: u32) -> Option<String> {
            return self.0.get(lineno as usize).map(|s| return (*s).to_string());
        }
    }

    fn file() -> PathBuf {
        return PathBuf::from("src/lib.rs");
    }

    #[test]
    fn exact_match_at_offset_zero_has_distance_zero() {
        let mut doc = FixedDoc(vec!["fn a() {}", "fn b() {}", "fn c() {}"]);
        let hit = locate(&mut doc, &file(), 1, "fn b() {}", 4).unwrap();
        assert_eq!(hit.lineno, 1);
        assert_eq!(hit.distance, 0);
    }

    #[test]
    fn plus_direction_wins_ties() {
        // Lines 0 and 2 are equidistant from the remembered content;
        // the +1 probe runs before the -1 probe.
        let mut doc = FixedDoc(vec!["let y = 1;", "-----", "let y = 2;"]);
        let hit = locate(&mut doc, &file(), 1, "let y = 0;", 4).unwrap();
        assert_eq!(hit.lineno, 2);
    }

    #[test]
    fn radius_exhaustion_returns_none() {
        let mut doc = FixedDoc(vec!["alpha", "beta", "gamma"]);
        assert!(locate(&mut doc, &file(), 1, "zzzz", 2).is_none());
    }

    #[test]
    fn no_improvement_over_baseline_is_rejected() {
        // Best distance equals the content length: formally "not found".
        let mut doc = FixedDoc(vec!["xxxx"]);
        assert!(locate(&mut doc, &file(), 0, "abcd", 2).is_none());
    }

    #[test]
    fn drifted_line_is_found_within_radius() {
        let mut doc = FixedDoc(vec!["", "", "", "let total = items.len();", ""]);
        let hit = locate(&mut doc, &file(), 1, "let total = items.len();", 4).unwrap();
        assert_eq!(hit.lineno, 3);
        assert_eq!(hit.distance, 0);
    }

    #[test]
    fn zero_radius_never_matches() {
        let mut doc = FixedDoc(vec!["exact line"]);
        assert!(locate(&mut doc, &file(), 0, "exact line", 0).is_none());
    }
}
