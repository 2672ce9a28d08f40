//! Subsequence fuzzy matching.
//!
//! Order-preserving subsequence scoring, not edit distance: a haystack
//! matches if it contains every query character in order. A single forward
//! scan keeps this cheap enough to run over the whole corpus per keystroke.
//!
//! Bonus schedule on top of the +1-per-character baseline:
//! - consecutive run: `5 + run_length` per character that extends a run
//! - word boundary: +3 when a match sits at position 0 or right after
//!   one of ` `, `/`, `-`, `_`
//! - literal substring: flat +8 when the whole query appears contiguously
//! - length closeness: `max(0, 10 - (haystack_len - query_len))`, favoring
//!   exact-ish matches over long documents that merely contain the letters

/// Sentinel returned when the query is not a subsequence of the haystack.
/// Callers must exclude the entry, not treat this as a low score.
pub const NO_MATCH: i64 = -1;

const BOUNDARY_CHARS: [char; 4] = [' ', '/', '-', '_'];
const BOUNDARY_BONUS: i64 = 3;
const SUBSTRING_BONUS: i64 = 8;
const LENGTH_BONUS_MAX: i64 = 10;

/// Normalize a string for matching: lowercase, collapse whitespace, trim.
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Score `query` against `haystack`.
///
/// Returns [`NO_MATCH`] when the query's characters do not all occur in
/// order; otherwise a positive score (higher = better). The empty query
/// trivially matches with score 0 plus the flat bonuses.
pub fn fuzzy_score(query: &str, haystack: &str) -> i64 {
    let query = normalize(query);
    let haystack = normalize(haystack);
    score_normalized(&query, &haystack)
}

/// Score with both sides already normalized. The search service normalizes
/// entry text once at index-build time and uses this directly.
pub fn score_normalized(query: &str, haystack: &str) -> i64 {
    let hay: Vec<char> = haystack.chars().collect();
    let mut score: i64 = 0;
    let mut pos: usize = 0;
    let mut prev_match: Option<usize> = None;
    let mut run: i64 = 0;

    for qc in query.chars() {
        let found = hay[pos..].iter().position(|&hc| hc == qc);
        let at = match found {
            Some(offset) => pos + offset,
            None => return NO_MATCH,
        };

        score += 1;

        if prev_match == Some(at.wrapping_sub(1)) && at > 0 {
            run += 1;
            score += 5 + run;
        } else {
            run = 0;
        }

        if at == 0 || BOUNDARY_CHARS.contains(&hay[at - 1]) {
            score += BOUNDARY_BONUS;
        }

        prev_match = Some(at);
        pos = at + 1;
    }

    if !query.is_empty() && haystack.contains(query) {
        score += SUBSTRING_BONUS;
    }

    let length_gap = hay.len() as i64 - query.chars().count() as i64;
    score += (LENGTH_BONUS_MAX - length_gap).max(0);

    score
}
