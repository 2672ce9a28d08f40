//! Query parsing.
//!
//! A raw palette input splits into free text plus structured filter tokens
//! (`type:`, `tag:`, `year:`), or switches wholesale into command mode when
//! the first non-space character is `>`. Malformed filter values are never an
//! error; they are dropped and the query degrades to a looser interpretation.

use crate::fuzzy;
use crate::index::{IndexEntry, ResultType};

/// Outcome of parsing one raw input string.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInput {
    /// Leading `>`: search the command registry with this text.
    Command(String),
    /// Regular document query.
    Query(ParsedQuery),
}

/// Free text plus structured filters. Built fresh per keystroke.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub text: String,
    pub filters: Filters,
}

/// Structured filters extracted from the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    /// Accepted result types; empty means "any".
    pub types: Vec<ResultType>,
    /// AND semantics: a result must carry every listed tag.
    pub tags: Vec<String>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.tags.is_empty()
            && self.year_min.is_none()
            && self.year_max.is_none()
    }

    /// Whether an index entry passes every active filter.
    pub fn matches(&self, entry: &IndexEntry) -> bool {
        if !self.types.is_empty() && !self.types.contains(&entry.result_type) {
            return false;
        }

        if !self.tags.iter().all(|tag| entry.tags.contains(tag)) {
            return false;
        }

        if self.year_min.is_some() || self.year_max.is_some() {
            // An absent year fails any bounded filter.
            let Some(year) = entry.year else {
                return false;
            };
            if self.year_min.is_some_and(|min| year < min) {
                return false;
            }
            if self.year_max.is_some_and(|max| year > max) {
                return false;
            }
        }

        true
    }

    /// Intersect a parsed year bound into the running range. Impossible
    /// ranges (min > max) are allowed and simply match nothing.
    fn intersect_years(&mut self, min: Option<i32>, max: Option<i32>) {
        if let Some(min) = min {
            self.year_min = Some(self.year_min.map_or(min, |cur| cur.max(min)));
        }
        if let Some(max) = max {
            self.year_max = Some(self.year_max.map_or(max, |cur| cur.min(max)));
        }
    }
}

/// Parse a raw input string.
pub fn parse(raw: &str) -> ParsedInput {
    let trimmed = raw.trim_start();
    if let Some(rest) = trimmed.strip_prefix('>') {
        // Command mode: no filter-token parsing applies.
        return ParsedInput::Command(rest.trim().to_string());
    }

    let mut filters = Filters::default();
    let mut text_tokens: Vec<String> = Vec::new();

    for token in tokenize(raw) {
        if let Some(value) = strip_prefix_ci(&token, "type:") {
            for t in value.split('|') {
                match t.trim().to_lowercase().as_str() {
                    "item" => push_type(&mut filters.types, ResultType::Item),
                    "note" => push_type(&mut filters.types, ResultType::Note),
                    "pdf" => push_type(&mut filters.types, ResultType::Pdf),
                    // Unrecognized values are silently dropped.
                    _ => {}
                }
            }
        } else if let Some(value) = strip_prefix_ci(&token, "tag:") {
            let tag = fuzzy::normalize(value);
            if !tag.is_empty() {
                filters.tags.push(tag);
            }
        } else if let Some(value) = strip_prefix_ci(&token, "year:") {
            if let Some((min, max)) = parse_year_expr(value) {
                filters.intersect_years(min, max);
            }
        } else {
            text_tokens.push(token);
        }
    }

    ParsedInput::Query(ParsedQuery {
        text: text_tokens.join(" "),
        filters,
    })
}

fn push_type(types: &mut Vec<ResultType>, t: ResultType) {
    if !types.contains(&t) {
        types.push(t);
    }
}

/// Case-insensitive prefix strip for filter tokens.
fn strip_prefix_ci<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    let head = token.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&token[prefix.len()..])
    } else {
        None
    }
}

/// Parse one `year:` value into (min, max) bounds.
///
/// Forms: `2020`, `2018-2021` (order-independent), `>=2019` / `>2019`
/// (both inclusive), `<=2019` / `<2019` (both inclusive). Anything else
/// yields `None` and the token is ignored.
fn parse_year_expr(value: &str) -> Option<(Option<i32>, Option<i32>)> {
    let value = value.trim();

    if let Some(rest) = value.strip_prefix(">=").or_else(|| value.strip_prefix('>')) {
        return Some((Some(parse_year(rest)?), None));
    }
    if let Some(rest) = value.strip_prefix("<=").or_else(|| value.strip_prefix('<')) {
        return Some((None, Some(parse_year(rest)?)));
    }

    if let Some((a, b)) = value.split_once('-') {
        let a = parse_year(a)?;
        let b = parse_year(b)?;
        return Some((Some(a.min(b)), Some(a.max(b))));
    }

    let y = parse_year(value)?;
    Some((Some(y), Some(y)))
}

fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

/// Split on whitespace while keeping double-quoted phrases as single tokens
/// (quotes stripped). An unterminated quote runs to the end of input.
fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in raw.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: &str) -> ParsedQuery {
        match parse(raw) {
            ParsedInput::Query(q) => q,
            other => panic!("expected document query, got {:?}", other),
        }
    }

    #[test]
    fn plain_text_passes_through() {
        let q = query("deep learning");
        assert_eq!(q.text, "deep learning");
        assert!(q.filters.is_empty());
    }

    #[test]
    fn quoted_phrase_stays_one_token() {
        let q = query("\"all you need\" transformers");
        assert_eq!(q.text, "all you need transformers");
    }

    #[test]
    fn type_filter_accepts_pipe_list_and_drops_unknown() {
        let q = query("type:pdf|note|bogus attention");
        assert_eq!(q.filters.types, vec![ResultType::Pdf, ResultType::Note]);
        assert_eq!(q.text, "attention");
    }

    #[test]
    fn filter_prefixes_are_case_insensitive() {
        let q = query("TYPE:pdf Tag:AI");
        assert_eq!(q.filters.types, vec![ResultType::Pdf]);
        assert_eq!(q.filters.tags, vec!["ai"]);
    }

    #[test]
    fn tags_accumulate_with_and_semantics() {
        let q = query("tag:ai tag:ml");
        assert_eq!(q.filters.tags, vec!["ai", "ml"]);
        assert!(q.text.is_empty());
    }

    #[test]
    fn year_exact_and_range() {
        let q = query("year:2020");
        assert_eq!(q.filters.year_min, Some(2020));
        assert_eq!(q.filters.year_max, Some(2020));

        // Range is order-independent.
        let q = query("year:2021-2018");
        assert_eq!(q.filters.year_min, Some(2018));
        assert_eq!(q.filters.year_max, Some(2021));
    }

    #[test]
    fn year_bounds_are_inclusive_either_spelling() {
        let ge = query("year:>=2019").filters;
        let gt = query("year:>2019").filters;
        assert_eq!(ge, gt);
        assert_eq!(ge.year_min, Some(2019));
        assert_eq!(ge.year_max, None);

        let le = query("year:<=2019").filters;
        let lt = query("year:<2019").filters;
        assert_eq!(le, lt);
        assert_eq!(le.year_max, Some(2019));
    }

    #[test]
    fn multiple_year_tokens_intersect() {
        let q = query("year:>=2018 year:<=2020 year:2019-2021");
        assert_eq!(q.filters.year_min, Some(2019));
        assert_eq!(q.filters.year_max, Some(2020));

        // Impossible ranges are allowed; they just match nothing.
        let q = query("year:2022 year:2018");
        assert_eq!(q.filters.year_min, Some(2022));
        assert_eq!(q.filters.year_max, Some(2018));
    }

    #[test]
    fn malformed_year_is_dropped() {
        let q = query("year:banana year:99 rust");
        assert!(q.filters.year_min.is_none());
        assert!(q.filters.year_max.is_none());
        assert_eq!(q.text, "rust");
    }

    #[test]
    fn leading_angle_enters_command_mode() {
        assert_eq!(parse("> new note"), ParsedInput::Command("new note".into()));
        assert_eq!(parse("  >quit"), ParsedInput::Command("quit".into()));
        // Filter syntax is inert in command mode.
        assert_eq!(
            parse(">tag:ai"),
            ParsedInput::Command("tag:ai".to_string())
        );
    }

    #[test]
    fn angle_elsewhere_is_plain_text() {
        let q = query("a > b");
        assert_eq!(q.text, "a > b");
    }
}
