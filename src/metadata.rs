//! Display-metadata extraction from raw records.
//!
//! Pure functions only. Every extractor tolerates partially-loaded records:
//! a transient field-load failure degrades to an empty/absent value for that
//! field alone and never aborts extraction of sibling fields.

use crate::store::{Field, Record};

/// Fallback title when a record has neither a title field nor a host display
/// title.
pub const UNTITLED: &str = "Untitled";

/// Best display title for a record: title field, else the host-computed
/// display title, else [`UNTITLED`].
pub fn title(record: &impl Record) -> String {
    if let Ok(Some(t)) = record.field(Field::Title) {
        let t = t.trim();
        if !t.is_empty() {
            return t.to_string();
        }
    }

    if let Ok(Some(t)) = record.display_title() {
        let t = t.trim();
        if !t.is_empty() {
            return t.to_string();
        }
    }

    UNTITLED.to_string()
}

/// Publication year: the first 4-digit run in the record's date field.
pub fn year(record: &impl Record) -> Option<i32> {
    match record.field(Field::Date) {
        Ok(Some(date)) => year_from_date(&date),
        _ => None,
    }
}

/// Extract the first run of four consecutive ASCII digits.
pub fn year_from_date(date: &str) -> Option<i32> {
    let bytes = date.as_bytes();
    let mut run = 0usize;

    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return date[i - 3..=i].parse().ok();
            }
        } else {
            run = 0;
        }
    }

    None
}

/// Author summary string.
///
/// Prefers the host's precomputed first-creator summary; otherwise joins
/// "First Last" for up to two creators with a comma.
pub fn authors(record: &impl Record) -> String {
    if let Ok(Some(summary)) = record.first_creator_summary() {
        let summary = summary.trim();
        if !summary.is_empty() {
            return summary.to_string();
        }
    }

    let creators = match record.creators() {
        Ok(c) => c,
        Err(_) => return String::new(),
    };

    creators
        .iter()
        .take(2)
        .map(|c| {
            let full = format!("{} {}", c.first_name.trim(), c.last_name.trim());
            full.trim().to_string()
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normalized tag list: lowercased, whitespace-collapsed, deduplicated by
/// normalized form (first occurrence wins), optionally capped.
pub fn tags(record: &impl Record, cap: Option<usize>) -> Vec<String> {
    let raw = match record.tags() {
        Ok(t) => t,
        Err(_) => return Vec::new(),
    };

    let mut out: Vec<String> = Vec::new();
    for tag in raw {
        let normalized = collapse_whitespace(&tag.to_lowercase());
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        out.push(normalized);
        if let Some(cap) = cap {
            if out.len() >= cap {
                break;
            }
        }
    }
    out
}

/// Abstract snippet: HTML stripped, whitespace collapsed, cut to `max_len`
/// characters with a trailing `...` replacing the last 3 characters of the
/// budget when truncated.
pub fn abstract_snippet(raw: &str, max_len: usize) -> String {
    let text = collapse_whitespace(&strip_html(raw));
    truncate_chars(&text, max_len)
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    let count = text.chars().count();
    if count <= max_len {
        return text.to_string();
    }

    let keep = max_len.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Remove HTML tags with a single forward scan. Not a real parser; good
/// enough for note bodies and pasted abstracts.
pub fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;

    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                // Tag boundaries act as separators so "<p>a</p><p>b</p>"
                // does not fuse into "ab".
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    out
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
