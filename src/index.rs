//! Index building.
//!
//! The searchable index is a flat vector of immutable [`IndexEntry`]
//! snapshots, rebuilt wholesale whenever it goes stale. The build runs in
//! two passes: first collect the set of parent items that own at least one
//! searchable attachment, then emit entries while suppressing those parents
//! so "the same paper" never shows up twice. One bad record never aborts a
//! rebuild; it is logged and skipped.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PaletteResult;
use crate::fuzzy;
use crate::metadata;
use crate::store::{DocumentStore, Field, LibraryKind, Record, RecordKind, Scope};

/// Coarse category used for action routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Item,
    Attachment,
}

/// Fine category used for `type:` filtering and result badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    Item,
    Note,
    Pdf,
}

/// Immutable searchable snapshot of one record, valid for one index
/// generation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: i64,
    pub kind: EntryKind,
    pub result_type: ResultType,
    pub title: String,
    pub subtitle: String,
    pub authors: String,
    pub tags: Vec<String>,
    pub abstract_snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub library_id: i64,
    pub library_kind: LibraryKind,
    /// Normalized concatenation of all textual fields; the only field the
    /// fuzzy matcher reads. Not part of the wire shape.
    #[serde(skip)]
    pub search_text: String,
}

/// Character budget for abstract snippets.
pub const DEFAULT_SNIPPET_LEN: usize = 180;

/// Build a fresh index over every scope the store exposes.
pub fn build_index<S: DocumentStore>(
    store: &S,
    snippet_len: usize,
) -> PaletteResult<Vec<IndexEntry>> {
    let scopes = store.list_scopes()?;
    let mut entries = Vec::new();

    for scope in &scopes {
        let records = store.list_records(scope)?;

        // Pass 1: parents that own at least one searchable attachment.
        let mut covered_parents: HashSet<i64> = HashSet::new();
        for record in &records {
            if is_searchable_attachment(record) {
                if let Some(parent) = record.parent_id() {
                    covered_parents.insert(parent);
                }
            }
        }

        // Pass 2: emit entries, suppressing covered parents.
        for record in &records {
            match build_entry(store, record, &records, &covered_parents, scope, snippet_len) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => {}
                Err(e) => {
                    warn!(record_id = record.id(), error = %e, "skipping record during index build");
                }
            }
        }
    }

    debug!(entries = entries.len(), scopes = scopes.len(), "index built");
    Ok(entries)
}

/// Searchable iff it is a file or web attachment with a content type, and
/// not an annotation or embedded image.
fn is_searchable_attachment(record: &impl Record) -> bool {
    record.kind() == RecordKind::Attachment
        && record.is_file_or_web_attachment()
        && !record.is_annotation()
        && !record.is_embedded_image()
        && matches!(record.content_type(), Ok(Some(ct)) if !ct.is_empty())
}

fn build_entry<S: DocumentStore>(
    store: &S,
    record: &S::Record,
    scope_records: &[S::Record],
    covered_parents: &HashSet<i64>,
    scope: &Scope,
    snippet_len: usize,
) -> PaletteResult<Option<IndexEntry>> {
    match record.kind() {
        RecordKind::Regular => {
            if covered_parents.contains(&record.id()) {
                // Its attachment entry represents this paper.
                return Ok(None);
            }
            Ok(Some(item_entry(record, scope, snippet_len)))
        }
        RecordKind::Note => Ok(Some(note_entry(record, scope, snippet_len))),
        RecordKind::Attachment => {
            if !is_searchable_attachment(record) {
                return Ok(None);
            }
            Ok(Some(attachment_entry(
                store,
                record,
                scope_records,
                scope,
                snippet_len,
            )?))
        }
    }
}

fn item_entry(record: &impl Record, scope: &Scope, snippet_len: usize) -> IndexEntry {
    let title = metadata::title(record);
    let authors = metadata::authors(record);
    let tags = metadata::tags(record, None);
    let year = metadata::year(record);
    let snippet = match record.field(Field::Abstract) {
        Ok(Some(text)) => metadata::abstract_snippet(&text, snippet_len),
        _ => String::new(),
    };

    finish_entry(
        record.id(),
        EntryKind::Item,
        ResultType::Item,
        title,
        scope.name.clone(),
        authors,
        tags,
        snippet,
        year,
        scope,
    )
}

fn note_entry(record: &impl Record, scope: &Scope, snippet_len: usize) -> IndexEntry {
    let body = match record.field(Field::NoteText) {
        Ok(Some(text)) => text,
        _ => String::new(),
    };

    // Notes have no title field; fall back to the host display title, then
    // to the first line of the body.
    let mut title = metadata::title(record);
    if title == metadata::UNTITLED {
        let stripped = metadata::collapse_whitespace(&metadata::strip_html(&body));
        if !stripped.is_empty() {
            title = metadata::abstract_snippet(&stripped, 60);
        }
    }

    finish_entry(
        record.id(),
        EntryKind::Item,
        ResultType::Note,
        title,
        "Note".to_string(),
        String::new(),
        metadata::tags(record, None),
        metadata::abstract_snippet(&body, snippet_len),
        None,
        scope,
    )
}

/// An attachment entry stands in for its parent paper, so it inherits the
/// parent's title, authors, tags, year and abstract; the filename goes into
/// the subtitle. A parent that fails to load degrades to attachment-local
/// metadata.
fn attachment_entry<S: DocumentStore>(
    store: &S,
    record: &S::Record,
    scope_records: &[S::Record],
    scope: &Scope,
    snippet_len: usize,
) -> PaletteResult<IndexEntry> {
    let filename = match record.field(Field::Filename) {
        Ok(Some(f)) => f,
        _ => String::new(),
    };

    let parent_local = record
        .parent_id()
        .and_then(|pid| scope_records.iter().find(|r| r.id() == pid));
    let parent_fetched: Option<S::Record> = match (parent_local, record.parent_id()) {
        (None, Some(pid)) => fetch_parent(store, pid),
        _ => None,
    };
    let parent: Option<&S::Record> = parent_local.or(parent_fetched.as_ref());

    let (title, authors, tags, year, snippet) = match parent {
        Some(parent) => (
            metadata::title(parent),
            metadata::authors(parent),
            metadata::tags(parent, None),
            metadata::year(parent),
            match parent.field(Field::Abstract) {
                Ok(Some(text)) => metadata::abstract_snippet(&text, snippet_len),
                _ => String::new(),
            },
        ),
        None => {
            let title = {
                let own = metadata::title(record);
                if own == metadata::UNTITLED && !filename.is_empty() {
                    filename.clone()
                } else {
                    own
                }
            };
            (title, String::new(), Vec::new(), None, String::new())
        }
    };

    let subtitle = if filename.is_empty() {
        scope.name.clone()
    } else {
        filename
    };

    Ok(finish_entry(
        record.id(),
        EntryKind::Attachment,
        ResultType::Pdf,
        title,
        subtitle,
        authors,
        tags,
        snippet,
        year,
        scope,
    ))
}

fn fetch_parent<S: DocumentStore>(store: &S, parent_id: i64) -> Option<S::Record> {
    match store.get_record(parent_id) {
        Ok(parent) => parent,
        Err(e) => {
            debug!(parent_id, error = %e, "parent lookup failed; using attachment-local metadata");
            None
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn finish_entry(
    id: i64,
    kind: EntryKind,
    result_type: ResultType,
    title: String,
    subtitle: String,
    authors: String,
    tags: Vec<String>,
    abstract_snippet: String,
    year: Option<i32>,
    scope: &Scope,
) -> IndexEntry {
    let mut haystack = String::new();
    for part in [&title, &subtitle, &authors] {
        if !part.is_empty() {
            haystack.push_str(part);
            haystack.push(' ');
        }
    }
    for tag in &tags {
        haystack.push_str(tag);
        haystack.push(' ');
    }
    if !abstract_snippet.is_empty() {
        haystack.push_str(&abstract_snippet);
        haystack.push(' ');
    }
    if let Some(year) = year {
        haystack.push_str(&year.to_string());
    }

    IndexEntry {
        id,
        kind,
        result_type,
        title,
        subtitle,
        authors,
        tags,
        abstract_snippet,
        year,
        library_id: scope.library_id,
        library_kind: scope.kind,
        search_text: fuzzy::normalize(&haystack),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{MemRecord, MemStore};

    fn build(store: &MemStore) -> Vec<IndexEntry> {
        build_index(store, DEFAULT_SNIPPET_LEN).unwrap()
    }

    #[test]
    fn parent_with_searchable_pdf_is_suppressed() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Attention Is All You Need").with_date("2017"),
            MemRecord::pdf(2, 1, "attention.pdf"),
        ]);

        let entries = build(&store);
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.id, 2);
        assert_eq!(entry.kind, EntryKind::Attachment);
        assert_eq!(entry.result_type, ResultType::Pdf);
        // The surviving entry still reads like the paper.
        assert_eq!(entry.title, "Attention Is All You Need");
        assert_eq!(entry.subtitle, "attention.pdf");
        assert_eq!(entry.year, Some(2017));
    }

    #[test]
    fn item_without_attachment_survives() {
        let store = MemStore::new(vec![MemRecord::item(1, "Lonely Paper")]);
        let entries = build(&store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
        assert_eq!(entries[0].result_type, ResultType::Item);
    }

    #[test]
    fn annotation_and_embedded_image_attachments_are_skipped() {
        let mut annotation = MemRecord::pdf(2, 1, "a.pdf");
        annotation.annotation = true;
        let mut image = MemRecord::pdf(3, 1, "shot.png");
        image.embedded_image = true;
        let mut no_content_type = MemRecord::pdf(4, 1, "x.bin");
        no_content_type.content_type = None;

        let store = MemStore::new(vec![
            MemRecord::item(1, "Paper"),
            annotation,
            image,
            no_content_type,
        ]);

        let entries = build(&store);
        // None of the attachments is searchable, so the parent survives.
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 1);
    }

    #[test]
    fn notes_index_their_body() {
        let store = MemStore::new(vec![MemRecord::note(
            7,
            "<p>Reading list for <b>transformers</b></p>",
        )]);

        let entries = build(&store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].result_type, ResultType::Note);
        assert!(entries[0].title.contains("Reading list"));
        assert!(entries[0].search_text.contains("transformers"));
    }

    #[test]
    fn missing_parent_does_not_abort_rebuild() {
        // An attachment whose parent vanished from the store still indexes,
        // degraded to its local metadata.
        let store = MemStore::new(vec![
            MemRecord::item(1, "Good Paper"),
            MemRecord {
                id: 2,
                kind: Some(RecordKind::Attachment),
                parent_id: Some(999),
                library_id: 1,
                content_type: Some("application/pdf".into()),
                file_or_web: true,
                ..MemRecord::default()
            },
        ]);

        let entries = build(&store);
        assert_eq!(entries.len(), 2);
        // The orphan attachment degrades to local metadata.
        let orphan = entries.iter().find(|e| e.id == 2).unwrap();
        assert_eq!(orphan.title, metadata::UNTITLED);
    }

    #[test]
    fn exactly_one_entry_per_eligible_record() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Paper A").with_tags(&["AI"]),
            MemRecord::pdf(2, 1, "a.pdf"),
            MemRecord::item(3, "Paper B"),
            MemRecord::note(4, "note body"),
        ]);

        let entries = build(&store);
        let mut ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn search_text_is_normalized_concatenation() {
        let store = MemStore::new(vec![MemRecord::item(1, "Deep   LEARNING")
            .with_tags(&["Neural Nets"])
            .with_date("2015-03")]);

        let entries = build(&store);
        let text = &entries[0].search_text;
        assert!(text.contains("deep learning"));
        assert!(text.contains("neural nets"));
        assert!(text.contains("2015"));
        assert_eq!(text, &fuzzy::normalize(text));
    }
}
