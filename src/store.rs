//! Host collaborator interfaces.
//!
//! The palette core never reaches into ambient host globals. Everything it
//! needs from the surrounding application — the document corpus, the active
//! library scope, attachment resolution — comes in through the traits defined
//! here and is injected at construction time. Adapters in the host normalize
//! whatever API variant the host actually has into these calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::error::PaletteResult;

/// Raised by a [`Record`] accessor when the backing field has not been
/// materialized by the host store yet. Callers treat this as "field absent";
/// it is never propagated out of the extraction layer.
#[derive(Debug, Clone, Copy, Error)]
#[error("record field not loaded")]
pub struct FieldUnavailable;

/// Result of loading a single lazily-materialized record field.
pub type FieldResult<T> = Result<T, FieldUnavailable>;

/// Textual fields a record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Date,
    Abstract,
    Filename,
    NoteText,
}

/// Coarse record classification as reported by the host store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Regular,
    Note,
    Attachment,
}

/// Whether a library belongs to the user or to a shared group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    User,
    Group,
}

/// One creator (author, editor, ...) attached to a record.
#[derive(Debug, Clone)]
pub struct Creator {
    pub first_name: String,
    pub last_name: String,
}

/// One searchable library/collection scope exposed by the host.
#[derive(Debug, Clone)]
pub struct Scope {
    pub library_id: i64,
    pub kind: LibraryKind,
    pub name: String,
}

/// A document-like entity from the host corpus.
///
/// Identity and classification are always loaded; every textual accessor may
/// fail transiently with [`FieldUnavailable`] if the host has not materialized
/// that field yet.
pub trait Record {
    fn id(&self) -> i64;
    fn kind(&self) -> RecordKind;
    fn parent_id(&self) -> Option<i64>;
    fn library_id(&self) -> i64;
    fn library_kind(&self) -> LibraryKind;

    /// Load one textual field. `Ok(None)` means the field is genuinely empty.
    fn field(&self, field: Field) -> FieldResult<Option<String>>;

    /// Host-computed display title (fallback when the title field is empty).
    fn display_title(&self) -> FieldResult<Option<String>>;

    /// Precomputed "first creator" summary, when the host maintains one.
    fn first_creator_summary(&self) -> FieldResult<Option<String>>;

    fn creators(&self) -> FieldResult<Vec<Creator>>;

    fn tags(&self) -> FieldResult<Vec<String>>;

    /// MIME content type, for attachments.
    fn content_type(&self) -> FieldResult<Option<String>>;

    /// True for annotation records masquerading as attachments.
    fn is_annotation(&self) -> bool {
        false
    }

    /// True for embedded-image attachments (note screenshots etc.).
    fn is_embedded_image(&self) -> bool {
        false
    }

    /// True when the attachment is a stored/linked file or a web snapshot.
    fn is_file_or_web_attachment(&self) -> bool {
        false
    }
}

/// Shared staleness flag handed to the host's change subscription.
///
/// Any corpus mutation simply calls [`StaleFlag::mark`]; the next search
/// rebuilds the whole index. Coarse on purpose: staleness can never drift
/// out of sync with the corpus.
#[derive(Debug, Clone, Default)]
pub struct StaleFlag(Arc<AtomicBool>);

impl StaleFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the index stale. Called by the host on any item/file mutation.
    pub fn mark(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stale(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }
}

/// The host document store the index is built from.
pub trait DocumentStore {
    type Record: Record;

    /// Enumerate every searchable library/collection scope.
    fn list_scopes(&self) -> PaletteResult<Vec<Scope>>;

    /// Enumerate the records in one scope. Individual record fields may still
    /// be lazy; see [`Record::field`].
    fn list_records(&self, scope: &Scope) -> PaletteResult<Vec<Self::Record>>;

    /// Look up a single record by id.
    fn get_record(&self, id: i64) -> PaletteResult<Option<Self::Record>>;

    /// Register a coarse-grained change subscription. The store must call
    /// `flag.mark()` whenever anything in the corpus changes; no diff payload
    /// is required.
    fn subscribe_changes(&self, flag: StaleFlag) -> PaletteResult<()>;
}

/// Resolves the library scope the user is currently working in, used only
/// for the active-scope ranking boost.
pub trait ActiveScopeResolver {
    fn active_scope_id(&self, window: &crate::commands::WindowInfo) -> Option<i64>;
}

/// Capability interface for "which attachment opens this item".
///
/// Hosts expose this under differently-named methods; the adapter layer
/// normalizes whichever variant exists into this single call.
pub trait AttachmentResolver {
    /// Best openable attachment for a parent item, if any.
    fn best_attachment(&self, parent_id: i64) -> PaletteResult<Option<i64>>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_flag_take_clears() {
        let flag = StaleFlag::new();
        assert!(!flag.is_stale());

        flag.mark();
        assert!(flag.is_stale());
        assert!(flag.take());
        assert!(!flag.is_stale());
        assert!(!flag.take());
    }

    #[test]
    fn stale_flag_clones_share_state() {
        let flag = StaleFlag::new();
        let handle = flag.clone();

        handle.mark();
        assert!(flag.is_stale());
    }
}
