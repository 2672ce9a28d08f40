//! quickref - in-process command-palette search engine for reference
//! libraries.
//!
//! The crate maintains a searchable index over a host document corpus
//! (bibliographic items, notes, file attachments), resolves free-text and
//! structured queries into ranked results, and tracks the usage/recency
//! signals that feed ranking. The host supplies the corpus, the active
//! scope, and command actions through the traits in [`store`]; rendering,
//! keystroke handling and "open" side effects stay outside.
//!
//! # Architecture
//!
//! - [`config`] - configuration loading and ranking weights
//! - [`store`] - host collaborator traits (document store, scope resolver)
//! - [`metadata`] - display-string extraction from raw records
//! - [`index`] - index entries and the two-pass wholesale rebuild
//! - [`fuzzy`] - subsequence scoring with positional bonuses
//! - [`query`] - free text + `type:`/`tag:`/`year:` filters, command mode
//! - [`session`] - per-window recency queues, history, generation tokens
//! - [`service`] - index lifecycle, filtering, boosting, ranking
//! - [`commands`] - declarative command table with context gating
//!
//! # Example
//!
//! ```ignore
//! use quickref::{Config, SearchOutcome, SearchService};
//!
//! let config = Config::load();
//! let mut service = SearchService::new(store, scope_resolver, config)?;
//! service.warm_index()?;
//!
//! match service.search("type:pdf transformer year:>=2019", &window, 20)? {
//!     SearchOutcome::Results(results) => render(results),
//!     SearchOutcome::CommandQuery(text) => render_commands(registry.search(&text, &window, 20)),
//! }
//! ```

pub mod commands;
pub mod config;
pub mod fuzzy;
pub mod index;
pub mod metadata;
pub mod query;
pub mod session;
pub mod store;

mod error;
mod service;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandMatch, CommandRegistry, PaletteContext, WindowInfo};
pub use config::Config;
pub use error::{PaletteError, PaletteResult};
pub use index::{EntryKind, IndexEntry, ResultType};
pub use query::{ParsedInput, ParsedQuery};
pub use service::{OpenTarget, ScoredResult, SearchOutcome, SearchService};
pub use session::SessionState;
pub use store::{
    ActiveScopeResolver, AttachmentResolver, DocumentStore, Record, Scope, StaleFlag,
};
