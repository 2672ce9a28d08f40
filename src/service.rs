//! Search service.
//!
//! Owns the index lifecycle (staleness flag, TTL, wholesale rebuilds), runs
//! parsed queries against the cached entries with filters + fuzzy score +
//! boosts, and keeps the per-window session state that feeds the recency
//! view and the ranking boosts. One instance per window; nothing is shared
//! across windows.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::PaletteResult;
use crate::fuzzy;
use crate::index::{self, EntryKind, IndexEntry};
use crate::query::{self, ParsedInput};
use crate::session::SessionState;
use crate::store::{ActiveScopeResolver, AttachmentResolver, DocumentStore, StaleFlag};
use crate::commands::WindowInfo;

/// One ranked search hit. Constructed fresh per search call, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    #[serde(flatten)]
    pub entry: IndexEntry,
    pub score: f64,
}

/// What a raw input string resolved to.
#[derive(Debug)]
pub enum SearchOutcome {
    /// Ranked document results.
    Results(Vec<ScoredResult>),
    /// The input started with `>`; route this text to the command registry.
    CommandQuery(String),
}

/// What the action layer should open for a selected result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTarget {
    Item(i64),
    Attachment(i64),
}

pub struct SearchService<S: DocumentStore, R: ActiveScopeResolver> {
    store: S,
    scopes: R,
    config: Config,
    entries: Vec<IndexEntry>,
    built_at: Option<Instant>,
    stale: StaleFlag,
    session: SessionState,
}

impl<S: DocumentStore, R: ActiveScopeResolver> SearchService<S, R> {
    /// Create a service and register its staleness flag with the store's
    /// change subscription. The index itself is built lazily on first use
    /// (or eagerly via [`SearchService::warm_index`]).
    pub fn new(store: S, scopes: R, config: Config) -> PaletteResult<Self> {
        let stale = StaleFlag::new();
        store.subscribe_changes(stale.clone())?;

        let session = SessionState::new(config.session.recent_cap, config.session.history_cap);

        Ok(Self {
            store,
            scopes,
            config,
            entries: Vec::new(),
            built_at: None,
            stale,
            session,
        })
    }

    /// Pre-pay the index build cost outside the keystroke path.
    pub fn warm_index(&mut self) -> PaletteResult<()> {
        self.ensure_fresh()
    }

    /// Force a rebuild on next use without waiting for a store notification.
    pub fn mark_stale(&self) {
        self.stale.mark();
    }

    /// Execute one palette input string.
    ///
    /// Command-mode inputs are not searched here; the caller routes the
    /// returned text to its [`CommandRegistry`](crate::commands::CommandRegistry).
    /// An empty query with no filters yields the recency view.
    pub fn search(
        &mut self,
        raw: &str,
        window: &WindowInfo,
        limit: usize,
    ) -> PaletteResult<SearchOutcome> {
        let parsed = match query::parse(raw) {
            ParsedInput::Command(text) => return Ok(SearchOutcome::CommandQuery(text)),
            ParsedInput::Query(q) => q,
        };

        self.ensure_fresh()?;

        if parsed.text.is_empty() && parsed.filters.is_empty() {
            return Ok(SearchOutcome::Results(self.recent_view(limit)));
        }

        let text = fuzzy::normalize(&parsed.text);
        let active_scope = self.scopes.active_scope_id(window);
        let ranking = &self.config.ranking;

        let mut results: Vec<ScoredResult> = Vec::new();
        for entry in &self.entries {
            if !parsed.filters.matches(entry) {
                continue;
            }

            let base = if text.is_empty() {
                // Filters-only query: everything ties and boosts decide.
                ranking.filter_match_score
            } else {
                let score = fuzzy::score_normalized(&text, &entry.search_text);
                if score < 0 {
                    continue;
                }
                score as f64
            };

            let frequency = self.session.usage_count(entry.id) as f64 * ranking.frequency_weight;
            let recency = ranking.recency_boost(self.session.activation_rank(entry.id));
            let scope = if active_scope == Some(entry.library_id) {
                ranking.active_scope_bonus
            } else {
                0.0
            };

            results.push(ScoredResult {
                entry: entry.clone(),
                score: base + frequency + recency + scope,
            });
        }

        // Stable sort: ties keep index iteration order.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(SearchOutcome::Results(results))
    }

    /// The "no query" view: recently opened items and recently closed
    /// attachments, most recent first, limited to entries still present in
    /// the current index generation.
    fn recent_view(&self, limit: usize) -> Vec<ScoredResult> {
        let mut seen: Vec<i64> = Vec::new();
        let ids = self
            .session
            .recent_items()
            .iter()
            .chain(self.session.recent_closed_attachments().iter());

        let mut results = Vec::new();
        for &id in ids {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);

            if let Some(entry) = self.entries.iter().find(|e| e.id == id) {
                results.push(entry.clone());
            }
        }

        let count = results.len();
        results
            .into_iter()
            .enumerate()
            .take(limit)
            .map(|(i, entry)| ScoredResult {
                entry,
                score: (count - i) as f64,
            })
            .collect()
    }

    /// Record that a result was opened (frequency + recency signal).
    pub fn record_open(&mut self, id: i64) {
        self.session.record_open(id);
    }

    /// Record that an attachment tab was closed.
    pub fn record_closed_attachment(&mut self, id: i64) {
        self.session.record_closed_attachment(id);
    }

    /// Record a committed search string into the per-window history.
    pub fn record_search(&mut self, raw: &str) {
        self.session.record_search(raw);
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Stamp a new keystroke. Pair with [`SearchService::is_current`] to
    /// discard results of superseded searches (last keystroke wins).
    pub fn begin_search(&mut self) -> u64 {
        self.session.next_generation()
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.session.is_current(token)
    }

    /// Map a selected result to what the action layer should open: an
    /// attachment opens itself, a regular item opens its best attachment
    /// when the host knows one.
    pub fn resolve_open_target(
        &self,
        id: i64,
        attachments: &dyn AttachmentResolver,
    ) -> PaletteResult<Option<OpenTarget>> {
        let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
            return Ok(None);
        };

        let target = match entry.kind {
            EntryKind::Attachment => OpenTarget::Attachment(entry.id),
            EntryKind::Item => match attachments.best_attachment(entry.id)? {
                Some(attachment) => OpenTarget::Attachment(attachment),
                None => OpenTarget::Item(entry.id),
            },
        };
        Ok(Some(target))
    }

    fn ensure_fresh(&mut self) -> PaletteResult<()> {
        let ttl = Duration::from_secs(self.config.index.ttl_secs);
        let expired = self.built_at.map_or(true, |t| t.elapsed() >= ttl);

        if self.stale.take() || expired {
            debug!(expired, "rebuilding index");
            self.entries = index::build_index(&self.store, self.config.index.snippet_len)?;
            self.built_at = Some(Instant::now());
        }

        Ok(())
    }

    #[cfg(test)]
    fn age_index(&mut self, by: Duration) {
        self.built_at = self.built_at.map(|t| t - by);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{MemRecord, MemStore};
    use crate::store::{LibraryKind, Scope};
    use std::collections::HashMap;

    struct FixedScope(Option<i64>);

    impl ActiveScopeResolver for FixedScope {
        fn active_scope_id(&self, _window: &WindowInfo) -> Option<i64> {
            self.0
        }
    }

    struct BestAttachments(HashMap<i64, i64>);

    impl AttachmentResolver for BestAttachments {
        fn best_attachment(&self, parent_id: i64) -> PaletteResult<Option<i64>> {
            Ok(self.0.get(&parent_id).copied())
        }
    }

    fn service(store: MemStore) -> SearchService<MemStore, FixedScope> {
        SearchService::new(store, FixedScope(None), Config::default()).unwrap()
    }

    fn results(outcome: SearchOutcome) -> Vec<ScoredResult> {
        match outcome {
            SearchOutcome::Results(r) => r,
            other => panic!("expected results, got {:?}", other),
        }
    }

    fn ids(results: &[ScoredResult]) -> Vec<i64> {
        results.iter().map(|r| r.entry.id).collect()
    }

    fn window() -> WindowInfo {
        WindowInfo::default()
    }

    /// Opt-in log output for debugging test failures:
    /// `RUST_LOG=quickref=debug cargo test`.
    fn trace_init() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn tagged_corpus() -> MemStore {
        MemStore::new(vec![
            MemRecord::item(1, "Paper One").with_tags(&["ai"]),
            MemRecord::item(2, "Paper Two").with_tags(&["ai", "ml"]),
            MemRecord::item(3, "Paper Three").with_tags(&["ml"]),
        ])
    }

    #[test]
    fn free_text_ranks_by_fuzzy_score() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Deep Learning"),
            MemRecord::item(2, "Deep Reinforcement Learning Methods and Applications"),
            MemRecord::item(3, "Cooking for Two"),
        ]);
        let mut svc = service(store);

        let found = results(svc.search("deep learning", &window(), 10).unwrap());
        assert_eq!(ids(&found), vec![1, 2]);
        assert!(found[0].score > found[1].score);
    }

    #[test]
    fn tag_filters_use_and_semantics() {
        let mut svc = service(tagged_corpus());

        let found = results(svc.search("tag:ai tag:ml", &window(), 10).unwrap());
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn year_range_is_inclusive() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Old").with_date("2019-05-01"),
            MemRecord::item(2, "Mid").with_date("2020"),
            MemRecord::item(3, "New").with_date("2021-12"),
            MemRecord::item(4, "Undated"),
        ]);
        let mut svc = service(store);

        let found = results(svc.search("year:2019-2020", &window(), 10).unwrap());
        let mut found_ids = ids(&found);
        found_ids.sort_unstable();
        assert_eq!(found_ids, vec![1, 2]);
    }

    #[test]
    fn type_filter_restricts_results() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "A Paper"),
            MemRecord::note(2, "a note about papers"),
        ]);
        let mut svc = service(store);

        let found = results(svc.search("type:note paper", &window(), 10).unwrap());
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn empty_query_returns_recents_not_corpus() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "First"),
            MemRecord::item(2, "Second"),
            MemRecord::item(3, "Third"),
        ]);
        let mut svc = service(store);
        svc.warm_index().unwrap();

        svc.record_open(2);
        svc.record_open(3);

        let found = results(svc.search("", &window(), 20).unwrap());
        // Most recent first; untouched corpus entries do not appear.
        assert_eq!(ids(&found), vec![3, 2]);
        assert!(found[0].score > found[1].score);
    }

    #[test]
    fn recents_include_closed_attachments_without_duplicates() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Paper"),
            MemRecord::pdf(2, 1, "paper.pdf"),
        ]);
        let mut svc = service(store);
        svc.warm_index().unwrap();

        svc.record_open(2);
        svc.record_closed_attachment(2);

        let found = results(svc.search("", &window(), 20).unwrap());
        assert_eq!(ids(&found), vec![2]);
    }

    #[test]
    fn frequency_boost_reorders_equal_matches() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Survey of Topic"),
            MemRecord::item(2, "Survey of Topic"),
        ]);
        let mut svc = service(store);
        svc.warm_index().unwrap();
        svc.record_open(2);

        let found = results(svc.search("survey", &window(), 10).unwrap());
        assert_eq!(ids(&found), vec![2, 1]);
    }

    #[test]
    fn active_scope_boost_prefers_current_library() {
        let store = MemStore::new(vec![MemRecord::item(1, "Shared Title")]);
        store.add_scope(Scope {
            library_id: 2,
            kind: LibraryKind::Group,
            name: "Lab Group".to_string(),
        });
        store.push(MemRecord {
            library_id: 2,
            group_library: true,
            ..MemRecord::item(2, "Shared Title")
        });

        let mut svc =
            SearchService::new(store, FixedScope(Some(2)), Config::default()).unwrap();

        let found = results(svc.search("shared", &window(), 10).unwrap());
        assert_eq!(ids(&found), vec![2, 1]);
    }

    #[test]
    fn filters_only_query_falls_back_to_boost_order() {
        let mut svc = service(tagged_corpus());
        svc.warm_index().unwrap();
        svc.record_open(3);

        let found = results(svc.search("tag:ml", &window(), 10).unwrap());
        assert_eq!(ids(&found), vec![3, 2]);
    }

    #[test]
    fn change_notification_triggers_rebuild() {
        trace_init();
        let store = MemStore::new(vec![MemRecord::item(1, "Original")]);
        let mut svc = service(store.clone());

        let found = results(svc.search("original", &window(), 10).unwrap());
        assert_eq!(found.len(), 1);

        store.push(MemRecord::item(2, "Original Follow-up"));
        let found = results(svc.search("original", &window(), 10).unwrap());
        assert_eq!(found.len(), 1, "no notification yet, index still cached");

        store.touch();
        let found = results(svc.search("original", &window(), 10).unwrap());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn mark_stale_forces_rebuild_without_notification() {
        let store = MemStore::new(vec![MemRecord::item(1, "Original")]);
        let mut svc = service(store.clone());
        svc.warm_index().unwrap();

        store.push(MemRecord::item(2, "Original Two"));
        svc.mark_stale();

        let found = results(svc.search("original", &window(), 10).unwrap());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn committed_searches_land_in_history() {
        let mut svc = service(MemStore::new(vec![MemRecord::item(1, "Paper")]));

        svc.record_search("transformers");
        svc.record_search("tag:ai");
        svc.record_search("transformers");

        assert_eq!(svc.session().recent_searches(), &["transformers", "tag:ai"]);
    }

    #[test]
    fn ttl_expiry_triggers_rebuild() {
        let store = MemStore::new(vec![MemRecord::item(1, "Original")]);
        let mut svc = service(store.clone());
        svc.warm_index().unwrap();

        store.push(MemRecord::item(2, "Original Two"));
        svc.age_index(Duration::from_secs(301));

        let found = results(svc.search("original", &window(), 10).unwrap());
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn stale_search_generation_is_discarded() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "Alpha"),
            MemRecord::item(2, "Beta"),
        ]);
        let mut svc = service(store);

        let mut rendered: Option<Vec<i64>> = None;

        // Keystroke A, then keystroke B supersedes it.
        let token_a = svc.begin_search();
        let token_b = svc.begin_search();

        // B resolves first and renders.
        let found_b = results(svc.search("beta", &window(), 10).unwrap());
        if svc.is_current(token_b) {
            rendered = Some(ids(&found_b));
        }

        // A resolves late; its token is no longer current so it must not
        // overwrite B's results.
        let found_a = results(svc.search("alpha", &window(), 10).unwrap());
        if svc.is_current(token_a) {
            rendered = Some(ids(&found_a));
        }

        assert_eq!(rendered, Some(vec![2]));
    }

    #[test]
    fn command_mode_is_routed_not_searched() {
        let mut svc = service(MemStore::new(vec![MemRecord::item(1, "Paper")]));

        match svc.search("> new note", &window(), 10).unwrap() {
            SearchOutcome::CommandQuery(text) => assert_eq!(text, "new note"),
            other => panic!("expected command query, got {:?}", other),
        }
    }

    #[test]
    fn resolve_open_target_routes_items_through_best_attachment() {
        let store = MemStore::new(vec![
            MemRecord::item(1, "No Attachment"),
            MemRecord::item(2, "Has Attachment"),
            MemRecord::note(3, "standalone note"),
        ]);
        let mut svc = service(store);
        svc.warm_index().unwrap();

        let resolver = BestAttachments(HashMap::from([(2, 99)]));

        assert_eq!(
            svc.resolve_open_target(1, &resolver).unwrap(),
            Some(OpenTarget::Item(1))
        );
        assert_eq!(
            svc.resolve_open_target(2, &resolver).unwrap(),
            Some(OpenTarget::Attachment(99))
        );
        assert_eq!(svc.resolve_open_target(404, &resolver).unwrap(), None);
    }

    #[test]
    fn limit_truncates_ranked_results() {
        let store = MemStore::new(
            (1..=30)
                .map(|i| MemRecord::item(i, &format!("Common Theme {}", i)))
                .collect(),
        );
        let mut svc = service(store);

        let found = results(svc.search("common", &window(), 5).unwrap());
        assert_eq!(found.len(), 5);
    }

    #[test]
    fn scored_results_serialize_for_the_render_layer() {
        let mut svc = service(MemStore::new(vec![
            MemRecord::item(1, "Paper").with_tags(&["ai"]).with_date("2020")
        ]));

        let found = results(svc.search("paper", &window(), 10).unwrap());
        let json = serde_json::to_value(&found[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["resultType"], "item");
        assert_eq!(json["title"], "Paper");
        assert_eq!(json["year"], 2020);
        assert!(json["score"].as_f64().unwrap() > 0.0);
    }
}
