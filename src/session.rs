//! Per-window session state.
//!
//! One value object owns everything the palette remembers for a window:
//! usage counts, the bounded recency queues, search history, and the
//! generation counter used to discard superseded async searches. Nothing
//! here persists across restarts; the state dies with the window.

use std::collections::HashMap;

/// Bounded most-recent-first queues plus usage counters for one window.
#[derive(Debug)]
pub struct SessionState {
    usage_counts: HashMap<i64, u32>,
    recent_items: Vec<i64>,
    recent_closed_attachments: Vec<i64>,
    recent_activated: Vec<i64>,
    recent_searches: Vec<String>,
    generation: u64,
    recent_cap: usize,
    history_cap: usize,
}

impl SessionState {
    pub fn new(recent_cap: usize, history_cap: usize) -> Self {
        Self {
            usage_counts: HashMap::new(),
            recent_items: Vec::new(),
            recent_closed_attachments: Vec::new(),
            recent_activated: Vec::new(),
            recent_searches: Vec::new(),
            generation: 0,
            recent_cap,
            history_cap,
        }
    }

    /// Record that a result was opened: bumps its usage count and promotes
    /// it to the front of the opened and activated queues.
    pub fn record_open(&mut self, id: i64) {
        *self.usage_counts.entry(id).or_insert(0) += 1;
        promote(&mut self.recent_items, id, self.recent_cap);
        promote(&mut self.recent_activated, id, self.recent_cap);
    }

    /// Record that an attachment tab was closed.
    pub fn record_closed_attachment(&mut self, id: i64) {
        promote(&mut self.recent_closed_attachments, id, self.recent_cap);
    }

    /// Record a committed search string. Re-entering a known string moves it
    /// to the front instead of duplicating it; empty strings are ignored.
    pub fn record_search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        self.recent_searches.retain(|q| q != query);
        self.recent_searches.insert(0, query.to_string());
        self.recent_searches.truncate(self.history_cap);
    }

    pub fn usage_count(&self, id: i64) -> u32 {
        self.usage_counts.get(&id).copied().unwrap_or(0)
    }

    /// Position of an id in the activation queue, 0 = most recent.
    pub fn activation_rank(&self, id: i64) -> Option<usize> {
        self.recent_activated.iter().position(|&r| r == id)
    }

    pub fn recent_items(&self) -> &[i64] {
        &self.recent_items
    }

    pub fn recent_closed_attachments(&self) -> &[i64] {
        &self.recent_closed_attachments
    }

    pub fn recent_activated(&self) -> &[i64] {
        &self.recent_activated
    }

    pub fn recent_searches(&self) -> &[String] {
        &self.recent_searches
    }

    /// Advance the search generation and return the new token. Callers stamp
    /// each keystroke's search with this and drop results whose token is no
    /// longer current (last keystroke wins, not last response).
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_current(&self, token: u64) -> bool {
        self.generation == token
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(20, 20)
    }
}

/// Dedup-then-prepend with a size cap.
fn promote(queue: &mut Vec<i64>, id: i64, cap: usize) {
    queue.retain(|&q| q != id);
    queue.insert(0, id);
    queue.truncate(cap);
}
