//! Command registry.
//!
//! Commands are configuration: a declarative table built once at startup,
//! searched with the same fuzzy scorer as documents, gated per window
//! context and per availability predicate. Run procedures are closures the
//! embedder supplies; the registry never reaches into ambient host globals.

use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use crate::config::RankingConfig;
use crate::error::PaletteResult;
use crate::fuzzy;

/// The kind of window the palette is open in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteContext {
    Main,
    Reader,
    Note,
}

/// Identity markers of the active window, captured by the embedder at
/// keystroke time. Pure data so context detection stays testable.
#[derive(Debug, Clone, Default)]
pub struct WindowInfo {
    /// Host window-type attribute, when one is set (e.g. "main", "reader",
    /// "note").
    pub window_type: Option<String>,
    /// A reader pane/tab is present in the window.
    pub reader_open: bool,
    /// A note editor currently has focus.
    pub note_editor_focused: bool,
    /// Number of items selected in the items pane.
    pub selected_items: usize,
}

/// Classify a window into exactly one context. The window-type attribute
/// wins; otherwise the reader/note globals decide.
pub fn detect_context(window: &WindowInfo) -> PaletteContext {
    match window.window_type.as_deref() {
        Some("note") => PaletteContext::Note,
        Some("reader") => PaletteContext::Reader,
        _ => {
            if window.note_editor_focused {
                PaletteContext::Note
            } else if window.reader_open {
                PaletteContext::Reader
            } else {
                PaletteContext::Main
            }
        }
    }
}

type Availability = Box<dyn Fn(&WindowInfo) -> bool + Send>;
type Action = Box<dyn Fn(&WindowInfo) -> PaletteResult<()> + Send>;

/// One named action. Built once at startup via the builder methods; never
/// mutated afterwards.
pub struct Command {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub keywords: Vec<String>,
    pub contexts: Vec<PaletteContext>,
    pub shortcut: Option<String>,
    pub group: Option<String>,
    availability: Availability,
    action: Action,
}

impl Command {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            subtitle: String::new(),
            keywords: Vec::new(),
            contexts: vec![
                PaletteContext::Main,
                PaletteContext::Reader,
                PaletteContext::Note,
            ],
            shortcut: None,
            group: None,
            availability: Box::new(|_| true),
            action: Box::new(|_| Ok(())),
        }
    }

    pub fn subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = subtitle.to_string();
        self
    }

    pub fn keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn contexts(mut self, contexts: &[PaletteContext]) -> Self {
        self.contexts = contexts.to_vec();
        self
    }

    pub fn shortcut(mut self, shortcut: &str) -> Self {
        self.shortcut = Some(shortcut.to_string());
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Availability predicate, evaluated against live window state on every
    /// search and re-checked at run time.
    pub fn when(mut self, predicate: impl Fn(&WindowInfo) -> bool + Send + 'static) -> Self {
        self.availability = Box::new(predicate);
        self
    }

    /// The side effect this command performs. Must fail atomically; the
    /// registry reports failures as `false` and assumes no partial state.
    pub fn action(
        mut self,
        action: impl Fn(&WindowInfo) -> PaletteResult<()> + Send + 'static,
    ) -> Self {
        self.action = Box::new(action);
        self
    }

    fn is_available(&self, window: &WindowInfo) -> bool {
        self.contexts.contains(&detect_context(window)) && (self.availability)(window)
    }

    /// Haystack the fuzzy scorer sees for this command.
    fn search_text(&self) -> String {
        let mut text = self.title.clone();
        for keyword in &self.keywords {
            text.push(' ');
            text.push_str(keyword);
        }
        fuzzy::normalize(&text)
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("contexts", &self.contexts)
            .finish_non_exhaustive()
    }
}

/// One ranked command search hit.
#[derive(Debug, Clone, Serialize)]
pub struct CommandMatch {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub score: f64,
    pub shortcut: Option<String>,
    pub group: Option<String>,
}

/// The searchable command table plus per-command usage counts.
pub struct CommandRegistry {
    commands: Vec<Command>,
    usage: HashMap<String, u32>,
    usage_weight: f64,
}

impl CommandRegistry {
    pub fn new(ranking: &RankingConfig) -> Self {
        Self {
            commands: Vec::new(),
            usage: HashMap::new(),
            usage_weight: ranking.command_usage_weight,
        }
    }

    pub fn register(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Search available commands. An empty query scores every available
    /// command flat, so usage decides the order.
    pub fn search(&self, query: &str, window: &WindowInfo, limit: usize) -> Vec<CommandMatch> {
        let query = fuzzy::normalize(query);
        let mut matches: Vec<CommandMatch> = Vec::new();

        for command in &self.commands {
            if !command.is_available(window) {
                continue;
            }

            let base = if query.is_empty() {
                1.0
            } else {
                let score = fuzzy::score_normalized(&query, &command.search_text());
                if score < 0 {
                    continue;
                }
                score as f64
            };

            let usage = self.usage.get(&command.id).copied().unwrap_or(0);
            let score = base + usage as f64 * self.usage_weight;

            matches.push(CommandMatch {
                id: command.id.clone(),
                title: command.title.clone(),
                subtitle: command.subtitle.clone(),
                score,
                shortcut: command.shortcut.clone(),
                group: command.group.clone(),
            });
        }

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit);
        matches
    }

    /// Run a command by id. Availability is re-checked first — the selection
    /// may have changed since the search that surfaced the command. Failures
    /// are logged and reported as `false`, never propagated; usage counts
    /// only on success.
    pub fn run(&mut self, id: &str, window: &WindowInfo) -> bool {
        let Some(command) = self.commands.iter().find(|c| c.id == id) else {
            warn!(command = id, "unknown command");
            return false;
        };

        if !command.is_available(window) {
            warn!(command = id, "command no longer available");
            return false;
        }

        match (command.action)(window) {
            Ok(()) => {
                *self.usage.entry(id.to_string()).or_insert(0) += 1;
                true
            }
            Err(e) => {
                warn!(command = id, error = %e, "command failed");
                false
            }
        }
    }

    pub fn usage_count(&self, id: &str) -> u32 {
        self.usage.get(id).copied().unwrap_or(0)
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}
