//! Configuration loading and validation.
//!
//! Ranking weights are deliberately configuration rather than contract: the
//! stock values are tuned constants with no deeper derivation, so embedders
//! may override them from a TOML file. Out-of-range values are clamped, not
//! rejected.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::PaletteResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index: IndexConfig,
    pub ranking: RankingConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Seconds before a built index is considered expired even without a
    /// change notification.
    pub ttl_secs: u64,
    /// Character budget for abstract snippets.
    pub snippet_len: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Added per recorded open of a result.
    pub frequency_weight: f64,
    /// Multiplier on the activation-queue position bonus.
    pub recency_weight: f64,
    /// How far down the activation queue the recency boost reaches.
    pub recency_lookback: usize,
    /// Flat bonus for entries in the caller's active library.
    pub active_scope_bonus: f64,
    /// Base score for entries matched by filters alone (no free text), so
    /// they tie and fall back to boost ordering.
    pub filter_match_score: f64,
    /// Added per recorded run of a command.
    pub command_usage_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cap on each recency queue.
    pub recent_cap: usize,
    /// Cap on the search history.
    pub history_cap: usize,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            ranking: RankingConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            snippet_len: crate::index::DEFAULT_SNIPPET_LEN,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            frequency_weight: 3.0,
            recency_weight: 4.0,
            recency_lookback: 10,
            active_scope_bonus: 5.0,
            filter_match_score: 1.0,
            command_usage_weight: 2.0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recent_cap: 20,
            history_cap: 20,
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("quickref")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults if the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        Self::load_or_default(&Self::config_path())
    }

    /// Load from a specific path; missing file means defaults, a broken file
    /// is logged and also means defaults.
    pub fn load_or_default(path: &Path) -> Self {
        let mut config = if path.exists() {
            match Self::load_from(path) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.validate();
        config
    }

    fn load_from(path: &Path) -> PaletteResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Clamp values to acceptable ranges.
    fn validate(&mut self) {
        self.index.ttl_secs = self.index.ttl_secs.clamp(10, 3600);
        self.index.snippet_len = self.index.snippet_len.clamp(20, 1000);

        self.ranking.frequency_weight = self.ranking.frequency_weight.clamp(0.0, 100.0);
        self.ranking.recency_weight = self.ranking.recency_weight.clamp(0.0, 100.0);
        self.ranking.recency_lookback = self.ranking.recency_lookback.clamp(1, 100);
        self.ranking.active_scope_bonus = self.ranking.active_scope_bonus.clamp(0.0, 100.0);
        self.ranking.filter_match_score = self.ranking.filter_match_score.clamp(0.0, 100.0);
        self.ranking.command_usage_weight = self.ranking.command_usage_weight.clamp(0.0, 100.0);

        self.session.recent_cap = self.session.recent_cap.clamp(1, 100);
        self.session.history_cap = self.session.history_cap.clamp(1, 100);
    }
}

impl RankingConfig {
    /// Recency boost for an activation-queue position: decreasing with rank,
    /// zero outside the lookback window.
    pub fn recency_boost(&self, rank: Option<usize>) -> f64 {
        match rank {
            Some(rank) if rank < self.recency_lookback => {
                self.recency_weight * (self.recency_lookback - rank) as f64
            }
            _ => 0.0,
        }
    }
}
