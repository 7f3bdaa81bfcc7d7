//! Configuration loading and management.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sx_core::{PricingTable, SessionStore};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Claude configuration directory; sessions live in its `projects` subdirectory.
    pub claude_dir: PathBuf,
    /// Session files smaller than this are ignored.
    pub min_session_bytes: u64,
    pub default_limit: usize,
    pub per_session_matches: usize,
    pub snippet_width: usize,
    /// Pricing used by `cost` when `--model` is not given.
    pub model: String,
    pub pricing: BTreeMap<String, PricingTable>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("claude_dir", &self.claude_dir)
            .field("min_session_bytes", &self.min_session_bytes)
            .field("model", &self.model)
            .field("pricing", &self.pricing.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            claude_dir: default_claude_dir(),
            min_session_bytes: 1024,
            default_limit: sx_core::discover::DEFAULT_LIMIT,
            per_session_matches: sx_core::search::DEFAULT_PER_SESSION,
            snippet_width: sx_core::search::DEFAULT_SNIPPET_WIDTH,
            model: "sonnet".to_string(),
            pricing: BTreeMap::from([
                ("sonnet".to_string(), PricingTable::SONNET),
                ("opus".to_string(), PricingTable::OPUS),
                ("haiku".to_string(), PricingTable::HAIKU),
            ]),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // SX_CLAUDE_DIR, SX_MIN_SESSION_BYTES, ...
        figment = figment.merge(Env::prefixed("SX_"));

        figment.extract()
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir.join("projects")
    }

    pub fn store(&self) -> SessionStore {
        SessionStore::new(self.projects_dir()).with_min_file_size(self.min_session_bytes)
    }

    /// Pricing for a model name: configured tables first, then built-in presets.
    pub fn pricing_for(&self, model: &str) -> Option<PricingTable> {
        self.pricing
            .get(model)
            .or_else(|| self.pricing.get(&model.to_lowercase()))
            .copied()
            .or_else(|| PricingTable::preset(model))
    }
}

/// `$CLAUDE_CONFIG_DIR`, else `~/.claude`.
fn default_claude_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CLAUDE_CONFIG_DIR").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir().map_or_else(|| PathBuf::from(".claude"), |home| home.join(".claude"))
}

/// Returns the platform-specific config directory for sx.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sx"))
}
