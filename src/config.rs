// config.rs — Engine configuration (`[memory]` / `[memory.embedding]` in TOML).
//
// Every field has a default so a missing or partial config file still yields
// a working engine; table names and the over-fetch factor are configuration
// constants, not hard-coded strings the caller depends on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_DB_PATH: &str = "~/.longmem";
const DEFAULT_MODEL: &str = "distilbert-base-nli-stsb-mean-tokens";
const DEFAULT_DIMENSIONS: usize = 768;
const DEFAULT_PROCEDURAL_TABLE: &str = "procedural";
const DEFAULT_EPISODIC_TABLE: &str = "episodic";
const DEFAULT_OVERFETCH: usize = 5;
const DEFAULT_OP_TIMEOUT_MS: u64 = 2_000;

// ─── EmbeddingConfig ──────────────────────────────────────────────────────────

/// Which embedding provider to construct at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProvider {
    /// Deterministic offline token-hash embedder. No model server required.
    Hash,
    /// Sidecar embedding server reached over HTTP.
    Remote,
}

/// Embedding model configuration (`[memory.embedding]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    /// Model identifier. Part of the determinism contract: identical text and
    /// model id must produce identical vectors.
    pub model: String,
    /// Fixed vector width shared by every row of both tables.
    pub dimensions: usize,
    /// Base URL of the sidecar server. Required when `provider = "remote"`.
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Hash,
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            endpoint: None,
        }
    }
}

// ─── MemoryConfig ─────────────────────────────────────────────────────────────

/// Engine configuration (`[memory]` in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Storage root directory. A leading `~/` is expanded against the user's
    /// home directory.
    pub db_path: PathBuf,
    pub embedding: EmbeddingConfig,
    pub procedural_table: String,
    pub episodic_table: String,
    /// Candidate over-fetch factor for the venue cascade: a search for
    /// `limit` results fetches `limit * overfetch` candidates so enough
    /// survive venue filtering.
    pub overfetch: usize,
    /// Per-operation budget in milliseconds. On expiry the operation returns
    /// its sentinel value instead of blocking the decision loop.
    pub op_timeout_ms: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            embedding: EmbeddingConfig::default(),
            procedural_table: DEFAULT_PROCEDURAL_TABLE.to_string(),
            episodic_table: DEFAULT_EPISODIC_TABLE.to_string(),
            overfetch: DEFAULT_OVERFETCH,
            op_timeout_ms: DEFAULT_OP_TIMEOUT_MS,
        }
    }
}

impl MemoryConfig {
    /// Load from a TOML file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Convenience for callers that only care about where the data lives.
    pub fn at(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }

    /// Storage root with `~/` resolved.
    pub(crate) fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    pub(crate) fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

/// Expand a leading `~` or `~/` against the home directory. Paths that do not
/// start with `~`, or a machine without a resolvable home, pass through
/// unchanged (and fail later at directory creation, degrading the engine).
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
