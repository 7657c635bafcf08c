// engine.rs — MemoryEngine: lifecycle, write path, venue-biased retrieval,
// forensic biopsy.
//
// Fail-soft boundary: a failed lifecycle leaves a degraded engine whose
// operations return sentinel values; a failed individual call logs, returns
// its sentinel, and leaves the engine connected for the next cycle. Nothing
// here panics or propagates an error to the caller.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::MemoryConfig;
use crate::embedding::{self, TextEmbedder};
use crate::error::MemoryError;
use crate::retrieval;
use crate::store::schema::{EpisodicRow, ProceduralRow};
use crate::store::MemoryStore;
use crate::types::{
    AddSopRequest, BiopsyQuery, Checkpoint, EpisodicRecord, RegimeMatch, OUTCOME_NOT_APPLICABLE,
    OUTCOME_UNKNOWN, REGIME_UNKNOWN, VENUE_ALL,
};

/// The tiered long-term memory engine.
///
/// Cheaply cloneable — all clones share the same store handles and embedder,
/// and every operation takes `&self`, so background ingestion tasks and the
/// decision-loop reader can hold clones concurrently.
#[derive(Clone)]
pub struct MemoryEngine {
    inner: Option<Arc<EngineInner>>,
    config: Arc<MemoryConfig>,
}

struct EngineInner {
    store: MemoryStore,
    embedder: Arc<dyn TextEmbedder>,
}

impl MemoryEngine {
    /// Connect with the embedder described by `config.embedding`.
    ///
    /// Never fails: any lifecycle error (storage path, table schema, embedder
    /// construction) yields a disconnected engine whose operations are safe
    /// no-ops, so a broken memory subsystem degrades decision quality rather
    /// than availability.
    pub async fn connect(config: MemoryConfig) -> Self {
        match embedding::from_config(&config.embedding) {
            Ok(embedder) => Self::connect_with(config, embedder).await,
            Err(e) => {
                error!(err = %e, "embedder init failed; running without long-term memory");
                Self {
                    inner: None,
                    config: Arc::new(config),
                }
            }
        }
    }

    /// Connect with a caller-supplied embedder.
    pub async fn connect_with(config: MemoryConfig, embedder: Arc<dyn TextEmbedder>) -> Self {
        let config = Arc::new(config);
        match Self::try_connect(&config, &embedder).await {
            Ok(store) => {
                info!(
                    path = %config.db_path.display(),
                    model = embedder.id(),
                    dims = embedder.dimensions(),
                    "memory engine online"
                );
                Self {
                    inner: Some(Arc::new(EngineInner { store, embedder })),
                    config,
                }
            }
            Err(e) => {
                error!(err = %e, "memory engine init failed; running without long-term memory");
                Self {
                    inner: None,
                    config,
                }
            }
        }
    }

    async fn try_connect(
        config: &MemoryConfig,
        embedder: &Arc<dyn TextEmbedder>,
    ) -> Result<MemoryStore, MemoryError> {
        if embedder.dimensions() != config.embedding.dimensions {
            return Err(MemoryError::EmbeddingWidth {
                model: embedder.id().to_string(),
                expected: config.embedding.dimensions,
                found: embedder.dimensions(),
            });
        }
        MemoryStore::open(&config.expanded_db_path(), config).await
    }

    /// Whether the lifecycle completed. There is no way back to `false` in a
    /// running process; per-operation failures are handled locally.
    pub fn is_connected(&self) -> bool {
        self.inner.is_some()
    }

    /// Store reachability probe.
    pub async fn health_check(&self) -> bool {
        match &self.inner {
            Some(inner) => inner.store.sop_count().await.is_ok(),
            None => false,
        }
    }

    // ─── Write path ───────────────────────────────────────────────────────────

    /// Append one standard operating procedure.
    ///
    /// Embeds the narrative and appends a row; missing optional fields take
    /// the documented defaults. Failures (including a blank narrative) are
    /// logged and swallowed — the caller is never blocked or crashed.
    pub async fn add_procedural(&self, request: AddSopRequest) {
        let Some(inner) = &self.inner else {
            debug!("add_procedural skipped: memory engine disconnected");
            return;
        };
        if let Err(e) = self
            .with_timeout("add_procedural", inner.append_sop(request))
            .await
        {
            warn!(err = %e, "procedural write dropped");
        }
    }

    /// Append one episodic checkpoint (trade, veto, halt).
    ///
    /// Same guarantees as [`add_procedural`](Self::add_procedural); a
    /// checkpoint with neither `vector_text` nor `payload` is a failed write.
    pub async fn add_episodic(&self, checkpoint: Checkpoint) {
        let Some(inner) = &self.inner else {
            debug!("add_episodic skipped: memory engine disconnected");
            return;
        };
        if let Err(e) = self
            .with_timeout("add_episodic", inner.append_event(checkpoint))
            .await
        {
            warn!(err = %e, "episodic write dropped");
        }
    }

    // ─── Read path ────────────────────────────────────────────────────────────

    /// Venue-biased nearest-neighbor retrieval over the procedural table.
    ///
    /// Over-fetches `limit * overfetch` candidates by ascending distance and
    /// runs the venue cascade: exact venue match, then universal (`"ALL"`)
    /// fallback, then closest-any. Returns the no-match sentinel
    /// (`label = None`, distance 999.0) when disconnected, on an empty table,
    /// or on any failure.
    pub async fn find_nearest_regime(
        &self,
        query_text: &str,
        limit: usize,
        venue: &str,
    ) -> RegimeMatch {
        let Some(inner) = &self.inner else {
            return RegimeMatch::none();
        };
        match self
            .with_timeout(
                "find_nearest_regime",
                inner.search_regime(query_text, limit, venue, self.config.overfetch),
            )
            .await
        {
            Ok(found) => found,
            Err(e) => {
                warn!(err = %e, venue, "regime search failed");
                RegimeMatch::none()
            }
        }
    }

    /// [`find_nearest_regime`](Self::find_nearest_regime) with `limit = 1`
    /// and no venue preference.
    pub async fn nearest_regime(&self, query_text: &str) -> RegimeMatch {
        self.find_nearest_regime(query_text, 1, VENUE_ALL).await
    }

    /// Forensic dump of episodic rows: everything in the (inclusive)
    /// timestamp window and/or mentioning the trade id in its payload.
    /// Exhaustive over the filtered set — an audit tool, not a ranked
    /// retrieval. Returns an empty list when disconnected or on any failure.
    pub async fn trade_biopsy(&self, query: BiopsyQuery) -> Vec<EpisodicRecord> {
        let Some(inner) = &self.inner else {
            return Vec::new();
        };
        match self.with_timeout("trade_biopsy", inner.biopsy(query)).await {
            Ok(records) => records,
            Err(e) => {
                warn!(err = %e, "biopsy failed");
                Vec::new()
            }
        }
    }

    // ─── Observability ────────────────────────────────────────────────────────

    /// Procedural row count; 0 when disconnected or on error.
    pub async fn sop_count(&self) -> usize {
        match &self.inner {
            Some(inner) => inner.store.sop_count().await.unwrap_or_else(|e| {
                warn!(err = %e, "sop count failed");
                0
            }),
            None => 0,
        }
    }

    /// Episodic row count; 0 when disconnected or on error.
    pub async fn event_count(&self) -> usize {
        match &self.inner {
            Some(inner) => inner.store.event_count().await.unwrap_or_else(|e| {
                warn!(err = %e, "event count failed");
                0
            }),
            None => 0,
        }
    }

    /// Run `fut` under the configured per-operation budget. Embedding and
    /// store I/O are the only blocking points; on expiry the caller gets the
    /// operation's sentinel instead of a stalled decision cycle.
    async fn with_timeout<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, MemoryError>>,
    ) -> Result<T, MemoryError> {
        let budget = self.config.op_timeout();
        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(MemoryError::Timeout(op, budget)),
        }
    }
}

impl EngineInner {
    async fn append_sop(&self, request: AddSopRequest) -> Result<(), MemoryError> {
        if request.narrative.trim().is_empty() {
            return Err(MemoryError::MissingText("narrative"));
        }
        let vector = self.embed(&request.narrative).await?;
        let row = ProceduralRow {
            timestamp: request.timestamp.unwrap_or_else(|| Utc::now().timestamp()),
            vector,
            regime: request.regime.unwrap_or_else(|| REGIME_UNKNOWN.to_string()),
            narrative: request.narrative,
            venue: request.venue.unwrap_or_else(|| VENUE_ALL.to_string()),
            outcome: request
                .outcome
                .unwrap_or_else(|| OUTCOME_UNKNOWN.to_string()),
        };
        self.store.append_sop(&row).await
    }

    async fn append_event(&self, checkpoint: Checkpoint) -> Result<(), MemoryError> {
        let not_blank = |s: &String| !s.trim().is_empty();
        let source = checkpoint
            .vector_text
            .clone()
            .filter(not_blank)
            .or_else(|| checkpoint.payload.clone().filter(not_blank))
            .ok_or(MemoryError::MissingText("vector_text or payload"))?;

        let vector = self.embed(&source).await?;
        let row = EpisodicRow {
            timestamp: checkpoint
                .timestamp
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            vector,
            kind: checkpoint.kind.unwrap_or_default(),
            payload: checkpoint.payload.unwrap_or_default(),
            outcome: checkpoint
                .outcome
                .unwrap_or_else(|| OUTCOME_NOT_APPLICABLE.to_string()),
            venue: checkpoint.venue.unwrap_or_else(|| VENUE_ALL.to_string()),
            reasoning: source,
        };
        self.store.append_event(&row).await
    }

    async fn search_regime(
        &self,
        query_text: &str,
        limit: usize,
        venue: &str,
        overfetch: usize,
    ) -> Result<RegimeMatch, MemoryError> {
        let vector = self.embed(query_text).await?;
        let fetch = limit.max(1).saturating_mul(overfetch.max(1));
        let hits = self.store.search_sops(&vector, fetch).await?;

        // A small table returning fewer candidates than requested is fine;
        // the cascade operates on whatever came back.
        let Some(hit) = retrieval::select_venue_biased(&hits, venue) else {
            return Ok(RegimeMatch::none());
        };
        Ok(RegimeMatch {
            label: Some(format!("{} ({})", hit.regime, hit.narrative)),
            distance: hit.distance,
        })
    }

    async fn biopsy(&self, query: BiopsyQuery) -> Result<Vec<EpisodicRecord>, MemoryError> {
        let window = match (query.start_ms, query.end_ms) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        };
        let mut records = self.store.scan_events(window).await?;
        if let Some(trade_id) = &query.trade_id {
            records.retain(|r| r.payload.contains(trade_id.as_str()));
        }
        Ok(records)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(MemoryError::Embedding)?;
        if vector.len() != self.store.dims() {
            return Err(MemoryError::EmbeddingWidth {
                model: self.embedder.id().to_string(),
                expected: self.store.dims(),
                found: vector.len(),
            });
        }
        Ok(vector)
    }
}
