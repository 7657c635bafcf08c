// embedding/mod.rs — The external embedding capability, behind a trait.
//
// The engine only ever asks "given text, produce a fixed-length vector"; the
// model itself lives elsewhere. Providers must be deterministic for identical
// input and model id so round-trip tests stay reproducible.

mod hash;
mod pinned;
mod remote;

pub use hash::HashEmbedder;
pub use pinned::PinnedEmbedder;
pub use remote::RemoteEmbedder;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{EmbeddingConfig, EmbeddingProvider};

/// Maps free text to a fixed-dimension float vector.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Model identifier, for logs and the determinism contract.
    fn id(&self) -> &str;

    /// Vector width. Constant for the lifetime of the embedder.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Construct the configured provider.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn TextEmbedder>> {
    if config.dimensions == 0 {
        anyhow::bail!("embedding.dimensions must be non-zero");
    }
    match config.provider {
        EmbeddingProvider::Hash => Ok(Arc::new(HashEmbedder::new(
            config.model.clone(),
            config.dimensions,
        ))),
        EmbeddingProvider::Remote => {
            let endpoint = config
                .endpoint
                .clone()
                .context("embedding.endpoint is required for the remote provider")?;
            Ok(Arc::new(RemoteEmbedder::new(
                endpoint,
                config.model.clone(),
                config.dimensions,
            )?))
        }
    }
}
