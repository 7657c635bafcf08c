// embedding/pinned.rs — Fixture embedder with caller-pinned vectors.
//
// Retrieval behavior (the venue cascade in particular) is only testable with
// controlled distances, so tests pin exact text -> vector mappings instead of
// relying on a real model. Unpinned text is an error, which doubles as a
// transient-failure source for fail-soft tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

use super::TextEmbedder;

pub struct PinnedEmbedder {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl PinnedEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
        }
    }

    /// Pin `text` to `vector`. Panics on a width mismatch — pins are built in
    /// test setup where a bad fixture should fail loudly.
    pub fn pin(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        assert_eq!(
            vector.len(),
            self.dimensions,
            "pinned vector width mismatch"
        );
        self.vectors.insert(text.into(), vector);
        self
    }
}

#[async_trait]
impl TextEmbedder for PinnedEmbedder {
    fn id(&self) -> &str {
        "pinned"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no pinned vector for {text:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pinned_text_returns_its_vector() {
        let embedder = PinnedEmbedder::new(3).pin("up", vec![1.0, 0.0, 0.0]);
        assert_eq!(embedder.embed("up").await.unwrap(), vec![1.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn unpinned_text_errors() {
        let embedder = PinnedEmbedder::new(3);
        assert!(embedder.embed("down").await.is_err());
    }
}
