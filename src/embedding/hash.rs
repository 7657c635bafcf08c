// embedding/hash.rs — Deterministic offline token-hash embedder.
//
// Each lowercase token is hashed (keyed by the model id) into one of the
// `dimensions` buckets with a ±1 sign; the bucket sums are L2-normalized.
// Texts sharing tokens land near each other under cosine distance, which is
// enough signal to run the engine with no model server at all.

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::TextEmbedder;

pub struct HashEmbedder {
    model: String,
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }

    fn token_bucket(&self, token: &str) -> (usize, f32) {
        let mut hasher = Sha256::new();
        hasher.update(self.model.as_bytes());
        hasher.update(b"\x00");
        hasher.update(token.as_bytes());
        let digest = hasher.finalize();

        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(raw) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

#[async_trait]
impl TextEmbedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut acc = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let (bucket, sign) = self.token_bucket(token);
            acc[bucket] += sign;
            tokens += 1;
        }
        if tokens == 0 {
            anyhow::bail!("cannot embed empty text");
        }

        let norm = acc.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut acc {
                *v /= norm;
            }
        }
        Ok(acc)
    }
}
