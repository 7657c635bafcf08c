// embedding/remote.rs — HTTP client for a sidecar embedding server.
//
// POST {endpoint}/embed with {"model": ..., "input": ...}; the server answers
// {"embedding": [f32; dims]}. The server owns the model; this client only
// enforces the width contract.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::TextEmbedder;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

pub struct RemoteEmbedder {
    http: reqwest::Client,
    url: String,
    model: String,
    dimensions: usize,
}

impl RemoteEmbedder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building embedding HTTP client")?;
        let endpoint = endpoint.into();
        Ok(Self {
            url: format!("{}/embed", endpoint.trim_end_matches('/')),
            http,
            model: model.into(),
            dimensions,
        })
    }
}

#[async_trait]
impl TextEmbedder for RemoteEmbedder {
    fn id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let response = self
            .http
            .post(&self.url)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .context("embedding request failed")?
            .error_for_status()
            .context("embedding server rejected request")?;

        let parsed: EmbedResponse = response
            .json()
            .await
            .context("decoding embedding response")?;
        anyhow::ensure!(
            parsed.embedding.len() == self.dimensions,
            "embedding server returned {} dims, expected {}",
            parsed.embedding.len(),
            self.dimensions
        );
        Ok(parsed.embedding)
    }
}
