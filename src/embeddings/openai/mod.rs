
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::EmbeddingsConfig;
use crate::embeddings::Embedder;

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingClient {
    base_url: Url,
    model: String,
    batch_size: usize,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    #[inline]
    pub fn new(config: &EmbeddingsConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid embeddings base URL: {}", config.base_url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build embeddings HTTP client")?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size as usize,
            api_key: std::env::var(API_KEY_ENV_VAR).ok(),
            client,
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .base_url
            .join("/v1/embeddings")
            .context("Failed to build embeddings URL")?;

        let mut request = self.client.post(url).json(&EmbedRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Embeddings request failed")?
            .error_for_status()
            .context("Embeddings endpoint returned an error status")?;

        let body: EmbedResponse = response
            .json()
            .await
            .context("Failed to parse embeddings response")?;

        if body.data.len() != texts.len() {
            return Err(anyhow::anyhow!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                body.data.len()
            ));
        }

        // The API tags each vector with its input index; order by it
        // rather than trusting response order.
        let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for datum in body.data {
            let slot = vectors
                .get_mut(datum.index)
                .ok_or_else(|| anyhow::anyhow!("Embedding index {} out of range", datum.index))?;
            *slot = datum.embedding;
        }

        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let batch = self
                .embed_single_batch(chunk)
                .await
                .with_context(|| format!("Failed to process batch of {} texts", chunk.len()))?;
            results.extend(batch);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }
}
