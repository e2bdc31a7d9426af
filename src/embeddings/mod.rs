// Embeddings module
// Turns candidate texts and retrieval queries into fixed-length vectors

pub mod openai;

use anyhow::Result;
use async_trait::async_trait;

pub use openai::OpenAiEmbeddingClient;

/// Seam between retrieval and whichever embeddings backend is configured.
/// The local retrieval fallback cannot run without one.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, order preserved.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embeddings backend returned no vector"))
    }
}
