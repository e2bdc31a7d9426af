use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{Config, get_config_dir};
use crate::database::Database;
use crate::embeddings::Embedder;
use crate::embeddings::openai::OpenAiEmbeddingClient;
use crate::retrieval::{Datapoint, VectorIndexClient};
use crate::{Result, TripsureError};

fn load_config() -> Result<Config> {
    let config_dir = get_config_dir().map_err(|e| TripsureError::Config(e.to_string()))?;
    Config::load(config_dir).map_err(|e| TripsureError::Config(format!("{e:#}")))
}

/// Start the HTTP API server.
#[inline]
pub async fn serve() -> Result<()> {
    let config = load_config()?;
    crate::server::serve(config).await
}

/// Embed every stored insurance plan and upsert the vectors into the
/// remote index. Requires a configured index endpoint.
pub async fn ingest() -> Result<()> {
    let config = load_config()?;

    let remote = VectorIndexClient::from_config(&config.vector_index)
        .map_err(|e| TripsureError::Retrieval(format!("{e:#}")))?
        .ok_or_else(|| {
            TripsureError::Config("Ingest requires a remote vector index endpoint".to_string())
        })?;

    let database = Database::initialize_from_config_dir(&config.base_dir)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;
    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAiEmbeddingClient::new(&config.embeddings)
            .map_err(|e| TripsureError::Embedding(format!("{e:#}")))?,
    );

    let plans = database
        .list_insurances()
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;
    if plans.is_empty() {
        warn!("No insurance plans stored, nothing to ingest");
        println!("No insurance plans to ingest.");
        return Ok(());
    }

    info!("Embedding {} insurance plans", plans.len());
    let texts: Vec<String> = plans.iter().map(|p| p.candidate_text()).collect();
    let vectors = embedder
        .embed_batch(&texts)
        .await
        .map_err(|e| TripsureError::Embedding(format!("{e:#}")))?;

    let datapoints: Vec<Datapoint> = plans
        .into_iter()
        .zip(vectors)
        .map(|(plan, feature_vector)| Datapoint {
            datapoint_id: plan.id,
            feature_vector,
        })
        .collect();

    remote
        .upsert_datapoints(&datapoints)
        .await
        .map_err(|e| TripsureError::Retrieval(format!("{e:#}")))?;

    println!("Ingested {} insurance plans into the remote index.", datapoints.len());
    Ok(())
}

/// Print the active configuration, writing the default file first if none
/// exists yet.
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    let rendered = toml::to_string_pretty(&config)
        .context("Failed to render configuration")
        .map_err(TripsureError::Other)?;

    println!("Configuration directory: {}", config.base_dir.display());
    println!("{rendered}");
    Ok(())
}
