// Retrieval module
// Remote nearest-neighbor lookup with a brute-force local fallback


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::VectorIndexConfig;
use crate::database::Database;
use crate::embeddings::Embedder;
use crate::scoring::cosine_similarity;
use crate::{Result as TripsureResult, TripsureError};

pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Matched plan ids plus the concatenated context block handed to the
/// grounded-answer prompt. `ids` order always matches the block order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalResult {
    pub ids: Vec<String>,
    pub context: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Datapoint {
    pub datapoint_id: String,
    pub feature_vector: Vec<f32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindNeighborsRequest<'a> {
    deployed_index_id: &'a str,
    queries: Vec<NeighborQuery<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NeighborQuery<'a> {
    neighbor_count: usize,
    datapoint: QueryDatapoint<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryDatapoint<'a> {
    feature_vector: &'a [f32],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindNeighborsResponse {
    #[serde(default)]
    nearest_neighbors: Vec<NeighborList>,
}

#[derive(Debug, Deserialize)]
struct NeighborList {
    #[serde(default)]
    neighbors: Vec<Neighbor>,
}

#[derive(Debug, Deserialize)]
struct Neighbor {
    #[serde(default)]
    datapoint: Option<NeighborDatapoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NeighborDatapoint {
    #[serde(default)]
    datapoint_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertDatapointsRequest<'a> {
    datapoints: &'a [Datapoint],
}

/// Thin client for the managed nearest-neighbor index.
#[derive(Debug, Clone)]
pub struct VectorIndexClient {
    endpoint: String,
    deployed_index_id: String,
    client: reqwest::Client,
}

impl VectorIndexClient {
    /// Build a client from config; `None` when no remote endpoint is
    /// configured.
    #[inline]
    pub fn from_config(config: &VectorIndexConfig) -> Result<Option<Self>> {
        if !config.is_remote_enabled() {
            return Ok(None);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build vector index HTTP client")?;

        Ok(Some(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            deployed_index_id: config.deployed_index_id.clone(),
            client,
        }))
    }

    /// Return the ranked neighbor ids for a query vector,
    /// similarity-descending per the remote contract.
    pub async fn find_neighbors(&self, query_vector: &[f32], k: usize) -> Result<Vec<String>> {
        let url = format!("{}:findNeighbors", self.endpoint);
        debug!("Querying remote index for top-{k} neighbors");

        let response = self
            .client
            .post(&url)
            .json(&FindNeighborsRequest {
                deployed_index_id: &self.deployed_index_id,
                queries: vec![NeighborQuery {
                    neighbor_count: k,
                    datapoint: QueryDatapoint {
                        feature_vector: query_vector,
                    },
                }],
            })
            .send()
            .await
            .context("Neighbor lookup request failed")?
            .error_for_status()
            .context("Neighbor lookup returned an error status")?;

        let body: FindNeighborsResponse = response
            .json()
            .await
            .context("Failed to parse neighbor lookup response")?;

        let ids: Vec<String> = body
            .nearest_neighbors
            .into_iter()
            .next()
            .map(|list| list.neighbors)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|n| n.datapoint.and_then(|d| d.datapoint_id))
            .collect();

        debug!("Remote index returned {} neighbors", ids.len());
        Ok(ids)
    }

    /// Upsert candidate embeddings into the remote index (ingest path).
    pub async fn upsert_datapoints(&self, datapoints: &[Datapoint]) -> Result<()> {
        let url = format!("{}:upsertDatapoints", self.endpoint);

        self.client
            .post(&url)
            .json(&UpsertDatapointsRequest { datapoints })
            .send()
            .await
            .context("Datapoint upsert request failed")?
            .error_for_status()
            .context("Datapoint upsert returned an error status")?;

        info!("Upserted {} datapoints to remote index", datapoints.len());
        Ok(())
    }
}

/// Two-tier retrieval: remote index first, brute-force local cosine
/// ranking when the remote is down, unconfigured, or empty-handed.
pub struct RetrievalService {
    remote: Option<VectorIndexClient>,
    embedder: Option<Arc<dyn Embedder>>,
    database: Database,
}

impl RetrievalService {
    #[inline]
    pub fn new(
        remote: Option<VectorIndexClient>,
        embedder: Option<Arc<dyn Embedder>>,
        database: Database,
    ) -> Self {
        Self {
            remote,
            embedder,
            database,
        }
    }

    pub async fn find_with_context(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> TripsureResult<RetrievalResult> {
        if let Some(remote) = &self.remote {
            match remote.find_neighbors(query_vector, k).await {
                Ok(ids) if !ids.is_empty() => return self.context_from_ids(ids).await,
                Ok(_) => info!("Remote index returned no neighbors, using local fallback"),
                Err(e) => warn!("Remote neighbor lookup failed, using local fallback: {e:#}"),
            }
        }

        self.local_fallback(query_vector, k).await
    }

    /// Fetch plan records for the remote-ranked ids, preserving the remote
    /// order. Ids with no backing record are dropped so `ids` and the
    /// context blocks stay in lockstep.
    async fn context_from_ids(&self, ids: Vec<String>) -> TripsureResult<RetrievalResult> {
        let mut matched_ids = Vec::with_capacity(ids.len());
        let mut blocks = Vec::with_capacity(ids.len());

        for id in ids {
            let plan = self
                .database
                .get_insurance(&id)
                .await
                .map_err(|e| TripsureError::Database(format!("{e:#}")))?;
            if let Some(plan) = plan {
                blocks.push(plan.candidate_text());
                matched_ids.push(id);
            } else {
                warn!("Remote index returned unknown plan id {id}");
            }
        }

        Ok(RetrievalResult {
            ids: matched_ids,
            context: blocks.join(CONTEXT_SEPARATOR),
        })
    }

    /// Embed every stored plan and rank by cosine similarity. Stable sort
    /// keeps original candidate order on ties, so batch order never
    /// affects the final top-k.
    async fn local_fallback(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> TripsureResult<RetrievalResult> {
        let embedder = self.embedder.as_ref().ok_or_else(|| {
            TripsureError::Config(
                "Local retrieval fallback requires an embeddings client".to_string(),
            )
        })?;

        let plans = self
            .database
            .list_insurances()
            .await
            .map_err(|e| TripsureError::Database(format!("{e:#}")))?;

        if plans.is_empty() {
            return Ok(RetrievalResult {
                ids: Vec::new(),
                context: String::new(),
            });
        }

        let texts: Vec<String> = plans.iter().map(|p| p.candidate_text()).collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| TripsureError::Embedding(format!("{e:#}")))?;

        let mut scored: Vec<(f32, String, String)> = plans
            .into_iter()
            .zip(texts)
            .zip(vectors)
            .map(|((plan, text), vector)| (cosine_similarity(query_vector, &vector), plan.id, text))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        let mut ids = Vec::with_capacity(scored.len());
        let mut blocks = Vec::with_capacity(scored.len());
        for (_, id, text) in scored {
            ids.push(id);
            blocks.push(text);
        }

        debug!("Local fallback ranked {} candidates", ids.len());
        Ok(RetrievalResult {
            ids,
            context: blocks.join(CONTEXT_SEPARATOR),
        })
    }
}
