// HTTP server module
// JSON API over the chat engine and the plan/settings store

use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::chat::{ChatEngine, ChatRequest, ChatResponse};
use crate::config::Config;
use crate::database::{
    BotSettings, Currency, Database, Insurance, InsuranceUpdate, NewInsurance, Region,
    SettingsUpdate,
};
use crate::embeddings::Embedder;
use crate::embeddings::openai::OpenAiEmbeddingClient;
use crate::llm::LlmClient;
use crate::retrieval::{RetrievalService, VectorIndexClient};
use crate::{Result as TripsureResult, TripsureError};

pub struct AppState {
    pub engine: ChatEngine,
    pub database: Database,
}

/// Error wrapper that maps our taxonomy onto HTTP statuses. Validation
/// failures are 400, missing records 404, everything else a 500 with the
/// error message in the body.
pub struct ApiError(TripsureError);

impl From<TripsureError> for ApiError {
    fn from(error: TripsureError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            TripsureError::Validation { .. } => StatusCode::BAD_REQUEST,
            TripsureError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    locale: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateInsurancePayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price_per_day: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    amount_covered: Option<f64>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateInsurancePayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    price_per_day: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    amount_covered: Option<f64>,
    #[serde(default)]
    region: Option<String>,
}

fn require_string(field: &'static str, value: Option<String>) -> TripsureResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(TripsureError::validation(field, "is required")),
    }
}

fn require_positive(field: &'static str, value: Option<f64>) -> TripsureResult<f64> {
    match value {
        Some(value) if value > 0.0 => Ok(value),
        Some(_) => Err(TripsureError::validation(field, "must be greater than 0")),
        None => Err(TripsureError::validation(field, "is required")),
    }
}

fn parse_currency(value: &str) -> TripsureResult<Currency> {
    match value {
        "EUR" => Ok(Currency::Eur),
        "USD" => Ok(Currency::Usd),
        _ => Err(TripsureError::validation(
            "currency",
            "must be one of EUR, USD",
        )),
    }
}

fn parse_region(value: &str) -> TripsureResult<Region> {
    match value {
        "Europe" => Ok(Region::Europe),
        "Worldwide" => Ok(Region::Worldwide),
        "Latin America" => Ok(Region::LatinAmerica),
        _ => Err(TripsureError::validation(
            "region",
            "must be one of Europe, Worldwide, Latin America",
        )),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = require_string("message", payload.message)?;

    let response = state
        .engine
        .handle_turn(ChatRequest {
            message,
            conversation_id: payload.conversation_id,
            locale: payload.locale,
        })
        .await?;

    Ok(Json(response))
}

async fn create_insurance(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateInsurancePayload>,
) -> Result<(StatusCode, Json<Insurance>), ApiError> {
    let new_insurance = NewInsurance {
        name: require_string("name", payload.name)?,
        description: require_string("description", payload.description)?,
        price_per_day: require_positive("pricePerDay", payload.price_per_day)?,
        currency: parse_currency(&require_string("currency", payload.currency)?)?,
        amount_covered: require_positive("amountCovered", payload.amount_covered)?,
        region: parse_region(&require_string("region", payload.region)?)?,
    };

    let created = state
        .database
        .create_insurance(new_insurance)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_insurance(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateInsurancePayload>,
) -> Result<Json<Insurance>, ApiError> {
    let id = require_string("id", payload.id)?;

    let update = InsuranceUpdate {
        name: payload.name,
        description: payload.description,
        price_per_day: payload
            .price_per_day
            .map(|value| require_positive("pricePerDay", Some(value)))
            .transpose()?,
        currency: payload
            .currency
            .as_deref()
            .map(parse_currency)
            .transpose()?,
        amount_covered: payload
            .amount_covered
            .map(|value| require_positive("amountCovered", Some(value)))
            .transpose()?,
        region: payload.region.as_deref().map(parse_region).transpose()?,
    };

    if update.is_empty() {
        return Err(TripsureError::validation(
            "update",
            "must include at least one mutable field",
        )
        .into());
    }

    let updated = state
        .database
        .update_insurance(&id, update)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?
        .ok_or_else(|| TripsureError::NotFound(format!("insurance {id}")))?;

    Ok(Json(updated))
}

async fn list_insurances(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Insurance>>, ApiError> {
    let plans = state
        .database
        .list_insurances()
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;
    Ok(Json(plans))
}

async fn get_insurance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Insurance>, ApiError> {
    let plan = state
        .database
        .get_insurance(&id)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?
        .ok_or_else(|| TripsureError::NotFound(format!("insurance {id}")))?;
    Ok(Json(plan))
}

async fn delete_insurance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .database
        .delete_insurance(&id)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(TripsureError::NotFound(format!("insurance {id}")).into())
    }
}

async fn get_settings(State(state): State<Arc<AppState>>) -> Json<BotSettings> {
    Json(state.database.settings_with_defaults().await)
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<BotSettings>, ApiError> {
    if let Some(temperature) = update.temperature {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(
                TripsureError::validation("temperature", "must be between 0.0 and 1.0").into(),
            );
        }
    }

    let settings = state
        .database
        .update_settings(update)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;
    Ok(Json(settings))
}

/// Build the full API router over shared state. Unknown methods on known
/// paths get 405 from the method routers.
#[inline]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route(
            "/insurances",
            post(create_insurance)
                .get(list_insurances)
                .put(update_insurance)
                .patch(update_insurance),
        )
        .route(
            "/insurances/:id",
            get(get_insurance).delete(delete_insurance),
        )
        .route("/settings", get(get_settings).put(put_settings))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the full service stack from config and serve it until shutdown.
pub async fn serve(config: Config) -> TripsureResult<()> {
    let database = Database::initialize_from_config_dir(&config.base_dir)
        .await
        .map_err(|e| TripsureError::Database(format!("{e:#}")))?;

    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAiEmbeddingClient::new(&config.embeddings)
            .map_err(|e| TripsureError::Embedding(format!("{e:#}")))?,
    );
    let llm =
        LlmClient::new(&config.llm).map_err(|e| TripsureError::Llm(format!("{e:#}")))?;
    let remote = VectorIndexClient::from_config(&config.vector_index)
        .map_err(|e| TripsureError::Retrieval(format!("{e:#}")))?;
    if remote.is_some() {
        info!("Remote vector index enabled: {}", config.vector_index.endpoint);
    } else {
        info!("No remote vector index configured, local fallback only");
    }

    let retrieval = RetrievalService::new(remote, Some(embedder.clone()), database.clone());
    let engine = ChatEngine::new(
        llm,
        embedder,
        retrieval,
        database.clone(),
        config.vector_index.neighbor_count as usize,
    );

    let state = Arc::new(AppState { engine, database });
    let bind_address = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))
        .map_err(TripsureError::Other)?;
    info!("Listening on {bind_address}");

    axum::serve(listener, router(state))
        .await
        .context("Server error")
        .map_err(TripsureError::Other)?;

    Ok(())
}
