#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// HTTP API integration tests driven through the router with tower::oneshot.
// Run with: cargo test --test integration_server

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use tripsure::chat::ChatEngine;
use tripsure::config::{EmbeddingsConfig, LlmConfig};
use tripsure::database::Database;
use tripsure::embeddings::Embedder;
use tripsure::embeddings::openai::OpenAiEmbeddingClient;
use tripsure::llm::LlmClient;
use tripsure::retrieval::RetrievalService;
use tripsure::server::{AppState, router};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_app() -> (TempDir, MockServer, Router, Database) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mock_server = MockServer::start().await;

    let database = Database::initialize_from_config_dir(temp_dir.path())
        .await
        .expect("Failed to initialize database");

    let llm = LlmClient::new(&LlmConfig {
        base_url: mock_server.uri(),
        ..Default::default()
    })
    .expect("Failed to build LLM client")
    .with_api_key("test-key");

    let embedder: Arc<dyn Embedder> = Arc::new(
        OpenAiEmbeddingClient::new(&EmbeddingsConfig {
            base_url: mock_server.uri(),
            ..Default::default()
        })
        .expect("Failed to build embedding client")
        .with_api_key("test-key"),
    );

    let retrieval = RetrievalService::new(None, Some(embedder.clone()), database.clone());
    let engine = ChatEngine::new(llm, embedder, retrieval, database.clone(), 5);
    let state = Arc::new(AppState {
        engine,
        database: database.clone(),
    });

    (temp_dir, mock_server, router(state), database)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

fn valid_plan_body() -> Value {
    json!({
        "name": "Premium",
        "description": "Full medical and cancellation coverage",
        "pricePerDay": 4.5,
        "currency": "EUR",
        "amountCovered": 100000.0,
        "region": "Europe"
    })
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn create_insurance_returns_created_record() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app
        .oneshot(json_request("POST", "/insurances", valid_plan_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert_eq!(body["name"], "Premium");
    assert_eq!(body["pricePerDay"], 4.5);
    assert_eq!(body["currency"], "EUR");
    assert_eq!(body["region"], "Europe");
}

#[tokio::test]
async fn create_insurance_rejects_negative_price() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let mut body = valid_plan_body();
    body["pricePerDay"] = json!(-5);

    let response = app
        .oneshot(json_request("POST", "/insurances", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("pricePerDay"));
}

#[tokio::test]
async fn create_insurance_rejects_unknown_currency_and_region() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let mut body = valid_plan_body();
    body["currency"] = json!("GBP");
    let response = app
        .clone()
        .oneshot(json_request("POST", "/insurances", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        response_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("currency")
    );

    let mut body = valid_plan_body();
    body["region"] = json!("Mars");
    let response = app
        .oneshot(json_request("POST", "/insurances", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        response_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("region")
    );
}

#[tokio::test]
async fn list_and_get_round_trip() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let created = response_json(
        app.clone()
            .oneshot(json_request("POST", "/insurances", valid_plan_body()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app.clone().oneshot(get_request("/insurances")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = response_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_request(&format!("/insurances/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["id"], id.as_str());
}

#[tokio::test]
async fn get_unknown_insurance_returns_not_found() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app
        .oneshot(get_request("/insurances/no-such-id"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_unknown_insurance_returns_not_found() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/insurances",
            json!({"id": "no-such-id", "name": "Renamed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_requires_a_mutable_field() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let created = response_json(
        app.clone()
            .oneshot(json_request("POST", "/insurances", valid_plan_body()))
            .await
            .unwrap(),
    )
    .await;

    let response = app
        .oneshot(json_request(
            "PUT",
            "/insurances",
            json!({"id": created["id"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_updates_single_field() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let created = response_json(
        app.clone()
            .oneshot(json_request("POST", "/insurances", valid_plan_body()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(json_request(
            "PATCH",
            "/insurances",
            json!({"id": id, "pricePerDay": 6.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["pricePerDay"], 6.0);
    assert_eq!(body["name"], "Premium");
}

#[tokio::test]
async fn delete_insurance_then_get_returns_not_found() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let created = response_json(
        app.clone()
            .oneshot(json_request("POST", "/insurances", valid_plan_body()))
            .await
            .unwrap(),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/insurances/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get_request(&format!("/insurances/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_requires_a_message() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app
        .oneshot(json_request("POST", "/chat", json!({"locale": "en"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        response_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("message")
    );
}

#[tokio::test]
async fn chat_rejects_wrong_method() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app.oneshot(get_request("/chat")).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn first_turn_chat_survives_welcome_failure() {
    let (_temp_dir, mock_server, app, _database) = setup_app().await;

    Mock::given(method("POST"))
        .and(path("/v1/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "conv-http-1"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/responses"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/conversations/conv-http-1/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let response = app
        .oneshot(json_request("POST", "/chat", json!({"message": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["conversationId"], "conv-http-1");
    assert!(!body["reply"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn settings_round_trip_with_defaults() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app.clone().oneshot(get_request("/settings")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let defaults = response_json(response).await;
    assert_eq!(defaults["botName"], "Raul");
    assert_eq!(defaults["companyName"], "TravelAssistance");

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/settings",
            json!({"botName": "Mara", "temperature": 0.2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = response_json(response).await;
    assert_eq!(updated["botName"], "Mara");
    assert_eq!(updated["temperature"], 0.2);
    // Untouched fields keep their defaults.
    assert_eq!(updated["companyName"], "TravelAssistance");
}

#[tokio::test]
async fn settings_rejects_out_of_range_temperature() {
    let (_temp_dir, _mock_server, app, _database) = setup_app().await;

    let response = app
        .oneshot(json_request("PUT", "/settings", json!({"temperature": 3.5})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        response_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("temperature")
    );
}
