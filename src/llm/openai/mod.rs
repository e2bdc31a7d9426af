
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::LlmConfig;
use crate::embeddings::openai::API_KEY_ENV_VAR;
use crate::llm::{ChatMessage, Role};

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;
const ANSWER_MAX_OUTPUT_TOKENS: u32 = 512;

/// Client for an OpenAI-style Responses API plus its conversation store.
/// The provider owns conversation history; we only hold the id.
#[derive(Debug, Clone)]
pub struct LlmClient {
    base_url: Url,
    chat_model: String,
    welcome_model: String,
    history_limit: u32,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<TextFormatWrapper>,
}

#[derive(Debug, Serialize)]
struct TextFormatWrapper {
    format: TextFormat,
}

#[derive(Debug, Serialize)]
struct TextFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputContent>,
}

#[derive(Debug, Deserialize)]
struct OutputContent {
    #[serde(default)]
    text: Option<String>,
}

impl ResponsesResponse {
    fn into_text(self) -> String {
        if let Some(text) = self.output_text {
            return text;
        }
        self.output
            .into_iter()
            .flat_map(|item| item.content)
            .filter_map(|content| content.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Deserialize)]
struct ConversationResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct AddItemsRequest<'a> {
    items: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    data: Vec<ItemRecord>,
}

#[derive(Debug, Deserialize)]
struct ItemRecord {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Vec<OutputContent>,
}

impl LlmClient {
    #[inline]
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid LLM base URL: {}", config.base_url))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build LLM HTTP client")?;

        Ok(Self {
            base_url,
            chat_model: config.chat_model.clone(),
            welcome_model: config.welcome_model.clone(),
            history_limit: config.history_limit,
            api_key: std::env::var(API_KEY_ENV_VAR).ok(),
            client,
        })
    }

    #[inline]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> Result<reqwest::RequestBuilder> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))?;
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        Ok(builder)
    }

    /// Open a new provider-side conversation and return its id.
    pub async fn create_conversation(&self) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, "/v1/conversations")?
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Conversation create request failed")?
            .error_for_status()
            .context("Conversation create returned an error status")?;

        let body: ConversationResponse = response
            .json()
            .await
            .context("Failed to parse conversation create response")?;

        debug!("Opened conversation {}", body.id);
        Ok(body.id)
    }

    /// Fetch the most recent user/assistant turns of a conversation,
    /// bounded by the configured history limit.
    pub async fn last_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>> {
        let path = format!(
            "/v1/conversations/{conversation_id}/items?limit={}",
            self.history_limit
        );
        let response = self
            .request(reqwest::Method::GET, &path)?
            .send()
            .await
            .context("Conversation items request failed")?
            .error_for_status()
            .context("Conversation items returned an error status")?;

        let body: ItemsResponse = response
            .json()
            .await
            .context("Failed to parse conversation items response")?;

        let messages = body
            .data
            .into_iter()
            .filter_map(|item| {
                let role = match item.role.as_deref() {
                    Some("user") => Role::User,
                    Some("assistant") => Role::Assistant,
                    _ => return None,
                };
                let content = item
                    .content
                    .first()
                    .and_then(|c| c.text.clone())
                    .unwrap_or_default();
                Some(ChatMessage { role, content })
            })
            .collect();

        Ok(messages)
    }

    /// Append finished turns to the provider-side conversation.
    pub async fn append_messages(
        &self,
        conversation_id: &str,
        items: &[ChatMessage],
    ) -> Result<()> {
        let path = format!("/v1/conversations/{conversation_id}/items");
        self.request(reqwest::Method::POST, &path)?
            .json(&AddItemsRequest { items })
            .send()
            .await
            .context("Conversation append request failed")?
            .error_for_status()
            .context("Conversation append returned an error status")?;

        Ok(())
    }

    async fn responses_call(&self, request: &ResponsesRequest<'_>) -> Result<String> {
        let response = self
            .request(reqwest::Method::POST, "/v1/responses")?
            .json(request)
            .send()
            .await
            .context("Generation request failed")?
            .error_for_status()
            .context("Generation returned an error status")?;

        let body: ResponsesResponse = response
            .json()
            .await
            .context("Failed to parse generation response")?;

        Ok(body.into_text())
    }

    /// One-off text generation on the cheap model, used for the welcome
    /// message.
    pub async fn generate_welcome(&self, system: &str) -> Result<String> {
        let input = [ChatMessage::system(system)];
        self.responses_call(&ResponsesRequest {
            model: &self.welcome_model,
            input: &input,
            temperature: None,
            max_output_tokens: None,
            text: None,
        })
        .await
    }

    /// JSON-constrained generation for the turn classifier. Returns the
    /// raw output text; the caller owns parsing and its failure policy.
    pub async fn generate_json(
        &self,
        system: &str,
        temperature: f64,
        max_output_tokens: u32,
        user_input: &str,
        history: &[ChatMessage],
    ) -> Result<String> {
        let mut input = Vec::with_capacity(history.len() + 2);
        input.push(ChatMessage::system(system));
        input.extend_from_slice(history);
        input.push(ChatMessage::user(user_input));

        self.responses_call(&ResponsesRequest {
            model: &self.chat_model,
            input: &input,
            temperature: Some(temperature),
            max_output_tokens: Some(if max_output_tokens == 0 {
                DEFAULT_MAX_OUTPUT_TOKENS
            } else {
                max_output_tokens
            }),
            text: Some(TextFormatWrapper {
                format: TextFormat {
                    kind: "json_object",
                },
            }),
        })
        .await
    }

    /// Free-text generation for the grounded answer after retrieval.
    pub async fn generate_answer(
        &self,
        system: &str,
        user_input: &str,
        temperature: f64,
    ) -> Result<String> {
        let input = [ChatMessage::system(system), ChatMessage::user(user_input)];
        self.responses_call(&ResponsesRequest {
            model: &self.chat_model,
            input: &input,
            temperature: Some(temperature),
            max_output_tokens: Some(ANSWER_MAX_OUTPUT_TOKENS),
            text: None,
        })
        .await
    }
}
