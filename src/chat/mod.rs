// Conversation orchestrator
// One turn in, one reply out. The provider owns conversation history; we
// mirror finished turns locally and keep no per-conversation state here.


use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::{BotSettings, Database, TurnRole};
use crate::embeddings::Embedder;
use crate::llm::ChatMessage;
use crate::llm::openai::LlmClient;
use crate::prompts;
use crate::retrieval::RetrievalService;
use crate::{Result as TripsureResult, TripsureError};

/// Token cap for the classifier call; its JSON payload is small.
pub const CLASSIFIER_MAX_OUTPUT_TOKENS: u32 = 200;

/// Reply used when classification fails outright. The turn still succeeds
/// from the caller's point of view.
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't process that. Could you rephrase your message?";

/// Reply used when the retrieval path produces no usable answer.
pub const FALLBACK_MORE_INFO: &str = "I couldn't find a matching plan yet. \
     Could you tell me your destination region, the coverage amount you need, and your trip type?";

const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: String,
}

/// Classifier verdict for one turn. Exactly one payload is ever populated:
/// `Reply` goes back to the user verbatim, `Query` feeds retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Reply(String),
    Query(String),
}

impl Classification {
    /// Strict parse of the classifier's JSON output. Anything other than
    /// an object with exactly one non-empty `reply` xor `query` string is
    /// rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        let object = match value.as_object() {
            Some(object) => object,
            None => bail!("Classifier output is not a JSON object"),
        };

        let reply = object.get("reply").and_then(|v| v.as_str());
        let query = object.get("query").and_then(|v| v.as_str());

        match (reply, query) {
            (Some(reply), None) if !reply.trim().is_empty() => {
                Ok(Classification::Reply(reply.to_string()))
            }
            (None, Some(query)) if !query.trim().is_empty() => {
                Ok(Classification::Query(query.to_string()))
            }
            (Some(_), Some(_)) => bail!("Classifier output carries both reply and query"),
            _ => bail!("Classifier output carries neither reply nor query"),
        }
    }
}

#[inline]
fn fallback_greeting(company_name: &str) -> String {
    format!("Hi, I'm the assistant of {company_name}. How can I help you today?")
}

/// Drives one conversation turn end to end: welcome on the first turn,
/// classify-then-answer on every later one.
pub struct ChatEngine {
    llm: LlmClient,
    embedder: Arc<dyn Embedder>,
    retrieval: RetrievalService,
    database: Database,
    neighbor_count: usize,
}

impl ChatEngine {
    #[inline]
    pub fn new(
        llm: LlmClient,
        embedder: Arc<dyn Embedder>,
        retrieval: RetrievalService,
        database: Database,
        neighbor_count: usize,
    ) -> Self {
        Self {
            llm,
            embedder,
            retrieval,
            database,
            neighbor_count,
        }
    }

    pub async fn handle_turn(&self, request: ChatRequest) -> TripsureResult<ChatResponse> {
        let locale = request
            .locale
            .as_deref()
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LOCALE);

        match request.conversation_id.as_deref().filter(|id| !id.is_empty()) {
            None => self.first_turn(locale).await,
            Some(conversation_id) => self.next_turn(conversation_id, &request.message).await,
        }
    }

    /// Open a provider conversation and greet the visitor in their locale.
    /// Welcome generation failures degrade to a static greeting; only the
    /// conversation-create call itself can fail the turn.
    async fn first_turn(&self, locale: &str) -> TripsureResult<ChatResponse> {
        let conversation_id = self
            .llm
            .create_conversation()
            .await
            .map_err(|e| TripsureError::Llm(format!("{e:#}")))?;

        let settings = self.database.settings_with_defaults().await;
        let system = prompts::welcome_prompt(
            &settings.bot_name,
            &settings.tone,
            &settings.company_slogan,
            locale,
            prompts::DEFAULT_WELCOME_MAX_CHARS,
        );

        let reply = match self.llm.generate_welcome(&system).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Welcome generation returned empty text, using static greeting");
                fallback_greeting(&settings.company_name)
            }
            Err(e) => {
                warn!("Welcome generation failed, using static greeting: {e:#}");
                fallback_greeting(&settings.company_name)
            }
        };

        self.record_turns(&conversation_id, &[ChatMessage::assistant(&reply)])
            .await;

        Ok(ChatResponse {
            reply,
            conversation_id,
        })
    }

    async fn next_turn(&self, conversation_id: &str, message: &str) -> TripsureResult<ChatResponse> {
        let settings = self.database.settings_with_defaults().await;

        let history = match self.llm.last_messages(conversation_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!("History fetch failed, classifying without history: {e:#}");
                Vec::new()
            }
        };

        let reply = match self.classify(message, &history, &settings).await {
            Some(Classification::Reply(reply)) => reply,
            Some(Classification::Query(query)) => {
                self.answer_from_retrieval(&query, message, &settings)
                    .await?
            }
            None => FALLBACK_REPLY.to_string(),
        };

        self.record_turns(
            conversation_id,
            &[ChatMessage::user(message), ChatMessage::assistant(&reply)],
        )
        .await;

        Ok(ChatResponse {
            reply,
            conversation_id: conversation_id.to_string(),
        })
    }

    /// Classifier invocation plus strict parse. Both kinds of failure
    /// collapse to `None`, which the caller turns into the generic reply.
    async fn classify(
        &self,
        message: &str,
        history: &[ChatMessage],
        settings: &BotSettings,
    ) -> Option<Classification> {
        let system = prompts::classifier_prompt(
            &settings.bot_name,
            &settings.tone,
            &settings.company_slogan,
            &settings.company_industry,
            &settings.company_name,
        );

        let raw = match self
            .llm
            .generate_json(
                &system,
                settings.temperature,
                CLASSIFIER_MAX_OUTPUT_TOKENS,
                message,
                history,
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Classifier call failed: {e:#}");
                return None;
            }
        };

        match Classification::parse(&raw) {
            Ok(classification) => {
                debug!("Classified turn as {classification:?}");
                Some(classification)
            }
            Err(e) => {
                warn!("Classifier output rejected: {e:#}");
                None
            }
        }
    }

    /// Case 3: embed the classifier's query, retrieve matching plans, and
    /// generate an answer grounded in their context. Degrades to the
    /// ask-for-more-info reply whenever the pipeline yields nothing;
    /// configuration errors from retrieval still propagate.
    async fn answer_from_retrieval(
        &self,
        query: &str,
        message: &str,
        settings: &BotSettings,
    ) -> TripsureResult<String> {
        let query_vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                warn!("Query embedding failed: {e:#}");
                return Ok(FALLBACK_MORE_INFO.to_string());
            }
        };

        let result = match self
            .retrieval
            .find_with_context(&query_vector, self.neighbor_count)
            .await
        {
            Ok(result) => result,
            Err(error @ TripsureError::Config(_)) => return Err(error),
            Err(e) => {
                warn!("Retrieval failed: {e:#}");
                return Ok(FALLBACK_MORE_INFO.to_string());
            }
        };

        if result.context.is_empty() {
            debug!("Retrieval produced no context for query");
            return Ok(FALLBACK_MORE_INFO.to_string());
        }

        let persona = prompts::bot_persona(
            &settings.bot_name,
            &settings.tone,
            &settings.company_name,
            &settings.company_industry,
            &settings.company_slogan,
        );
        let system = prompts::grounded_answer_prompt(&persona, &result.context);

        match self
            .llm
            .generate_answer(&system, message, settings.temperature)
            .await
        {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Ok(FALLBACK_MORE_INFO.to_string()),
            Err(e) => {
                warn!("Grounded answer generation failed: {e:#}");
                Ok(FALLBACK_MORE_INFO.to_string())
            }
        }
    }

    /// Append finished turns to the provider conversation and the local
    /// mirror. Write failures are logged, never surfaced; the reply is
    /// already decided by the time we get here.
    async fn record_turns(&self, conversation_id: &str, messages: &[ChatMessage]) {
        if let Err(e) = self.llm.append_messages(conversation_id, messages).await {
            warn!("Failed to append turns to provider conversation: {e:#}");
        }

        for message in messages {
            let role = match message.role {
                crate::llm::Role::User => TurnRole::User,
                crate::llm::Role::Assistant => TurnRole::Assistant,
                crate::llm::Role::System => continue,
            };
            if let Err(e) = self
                .database
                .append_turn(conversation_id, role, &message.content)
                .await
            {
                warn!("Failed to mirror turn locally: {e:#}");
            }
        }
    }
}
