//! Chat-completion API adapter
//!
//! One request, one reply. Retry and backoff are the caller's problem; the
//! UI simply reports a failed send.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat model to use
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// API base URL
const API_BASE_URL: &str = "https://api.openai.com/v1";

/// Coaching persona sent as the system message
const SYSTEM_PROMPT: &str = "You are a supportive communication coach. Give short, \
concrete advice that helps the user speak more clearly and confidently.";

/// Reply length cap
const MAX_TOKENS: u32 = 1000;

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Running transcript of a coaching conversation.
///
/// The system prompt is not part of the transcript; the client prepends it
/// on every request.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append a completed user/assistant exchange.
    pub fn record_exchange(&mut self, user: impl Into<String>, reply: impl Into<String>) {
        self.messages.push(ChatMessage::new(Role::User, user));
        self.messages.push(ChatMessage::new(Role::Assistant, reply));
    }
}

// Request/response types for the chat-completions API

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Errors from the chat layer
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat API key not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Network(String),

    #[error("chat API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse chat API response: {0}")]
    Parse(String),

    #[error("chat API returned no reply")]
    EmptyReply,
}

/// Client for the coach chat.
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    /// Create a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create a client from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ChatError> {
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(Self::new(key)),
            _ => Err(ChatError::MissingApiKey),
        }
    }

    /// Override the API base URL (tests, self-hosted gateways).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn assemble(&self, conversation: &Conversation, message: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(conversation.messages().len() + 2);
        messages.push(ChatMessage::new(Role::System, SYSTEM_PROMPT));
        messages.extend_from_slice(conversation.messages());
        messages.push(ChatMessage::new(Role::User, message));
        messages
    }

    /// Send `message` in the context of `conversation`, returning the
    /// assistant's reply.
    pub async fn send(
        &self,
        conversation: &Conversation,
        message: &str,
    ) -> Result<String, ChatError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: self.assemble(conversation, message),
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ChatError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(ChatError::EmptyReply)
    }
}
