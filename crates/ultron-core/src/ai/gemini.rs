use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Completer, UNRECOGNIZED_REPLY};
use crate::config::Config;
use crate::context::OutgoingRequest;
use crate::error::CompletionError;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Outcome of decoding a well-formed JSON response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedReply {
    /// First candidate's first text part, trimmed
    Reply(String),
    /// Valid JSON, but no reply text where one was expected
    Unrecognized,
}

/// Decode a response body without trusting its shape.
///
/// Only a body that is not JSON at all is an error.
pub fn parse_reply(body: &str) -> Result<ParsedReply, CompletionError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

    let text = value
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str);

    Ok(match text {
        Some(text) => ParsedReply::Reply(text.trim().to_string()),
        None => ParsedReply::Unrecognized,
    })
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<&str>, model: &str) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key, model)
    }

    pub fn with_endpoint(endpoint: &str, api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_endpoint(
            &config.endpoint(),
            config.resolved_api_key().as_deref(),
            &config.model(),
        )
    }

    /// Replace the underlying HTTP client (proxy or TLS settings)
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    /// One POST to the generation endpoint. No retries, transport default timeout.
    pub async fn query(&self, request: &OutgoingRequest) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let response = self
            .client
            .post(self.url())
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await?;

        // Error bodies are JSON too; they fall through to the unrecognized reply
        let status = response.status();
        if !status.is_success() {
            warn!(%status, model = %self.model, "generation endpoint returned non-success status");
        }

        let body = response.text().await?;
        match parse_reply(&body)? {
            ParsedReply::Reply(text) => {
                debug!(chars = text.len(), "received reply");
                Ok(text)
            }
            ParsedReply::Unrecognized => {
                warn!("response had no candidate text");
                Ok(UNRECOGNIZED_REPLY.to_string())
            }
        }
    }
}

#[async_trait]
impl Completer for GeminiClient {
    fn backend_name(&self) -> &str {
        "Gemini"
    }

    async fn complete(&self, request: &OutgoingRequest) -> Result<String, CompletionError> {
        self.query(request).await
    }
}
