//! Client for the external text generation service.
//!
//! The service speaks the OpenAI-compatible chat completions protocol
//! (DeepSeek by default). [`TextGenerator`] is the seam the enrichment
//! pipeline depends on; [`ChatClient`] is the HTTP implementation.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use comparekit_shared::{ComparekitError, ProviderConfig, Result};

/// User-Agent string for generation requests.
const USER_AGENT: &str = concat!("comparekit/", env!("CARGO_PKG_VERSION"));

/// Longest error body echoed back in error messages.
const MAX_ERROR_BODY: usize = 500;

// ---------------------------------------------------------------------------
// Generator seam
// ---------------------------------------------------------------------------

/// A single prompt sent to the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
}

/// Anything that can turn a prompt into generated text.
pub trait TextGenerator: Send + Sync {
    /// Run one generation and return the raw text of the reply.
    fn generate(&self, request: &GenerationRequest) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatClient {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl ChatClient {
    /// Build a client from provider settings and a resolved API key.
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ComparekitError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: completions_url(&config.base_url)?,
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl TextGenerator for ChatClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            stream: false,
        };

        let resp = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ComparekitError::Network(format!("chat request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ComparekitError::Network(format!(
                "chat request failed ({status}): {}",
                truncate(&text, MAX_ERROR_BODY)
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ComparekitError::Network(format!("chat response parse failed: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ComparekitError::Network("chat response had no content".into()))?;

        debug!(chars = content.len(), "received completion");
        Ok(content)
    }
}

/// Resolve `<base>/chat/completions`, keeping any path prefix such as `/v1`.
fn completions_url(base_url: &str) -> Result<Url> {
    let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
        .map_err(|e| ComparekitError::config(format!("invalid provider base_url '{base_url}': {e}")))?;
    base.join("chat/completions")
        .map_err(|e| ComparekitError::config(format!("invalid provider base_url '{base_url}': {e}")))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}…")
    }
}
