//! OpenAI-compatible chat-completion client
//!
//! Speaks `POST {base_url}/chat/completions` with a bearer key. Works against
//! OpenAI and any gateway exposing the same wire format. Single attempt per
//! call; failures come back as [`CompletionError`].

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{ChatMessage, CompletionClient, CompletionError, CompletionRequest};
use crate::config::LlmConfig;

pub struct OpenAIClient {
    endpoint: String,
    api_key: String,
    client: Client,
}

impl OpenAIClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()?;

        let endpoint = chat_endpoint(&config.base_url);
        tracing::info!(
            endpoint = %endpoint,
            model = %config.model,
            connect_timeout_secs = config.connect_timeout_secs,
            "Creating OpenAI-compatible completion client"
        );

        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        if self.api_key.trim().is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        tracing::debug!(
            endpoint = %self.endpoint,
            model = %request.model,
            max_tokens = request.max_tokens,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let body = request_body(&request);
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::error!(endpoint = %self.endpoint, "Request timed out");
                    CompletionError::Timeout { endpoint: self.endpoint.clone() }
                } else if e.is_connect() {
                    tracing::error!(endpoint = %self.endpoint, error = %e, "Connection failed");
                    CompletionError::Connect {
                        endpoint: self.endpoint.clone(),
                        message: e.to_string(),
                    }
                } else {
                    tracing::error!(endpoint = %self.endpoint, error = %e, "Request failed");
                    CompletionError::Request {
                        endpoint: self.endpoint.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| CompletionError::Request {
            endpoint: self.endpoint.clone(),
            message: format!("failed to read response body: {}", e),
        })?;

        let content = parse_completion(status, &text, &self.endpoint)?;
        tracing::debug!("API response received, {} chars", content.len());
        Ok(content)
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn request_body(request: &CompletionRequest) -> serde_json::Value {
    json!({
        "model": request.model,
        "messages": format_messages(&request.messages),
        "max_tokens": request.max_tokens,
        "stream": false
    })
}

fn format_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect()
}

/// Turn a raw HTTP response into the first choice's text.
fn parse_completion(
    status: StatusCode,
    body: &str,
    endpoint: &str,
) -> Result<String, CompletionError> {
    if !status.is_success() {
        tracing::error!(endpoint = %endpoint, status = %status, error = %body, "API returned error");
        return Err(CompletionError::Api {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    // CDNs and proxies sometimes answer 200 with an HTML error page
    let trimmed = body.trim_start();
    if trimmed.starts_with('<') {
        let preview: String = trimmed.chars().take(200).collect();
        return Err(CompletionError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: format!(
                "returned HTML instead of JSON (HTTP {}), the service may be down: {}",
                status, preview
            ),
        });
    }

    let parsed: OpenAIResponse = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(300).collect();
        CompletionError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: format!("{}. Body: {}", e, preview),
        }
    })?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(CompletionError::EmptyResponse)
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}
