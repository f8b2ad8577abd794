//! OpenRouter chat-completions backend.

use std::time::Duration;

use async_trait::async_trait;
use emberline_core::{GatewayError, GenerateOutcome, GenerateRequest, ModelBackend, TokenUsage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// HTTP backend speaking the OpenAI-compatible chat completions protocol
/// that OpenRouter exposes.
pub struct OpenRouterBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenRouterBackend {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl ModelBackend for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateOutcome, GatewayError> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(e.to_string())
                } else {
                    GatewayError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        match status.as_u16() {
            200 => {}
            429 => {
                let retry_after_secs = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5);
                return Err(GatewayError::RateLimited { retry_after_secs });
            }
            401 | 403 => return Err(GatewayError::Auth(format!("status {status}"))),
            402 => return Err(GatewayError::QuotaExceeded(format!("status {status}"))),
            code => {
                let message = response.text().await.unwrap_or_default();
                return Err(GatewayError::Api {
                    status_code: code,
                    message,
                });
            }
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                GatewayError::MalformedResponse("response carried no message content".into())
            })?;

        let usage = parsed.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        debug!(model, chars = text.len(), "model call completed");

        Ok(GenerateOutcome {
            text,
            model: model.to_string(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_serializes_as_chat_completion() {
        let body = ChatRequest {
            model: "google/gemini-pro",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 500,
            temperature: 0.7,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "google/gemini-pro");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 500);
    }

    #[test]
    fn response_parses_with_and_without_usage() {
        let with: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"hi"}}],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#,
        )
        .unwrap();
        assert_eq!(with.usage.as_ref().map(|u| u.prompt_tokens), Some(10));
        assert_eq!(with.choices[0].message.content.as_deref(), Some("hi"));

        let without: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"hi"}}]}"#).unwrap();
        assert!(without.usage.is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let backend =
            OpenRouterBackend::new("https://openrouter.ai/api/v1/", "k", Duration::from_secs(5))
                .unwrap();
        assert_eq!(backend.base_url, "https://openrouter.ai/api/v1");
    }
}
