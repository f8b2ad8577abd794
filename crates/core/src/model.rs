//! Model abstraction: the seams between the pipeline and the LLM provider.
//!
//! `ModelBackend` is the raw wire-level provider (one HTTP call, no retries).
//! `TextGenerator` is what pipeline components consume: the gateway crate
//! implements it with tier mapping, retry, caching, and budget posting layered
//! on top of a backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// A named quality/cost class of language-model request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheapest tier for short conversational replies.
    Fast,
    /// Default tier for analysis and copy generation.
    #[default]
    Balanced,
    /// Premium tier for long-form report generation.
    HighQuality,
    /// Low-latency tier for micro-insights and social posts.
    Flash,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::HighQuality => "high_quality",
            Self::Flash => "flash",
        }
    }
}

/// A single text-generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub tier: ModelTier,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, tier: ModelTier) -> Self {
        Self {
            prompt: prompt.into(),
            tier,
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Token usage reported by (or estimated for) one completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The raw result of one backend call.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub text: String,
    /// Which model actually responded (may carry a version suffix).
    pub model: String,
    /// Provider-reported usage, if the provider includes it.
    pub usage: Option<TokenUsage>,
}

/// A wire-level LLM backend: one request, one response, no policy.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// A human-readable name for this backend (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Issue a single completion request against a concrete model id.
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateOutcome, GatewayError>;
}

/// The policy-bearing generation seam consumed by the pipeline and voice agent.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> std::result::Result<String, GatewayError>;
}
