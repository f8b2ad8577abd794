//! Error types for the Emberline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Emberline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Channel errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Voice session errors ---
    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the language-model gateway.
///
/// The taxonomy drives retry policy: `is_retryable` variants are retried with
/// backoff, `is_fatal` variants abort immediately and page the operator,
/// everything else fails the single call without retry.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("All attempts exhausted, last error: {0}")]
    Exhausted(String),
}

impl GatewayError {
    /// Whether the retry loop should try this request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Auth and quota failures are never retried and always alert the operator.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::QuotaExceeded(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Source fetch failed for {url}: {reason}")]
    SourceFetch { url: String, reason: String },

    #[error("Trigger discovery failed: {0}")]
    Discovery(String),

    #[error("Contact lookup failed: {0}")]
    Lookup(String),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Order fulfillment failed: {0}")]
    Fulfillment(String),
}

#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Delivery failed to {recipient}: {reason}")]
    DeliveryFailed { recipient: String, reason: String },

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ChannelError {
    /// Transport-level failures are worth a second attempt; the rest are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::DeliveryFailed { .. })
    }
}

#[derive(Debug, Clone, Error)]
pub enum VoiceError {
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Unknown call session: {0}")]
    UnknownSession(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_error_displays_correctly() {
        let err = Error::Gateway(GatewayError::Api {
            status_code: 500,
            message: "Internal Server Error".into(),
        });
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn retryable_classification() {
        assert!(GatewayError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(GatewayError::Timeout("30s".into()).is_retryable());
        assert!(GatewayError::Network("conn refused".into()).is_retryable());
        assert!(!GatewayError::Auth("bad key".into()).is_retryable());
        assert!(!GatewayError::MalformedResponse("not json".into()).is_retryable());
    }

    #[test]
    fn fatal_classification() {
        assert!(GatewayError::Auth("401".into()).is_fatal());
        assert!(GatewayError::QuotaExceeded("402".into()).is_fatal());
        assert!(!GatewayError::Network("flaky".into()).is_fatal());
    }

    #[test]
    fn source_fetch_is_a_plain_leaf_error() {
        let err: Box<dyn std::error::Error> = Box::new(PipelineError::SourceFetch {
            url: "https://news.example/a".into(),
            reason: "connection refused".into(),
        });
        assert!(err.source().is_none());
        assert!(err.to_string().contains("https://news.example/a"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn channel_retryable_classification() {
        assert!(ChannelError::Network("reset".into()).is_retryable());
        assert!(!ChannelError::NotConfigured("smtp".into()).is_retryable());
    }
}
