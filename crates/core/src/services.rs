//! Trait seams for external collaborators.
//!
//! The pipeline treats email transport, PDF rendering, contact lookup, social
//! posting, speech synthesis, and operator alerting as black boxes with
//! nullable-result or fail-soft contracts. Production adapters live in the
//! channels crate; tests supply mocks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::error;

use crate::error::{ChannelError, PipelineError, VoiceError};
use crate::types::Report;

/// An outbound email ready for transport.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<PathBuf>,
}

/// Email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> std::result::Result<(), ChannelError>;
}

/// Renders a report to a PDF file at the given path.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, report: &Report, path: &Path) -> std::result::Result<(), PipelineError>;
}

/// Publishes a short post to the configured social platform.
#[async_trait]
pub trait SocialPoster: Send + Sync {
    async fn post(&self, text: &str) -> std::result::Result<(), ChannelError>;
}

/// Text-to-speech. Returns a playable audio URL; callers fall back to the
/// telephony platform's built-in voice on any failure.
#[async_trait]
pub trait SpeechSynth: Send + Sync {
    async fn synthesize(&self, text: &str) -> std::result::Result<String, VoiceError>;
}

/// Operator notification channel. Delivery is best-effort: implementations
/// log failures instead of returning them, so alerting can never take down
/// the path that is already failing.
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn alert(&self, message: &str);
}

/// Fallback alerter that writes to the error log.
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn alert(&self, message: &str) {
        error!(alert = %message, "Operator alert");
    }
}

/// Result of a contact-enrichment lookup. Every field may legitimately be
/// absent; "not found" is not an error.
#[derive(Debug, Clone, Default)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
    pub activity_summary: Option<String>,
}

/// Contact-enrichment lookup for a company and optional role hint.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    async fn lookup(
        &self,
        company_name: &str,
        role_hint: Option<&str>,
    ) -> std::result::Result<ContactInfo, PipelineError>;
}

/// Fetches the text content of a candidate source.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> std::result::Result<String, PipelineError>;
}
