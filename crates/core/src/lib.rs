//! # Emberline Core
//!
//! Domain types, traits, and error definitions for the Emberline outreach
//! pipeline. This crate has **zero framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (model backend, mailer, contact lookup, speech
//! synthesis, operator alerts) is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod model;
pub mod retry;
pub mod services;
pub mod types;

// Re-export key types at crate root for ergonomics
pub use error::{ChannelError, Error, GatewayError, PipelineError, Result, VoiceError};
pub use model::{GenerateOutcome, GenerateRequest, ModelBackend, ModelTier, TextGenerator, TokenUsage};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use services::{
    Alerter, ContactInfo, ContactLookup, LogAlerter, Mailer, OutboundEmail, PdfRenderer,
    SocialPoster, SourceFetcher, SpeechSynth,
};
pub use types::{truncate_chars, Report, ReportSection, Target, TriggerEvent};
