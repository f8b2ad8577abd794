//! Outbound adapters.
//!
//! Concrete implementations of the transport traits: Telegram operator
//! alerts, SMTP mail, social posting, PDF rendering, and the payment
//! webhook signature check. Each adapter degrades predictably when its
//! channel is unconfigured.

pub mod email;
pub mod render;
pub mod social;
pub mod telegram;
pub mod webhook;

pub use email::SmtpMailer;
pub use render::FileRenderer;
pub use social::StubPoster;
pub use telegram::TelegramAlerter;
pub use webhook::validate_signature;
