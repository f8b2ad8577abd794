//! Inbound phone agent.
//!
//! Each call is a [`session::ConversationSession`] keyed by the telephony
//! platform's `CallSid`, stored in a TTL cache so abandoned calls clean
//! themselves up. The [`agent::VoiceAgent`] drives the conversation and
//! answers every webhook with a [`twiml::CallDirective`], which the server
//! renders to TwiML.

pub mod agent;
pub mod session;
pub mod synth;
pub mod twiml;

pub use agent::{VoiceAgent, VoiceConfig};
pub use session::{ConversationSession, Role, Turn};
pub use synth::PlatformVoice;
pub use twiml::CallDirective;
