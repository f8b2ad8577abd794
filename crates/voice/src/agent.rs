//! The conversation driver.
//!
//! Every webhook from the telephony platform lands here and leaves with a
//! [`CallDirective`]; there is no failure path that does not produce one.
//! Model failures become an apology line plus an operator alert, synthesis
//! failures fall back to the platform voice, and an unknown `CallSid` is
//! treated as a fresh call.

use std::sync::Arc;
use std::time::Duration;

use emberline_core::{Alerter, GenerateRequest, ModelTier, SpeechSynth, TextGenerator};
use emberline_store::TtlCache;
use tracing::{debug, info, warn};

use crate::session::{ConversationSession, Role};
use crate::twiml::CallDirective;

const RESPOND_ACTION: &str = "/voice/respond";

const GREETING: &str =
    "Hello, you've reached Emberline Consulting. How can I help you today?";
const REPROMPT: &str = "Sorry, I didn't catch that. Could you say it again?";
const APOLOGY: &str =
    "I'm sorry, I'm having trouble on my end. Please try again in a moment.";
const CLOSING: &str =
    "Thanks for calling Emberline. We'll follow up by email. Goodbye.";

const RESPONSE_MAX_TOKENS: u32 = 100;
const RESPONSE_TEMPERATURE: f32 = 0.6;

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub session_ttl: Duration,
    pub max_turns: usize,
    pub standard_price: u32,
    pub premium_price: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(900),
            max_turns: 10,
            standard_price: 750,
            premium_price: 1200,
        }
    }
}

pub struct VoiceAgent {
    generator: Arc<dyn TextGenerator>,
    synth: Arc<dyn SpeechSynth>,
    alerter: Arc<dyn Alerter>,
    sessions: TtlCache<String, ConversationSession>,
    config: VoiceConfig,
}

impl VoiceAgent {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        synth: Arc<dyn SpeechSynth>,
        alerter: Arc<dyn Alerter>,
        config: VoiceConfig,
    ) -> Self {
        Self {
            generator,
            synth,
            alerter,
            sessions: TtlCache::new(config.session_ttl),
            config,
        }
    }

    /// A new inbound call: create the session and greet the caller.
    pub async fn handle_incoming(&self, call_sid: &str) -> CallDirective {
        info!(call_sid, "inbound call");
        let mut session = ConversationSession::new(call_sid);
        session.push(Role::Assistant, GREETING);
        self.sessions.insert(call_sid.to_string(), session).await;

        let audio_url = self.speak(GREETING).await;
        CallDirective::GatherSpeech {
            say: GREETING.to_string(),
            audio_url,
            action: RESPOND_ACTION.to_string(),
        }
    }

    /// The caller said something (or nothing). Advance the conversation.
    pub async fn handle_respond(&self, call_sid: &str, utterance: Option<&str>) -> CallDirective {
        let Some(mut session) = self.sessions.get(&call_sid.to_string()).await else {
            debug!(call_sid, "unknown or expired session, restarting call");
            return self.handle_incoming(call_sid).await;
        };

        let utterance = utterance.map(str::trim).filter(|s| !s.is_empty());
        let Some(utterance) = utterance else {
            // Reprompts still count toward the ceiling, so a silent line
            // cannot hold a session open forever.
            session.push(Role::Assistant, REPROMPT);
            if session.turns.len() >= 2 * self.config.max_turns {
                self.sessions.remove(&call_sid.to_string()).await;
                let audio_url = self.speak(CLOSING).await;
                return CallDirective::Hangup {
                    say: CLOSING.to_string(),
                    audio_url,
                };
            }
            self.sessions.insert(call_sid.to_string(), session).await;
            let audio_url = self.speak(REPROMPT).await;
            return CallDirective::GatherSpeech {
                say: REPROMPT.to_string(),
                audio_url,
                action: RESPOND_ACTION.to_string(),
            };
        };

        session.push(Role::User, utterance);
        let reply = match self.generate_reply(&session).await {
            Ok(text) => text,
            Err(message) => {
                warn!(call_sid, error = %message, "voice reply generation failed");
                self.alerter
                    .alert(&format!("Voice agent failure on call {call_sid}: {message}"))
                    .await;
                APOLOGY.to_string()
            }
        };
        session.push(Role::Assistant, &reply);

        // A full conversation is max_turns exchanges, two turns each.
        if session.turns.len() >= 2 * self.config.max_turns {
            info!(call_sid, "turn ceiling reached, closing call");
            self.sessions.remove(&call_sid.to_string()).await;
            let closing = format!("{reply} {CLOSING}");
            let audio_url = self.speak(&closing).await;
            return CallDirective::Hangup {
                say: closing,
                audio_url,
            };
        }

        session.trim_to(2 * self.config.max_turns);
        self.sessions.insert(call_sid.to_string(), session).await;

        let audio_url = self.speak(&reply).await;
        CallDirective::GatherSpeech {
            say: reply,
            audio_url,
            action: RESPOND_ACTION.to_string(),
        }
    }

    async fn generate_reply(&self, session: &ConversationSession) -> Result<String, String> {
        let prompt = format!(
            "You are the phone agent for Emberline Consulting. We sell two consulting \
             packages: standard at ${standard} and premium at ${premium}. Answer questions \
             about scope and pricing, but never reveal the contents of a delivered report. \
             Reply in one to three short spoken sentences.\n\nConversation so far:\n{transcript}\n\nAgent:",
            standard = self.config.standard_price,
            premium = self.config.premium_price,
            transcript = session.transcript(),
        );
        let request = GenerateRequest::new(&prompt, ModelTier::Flash)
            .with_max_tokens(RESPONSE_MAX_TOKENS)
            .with_temperature(RESPONSE_TEMPERATURE);

        self.generator
            .generate(request)
            .await
            .map(|text| text.trim().to_string())
            .map_err(|e| e.to_string())
    }

    /// Synthesize a line, or return `None` to use the platform voice.
    async fn speak(&self, text: &str) -> Option<String> {
        match self.synth.synthesize(text).await {
            Ok(url) => Some(url),
            Err(err) => {
                debug!(error = %err, "synthesis unavailable, using platform voice");
                None
            }
        }
    }

    /// Whether a session currently exists for this call.
    pub async fn has_session(&self, call_sid: &str) -> bool {
        self.sessions.contains(&call_sid.to_string()).await
    }
}
