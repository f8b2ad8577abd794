//! Speech synthesis adapters.

use async_trait::async_trait;
use emberline_core::{SpeechSynth, VoiceError};

/// The no-synthesis adapter: always fails, which callers treat as "use the
/// telephony platform's built-in voice". Deployments with a TTS provider
/// supply their own [`SpeechSynth`] implementation.
pub struct PlatformVoice;

#[async_trait]
impl SpeechSynth for PlatformVoice {
    async fn synthesize(&self, _text: &str) -> Result<String, VoiceError> {
        Err(VoiceError::Synthesis(
            "no synthesis provider configured".to_string(),
        ))
    }
}
