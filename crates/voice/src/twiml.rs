//! Call-control directives and their TwiML rendering.

/// What the telephony platform should do next with a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallDirective {
    /// Speak (or play) a line, then gather the caller's speech and post it
    /// to `action`.
    GatherSpeech {
        say: String,
        audio_url: Option<String>,
        action: String,
    },
    /// Speak (or play) a closing line and end the call.
    Hangup {
        say: String,
        audio_url: Option<String>,
    },
}

impl CallDirective {
    pub fn to_twiml(&self) -> String {
        match self {
            Self::GatherSpeech {
                say,
                audio_url,
                action,
            } => format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Response><Gather input=\"speech dtmf\" action=\"{}\" method=\"POST\" \
                 speechTimeout=\"auto\">{}</Gather><Redirect>{}</Redirect></Response>",
                escape_xml(action),
                voice_element(say, audio_url.as_deref()),
                escape_xml(action),
            ),
            Self::Hangup { say, audio_url } => format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                 <Response>{}<Hangup/></Response>",
                voice_element(say, audio_url.as_deref()),
            ),
        }
    }
}

/// `<Play>` when synthesized audio exists, `<Say>` for the platform voice.
fn voice_element(say: &str, audio_url: Option<&str>) -> String {
    match audio_url {
        Some(url) => format!("<Play>{}</Play>", escape_xml(url)),
        None => format!("<Say>{}</Say>", escape_xml(say)),
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
