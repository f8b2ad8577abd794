//! Periodic brand-building posts.
//!
//! Two-step generation: the balanced tier proposes a content idea as JSON,
//! the flash tier writes the actual post from it. Any failure anywhere
//! skips the cycle quietly; branding is pure upside and never alerts.

use std::sync::Arc;

use emberline_core::{GenerateRequest, ModelTier, SocialPoster, TextGenerator};
use serde::Deserialize;
use tracing::{debug, info, warn};

const IDEA_MAX_TOKENS: u32 = 150;
const POST_MAX_TOKENS: u32 = 100;

/// Hard platform limit for a single post.
pub const POST_MAX_CHARS: usize = 280;

#[derive(Debug, Deserialize)]
struct ContentIdea {
    idea_summary: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    hashtags: Vec<String>,
}

pub struct BrandingCycle {
    generator: Arc<dyn TextGenerator>,
    poster: Arc<dyn SocialPoster>,
}

impl BrandingCycle {
    pub fn new(generator: Arc<dyn TextGenerator>, poster: Arc<dyn SocialPoster>) -> Self {
        Self { generator, poster }
    }

    /// Run one branding pass: idea, post, publish.
    pub async fn run(&self) {
        let Some(idea) = self.generate_idea().await else {
            return;
        };
        let Some(post) = self.generate_post(&idea).await else {
            return;
        };

        match self.poster.post(&post).await {
            Ok(()) => info!(chars = post.chars().count(), "branding post published"),
            Err(err) => warn!(error = %err, "branding post failed to publish"),
        }
    }

    async fn generate_idea(&self) -> Option<ContentIdea> {
        let prompt = "Propose one social media content idea for a consulting firm that helps \
                      companies navigate sudden business disruptions. Respond ONLY with a JSON \
                      object with the fields \"idea_summary\", \"format\", and \"hashtags\" \
                      (array of strings).";
        let request =
            GenerateRequest::new(prompt, ModelTier::Balanced).with_max_tokens(IDEA_MAX_TOKENS);

        let response = match self.generator.generate(request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "branding idea call failed");
                return None;
            }
        };

        let raw = extract_json_object(&response)?;
        match serde_json::from_str::<ContentIdea>(&raw) {
            Ok(idea) => Some(idea),
            Err(err) => {
                debug!(error = %err, "branding idea JSON failed to parse, skipping cycle");
                None
            }
        }
    }

    async fn generate_post(&self, idea: &ContentIdea) -> Option<String> {
        let prompt = format!(
            "Write a single social media post (max {POST_MAX_CHARS} characters) from this idea: \
             {summary}. Format: {format}. Work in these hashtags if they fit: {tags}. \
             Respond with the post text only.",
            summary = idea.idea_summary,
            format = idea.format.as_deref().unwrap_or("short text post"),
            tags = idea.hashtags.join(" "),
        );
        let request =
            GenerateRequest::new(&prompt, ModelTier::Flash).with_max_tokens(POST_MAX_TOKENS);

        match self.generator.generate(request).await {
            Ok(text) => Some(emberline_core::truncate_chars(text.trim(), POST_MAX_CHARS)),
            Err(err) => {
                warn!(error = %err, "branding post call failed");
                None
            }
        }
    }
}

/// Pull the first complete JSON object out of surrounding prose.
fn extract_json_object(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}
