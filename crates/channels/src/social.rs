//! Social posting.

use async_trait::async_trait;
use emberline_core::{ChannelError, SocialPoster};
use tracing::info;

/// Log-only poster for deployments without platform credentials. Branding
/// output still shows up in the logs, which is enough for review before a
/// real platform adapter lands.
pub struct StubPoster;

#[async_trait]
impl SocialPoster for StubPoster {
    async fn post(&self, text: &str) -> Result<(), ChannelError> {
        info!(chars = text.chars().count(), post = text, "social post (log only)");
        Ok(())
    }
}
