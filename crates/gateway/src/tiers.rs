//! Tier-to-model routing.

use emberline_core::ModelTier;

/// Concrete OpenRouter model identifier for a quality tier.
pub fn model_for(tier: ModelTier) -> &'static str {
    match tier {
        ModelTier::Fast => "anthropic/claude-3-haiku-20240307",
        ModelTier::Balanced => "google/gemini-pro",
        ModelTier::HighQuality => "openai/gpt-4-turbo",
        ModelTier::Flash => "google/gemini-1.5-flash-latest",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tier_routes_to_a_model() {
        for tier in [
            ModelTier::Fast,
            ModelTier::Balanced,
            ModelTier::HighQuality,
            ModelTier::Flash,
        ] {
            assert!(model_for(tier).contains('/'));
        }
    }

    #[test]
    fn default_tier_is_balanced() {
        assert_eq!(model_for(ModelTier::default()), "google/gemini-pro");
    }
}
