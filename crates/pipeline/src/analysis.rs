//! Target analysis and contact enrichment.
//!
//! Asks the balanced model tier to turn a trigger snippet into a JSON array
//! of candidate companies, validates each entry, and stamps it with the
//! trigger context. Analysis never raises: a malformed model response or a
//! too-short snippet simply yields zero targets for that trigger.

use std::sync::Arc;

use async_trait::async_trait;
use emberline_core::{
    ContactInfo, ContactLookup, GenerateRequest, ModelTier, PipelineError, Target, TextGenerator,
    TriggerEvent,
};
use serde::Deserialize;
use tracing::{debug, warn};

/// Snippets shorter than this carry too little signal to spend a model call on.
pub const MIN_SNIPPET_CHARS: usize = 50;

const ANALYSIS_MAX_TOKENS: u32 = 500;

#[derive(Deserialize)]
struct RawTarget {
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    decision_maker_role: Option<String>,
    #[serde(default)]
    potential_need: Option<String>,
}

pub struct TargetAnalyzer {
    generator: Arc<dyn TextGenerator>,
    lookup: Arc<dyn ContactLookup>,
    target_countries: Vec<String>,
    target_industries: Vec<String>,
    max_targets: usize,
}

impl TargetAnalyzer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        lookup: Arc<dyn ContactLookup>,
        target_countries: Vec<String>,
        target_industries: Vec<String>,
        max_targets: usize,
    ) -> Self {
        Self {
            generator,
            lookup,
            target_countries,
            target_industries,
            max_targets,
        }
    }

    /// Identify outreach targets for one trigger event.
    pub async fn analyze_trigger(&self, event: &TriggerEvent) -> Vec<Target> {
        if event.snippet.chars().count() < MIN_SNIPPET_CHARS {
            debug!(source = %event.source, "snippet too short, skipping analysis");
            return Vec::new();
        }

        let prompt = self.analysis_prompt(event);
        let request = GenerateRequest::new(&prompt, ModelTier::Balanced)
            .with_max_tokens(ANALYSIS_MAX_TOKENS);

        let response = match self.generator.generate(request).await {
            Ok(text) => text,
            Err(err) => {
                warn!(source = %event.source, error = %err, "target analysis call failed");
                return Vec::new();
            }
        };

        let raw = match extract_json_array(&response) {
            Some(json) => json,
            None => {
                warn!(source = %event.source, "analysis response carried no JSON array");
                return Vec::new();
            }
        };

        let parsed: Vec<RawTarget> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(err) => {
                warn!(source = %event.source, error = %err, "analysis JSON failed to parse");
                return Vec::new();
            }
        };

        let context = event.context_excerpt();
        parsed
            .into_iter()
            .filter_map(|raw| {
                let company_name = raw.company_name.filter(|s| !s.trim().is_empty())?;
                let potential_need = raw.potential_need.filter(|s| !s.trim().is_empty())?;
                let mut target = Target::new(company_name, potential_need);
                target.decision_maker_role = raw.decision_maker_role;
                target.trigger_context = context.clone();
                Some(target)
            })
            .take(self.max_targets)
            .collect()
    }

    /// Fill in contact details for a target. Lookup failures degrade to an
    /// unenriched target rather than dropping it.
    pub async fn enrich_target(&self, target: Target) -> Target {
        let role_hint = target.decision_maker_role.as_deref();
        match self.lookup.lookup(&target.company_name, role_hint).await {
            Ok(info) => target.enriched(info),
            Err(err) => {
                warn!(company = %target.company_name, error = %err, "contact lookup failed");
                target.enriched(ContactInfo::default())
            }
        }
    }

    fn analysis_prompt(&self, event: &TriggerEvent) -> String {
        format!(
            "You are a business development analyst. The following text describes a recent \
             business event:\n\n{snippet}\n\nIdentify up to {max} companies that would plausibly \
             need consulting help because of this event. Prefer companies operating in \
             {countries} within the {industries} industries. Respond ONLY with a JSON array; \
             each element must have the fields \"company_name\", \"decision_maker_role\", and \
             \"potential_need\".",
            snippet = event.snippet,
            max = self.max_targets,
            countries = self.target_countries.join(", "),
            industries = self.target_industries.join(", "),
        )
    }
}

/// A no-op lookup for deployments without an enrichment provider.
pub struct NullContactLookup;

#[async_trait]
impl ContactLookup for NullContactLookup {
    async fn lookup(
        &self,
        _company_name: &str,
        _role_hint: Option<&str>,
    ) -> Result<ContactInfo, PipelineError> {
        Ok(ContactInfo::default())
    }
}

/// Pull the first complete JSON array out of surrounding prose.
pub(crate) fn extract_json_array(text: &str) -> Option<String> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| text[start..=end].to_string())
}
