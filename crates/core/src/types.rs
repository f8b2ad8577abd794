//! Domain types flowing through the outreach pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on the text snippet carried by a trigger event.
pub const SNIPPET_MAX_CHARS: usize = 1000;

/// Upper bound on the trigger-context excerpt stamped on each target.
pub const CONTEXT_EXCERPT_CHARS: usize = 500;

/// A scraped piece of text suspected to indicate a business opportunity.
///
/// Immutable once created: produced by trigger discovery, consumed read-only
/// by everything downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    /// Where the snippet came from (source URL or feed identifier).
    pub source: String,

    /// Bounded-length excerpt of the fetched text.
    pub snippet: String,

    /// When discovery produced this event.
    pub discovered_at: DateTime<Utc>,
}

impl TriggerEvent {
    /// Build an event, capping the snippet at [`SNIPPET_MAX_CHARS`].
    pub fn new(source: impl Into<String>, text: &str) -> Self {
        Self {
            source: source.into(),
            snippet: truncate_chars(text, SNIPPET_MAX_CHARS),
            discovered_at: Utc::now(),
        }
    }

    /// A shorter excerpt of the snippet for stamping onto targets.
    pub fn context_excerpt(&self) -> String {
        truncate_chars(&self.snippet, CONTEXT_EXCERPT_CHARS)
    }
}

/// A company/role identified as a candidate outreach recipient.
///
/// Created by target analysis; enrichment fills in the contact fields.
/// A target whose `email` is still `None` after enrichment is excluded from
/// outreach but never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub company_name: String,

    #[serde(default)]
    pub decision_maker_role: Option<String>,

    pub potential_need: String,

    /// Excerpt of the trigger snippet this target was derived from.
    #[serde(default)]
    pub trigger_context: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub contact_name: Option<String>,

    #[serde(default)]
    pub contact_role: Option<String>,

    #[serde(default)]
    pub activity_summary: Option<String>,
}

impl Target {
    pub fn new(company_name: impl Into<String>, potential_need: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            decision_maker_role: None,
            potential_need: potential_need.into(),
            trigger_context: String::new(),
            email: None,
            contact_name: None,
            contact_role: None,
            activity_summary: None,
        }
    }

    /// Apply the result of a contact lookup, producing the enriched version.
    pub fn enriched(self, info: crate::services::ContactInfo) -> Self {
        Self {
            email: info.email,
            contact_name: info.name,
            contact_role: info.role,
            activity_summary: info.activity_summary,
            ..self
        }
    }
}

/// The ordered section structure of a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub client_name: String,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub heading: String,
    pub body: String,
}

/// Truncate to a character count without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
