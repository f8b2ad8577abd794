//! The outreach pipeline.
//!
//! A cycle moves left to right: [`discovery`] scrapes configured sources for
//! trigger events, [`analysis`] turns each event into concrete company
//! targets and enriches them with contact details, and [`outreach`] drafts
//! and paces the emails. [`orchestrator`] owns the fan-out, per-task
//! timeouts, and the budget gate that decides whether a cycle runs at all.
//! [`report`] and [`branding`] are the two side businesses: paid report
//! fulfillment and the periodic social posting loop.

pub mod analysis;
pub mod branding;
pub mod discovery;
pub mod orchestrator;
pub mod outreach;
pub mod report;

pub use analysis::{NullContactLookup, TargetAnalyzer};
pub use branding::BrandingCycle;
pub use discovery::{HttpFetcher, TriggerDiscovery};
pub use orchestrator::{CycleOrchestrator, CycleReport, OutreachPipeline, TriggerOutcome, TriggerProcessor};
pub use outreach::{MessageDraft, OutreachSequencer, PacingConfig, PricingPlan, SequenceReport, ServiceTier};
pub use report::{PaidOrder, ReportFulfillment};
