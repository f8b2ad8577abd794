//! Message drafting and paced delivery.
//!
//! Drafting is two model calls: a cheap "micro insight" about the target on
//! the flash tier, then the full message on the balanced tier with the
//! insight woven in. Both calls degrade to deterministic templates so a
//! gateway outage still produces sendable mail. Delivery is strictly
//! sequential with randomized human-scale delays between sends.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use emberline_core::{
    retry_with_backoff, ChannelError, GenerateRequest, Mailer, ModelTier, OutboundEmail,
    RetryPolicy, Target, TextGenerator,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Marks where the subject line ends and the body begins in a drafted message.
pub const BODY_DELIMITER: &str = "---BODY---";

const INSIGHT_MAX_TOKENS: u32 = 60;
const INSIGHT_TEMPERATURE: f32 = 0.8;

/// The two consulting packages offered in outreach mail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    Standard,
    Premium,
}

/// Package pricing and purchase links, surfaced verbatim in drafted mail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPlan {
    pub standard_price: u32,
    pub premium_price: u32,
    pub standard_link: String,
    pub premium_link: String,
}

impl Default for PricingPlan {
    fn default() -> Self {
        Self {
            standard_price: 750,
            premium_price: 1200,
            standard_link: String::new(),
            premium_link: String::new(),
        }
    }
}

impl PricingPlan {
    pub fn price(&self, tier: ServiceTier) -> u32 {
        match tier {
            ServiceTier::Standard => self.standard_price,
            ServiceTier::Premium => self.premium_price,
        }
    }

    pub fn link(&self, tier: ServiceTier) -> &str {
        match tier {
            ServiceTier::Standard => &self.standard_link,
            ServiceTier::Premium => &self.premium_link,
        }
    }
}

/// A drafted outreach message, split into subject and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub subject: String,
    pub body: String,
}

impl MessageDraft {
    /// Split a raw model response on [`BODY_DELIMITER`]. Responses without
    /// the delimiter become the body under a generic subject.
    pub fn parse(raw: &str, company_name: &str) -> Self {
        match raw.split_once(BODY_DELIMITER) {
            Some((subject, body)) => Self {
                subject: subject.trim().to_string(),
                body: body.trim().to_string(),
            },
            None => Self {
                subject: format!("A thought for {company_name}"),
                body: raw.trim().to_string(),
            },
        }
    }
}

/// Delay ranges between sequential sends, in seconds. Injectable so tests
/// can shrink them to nothing.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub send_delay_secs: RangeInclusive<u64>,
    pub failure_delay_secs: RangeInclusive<u64>,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            send_delay_secs: 45..=120,
            failure_delay_secs: 15..=30,
        }
    }
}

/// Outcome counts for one outreach sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

pub struct OutreachSequencer {
    generator: Arc<dyn TextGenerator>,
    mailer: Arc<dyn Mailer>,
    pricing: PricingPlan,
    pacing: PacingConfig,
    retry: RetryPolicy,
}

impl OutreachSequencer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        mailer: Arc<dyn Mailer>,
        pricing: PricingPlan,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            generator,
            mailer,
            pricing,
            pacing,
            retry: RetryPolicy::single(),
        }
    }

    /// Draft a personalized message for one target.
    pub async fn craft_message(&self, target: &Target, tier: ServiceTier) -> MessageDraft {
        let insight = self.micro_insight(target).await;
        let prompt = self.message_prompt(target, tier, &insight);
        let request = GenerateRequest::new(&prompt, ModelTier::Balanced);

        match self.generator.generate(request).await {
            Ok(raw) => MessageDraft::parse(&raw, &target.company_name),
            Err(err) => {
                warn!(company = %target.company_name, error = %err, "message drafting failed, using template");
                self.template_draft(target, tier, &insight)
            }
        }
    }

    /// Send drafted messages to every reachable target, one at a time.
    /// Targets without an email address are skipped without consuming a
    /// pacing delay. Never raises; per-target outcomes land in the report.
    pub async fn execute_sequence(
        &self,
        targets: &[Target],
        tier: ServiceTier,
    ) -> SequenceReport {
        let mut report = SequenceReport::default();

        for target in targets {
            let Some(recipient) = target.email.as_deref() else {
                debug!(company = %target.company_name, "no email after enrichment, skipping");
                report.skipped += 1;
                continue;
            };

            let draft = self.craft_message(target, tier).await;
            let email = OutboundEmail {
                to: recipient.to_string(),
                subject: draft.subject,
                body: draft.body,
                attachment: None,
            };

            let result = retry_with_backoff(
                &self.retry,
                "outreach_send",
                ChannelError::is_retryable,
                || async { self.mailer.send(&email).await },
            )
            .await;

            let delay_range = match result {
                Ok(()) => {
                    info!(company = %target.company_name, to = recipient, "outreach email sent");
                    report.sent += 1;
                    self.pacing.send_delay_secs.clone()
                }
                Err(err) => {
                    warn!(company = %target.company_name, error = %err, "outreach email failed");
                    report.failed += 1;
                    self.pacing.failure_delay_secs.clone()
                }
            };

            // Draw the delay before awaiting so no RNG handle lives across it.
            let delay = {
                let mut rng = rand::rng();
                rand::Rng::random_range(&mut rng, delay_range)
            };
            tokio::time::sleep(Duration::from_secs(delay)).await;
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "outreach sequence complete"
        );
        report
    }

    /// A one-sentence observation about the target, on the cheapest tier.
    async fn micro_insight(&self, target: &Target) -> String {
        let prompt = format!(
            "In one short sentence, state the most pressing operational concern for a company \
             like {company} given this situation: {need}. Context: {context}",
            company = target.company_name,
            need = target.potential_need,
            context = target.trigger_context,
        );
        let request = GenerateRequest::new(&prompt, ModelTier::Flash)
            .with_max_tokens(INSIGHT_MAX_TOKENS)
            .with_temperature(INSIGHT_TEMPERATURE);

        match self.generator.generate(request).await {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                debug!(company = %target.company_name, error = %err, "insight call failed, using fallback");
                format!(
                    "Companies facing {} often underestimate how quickly it compounds.",
                    target.potential_need
                )
            }
        }
    }

    fn message_prompt(&self, target: &Target, tier: ServiceTier, insight: &str) -> String {
        let greeting_name = target.contact_name.as_deref().unwrap_or("there");
        format!(
            "Write a short, direct business development email to {name} at {company}. \
             Their likely need: {need}. Open with this insight, rephrased naturally: \
             \"{insight}\". Offer our consulting package at ${price} and include this \
             purchase link verbatim: {link}. Keep it under 150 words, no flattery. \
             Respond with the subject line, then the literal line {delim}, then the body.",
            name = greeting_name,
            company = target.company_name,
            need = target.potential_need,
            insight = insight,
            price = self.pricing.price(tier),
            link = self.pricing.link(tier),
            delim = BODY_DELIMITER,
        )
    }

    fn template_draft(&self, target: &Target, tier: ServiceTier, insight: &str) -> MessageDraft {
        MessageDraft {
            subject: format!("A thought for {}", target.company_name),
            body: format!(
                "Hi {name},\n\n{insight}\n\nWe help companies work through exactly this. \
                 Our engagement starts at ${price}: {link}\n\nBest,\nEmberline",
                name = target.contact_name.as_deref().unwrap_or("there"),
                insight = insight,
                price = self.pricing.price(tier),
                link = self.pricing.link(tier),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use emberline_core::GatewayError;
    use std::sync::Mutex;

    struct FixedGenerator {
        response: Result<String, GatewayError>,
    }

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, GatewayError> {
            self.response.clone()
        }
    }

    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
        fail_recipients: Vec<String>,
    }

    impl RecordingMailer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail_recipients: Vec::new(),
            })
        }

        fn failing_for(recipient: &str) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail_recipients: vec![recipient.to_string()],
            })
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<(), ChannelError> {
            if self.fail_recipients.contains(&email.to) {
                return Err(ChannelError::DeliveryFailed {
                    recipient: email.to.clone(),
                    reason: "mailbox unavailable".to_string(),
                });
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn sequencer(
        response: Result<String, GatewayError>,
        mailer: Arc<RecordingMailer>,
    ) -> OutreachSequencer {
        OutreachSequencer::new(
            Arc::new(FixedGenerator { response }),
            mailer,
            PricingPlan {
                standard_link: "https://pay.example/std".to_string(),
                premium_link: "https://pay.example/prm".to_string(),
                ..Default::default()
            },
            PacingConfig {
                send_delay_secs: 0..=0,
                failure_delay_secs: 0..=0,
            },
        )
    }

    fn reachable(company: &str, email: &str) -> Target {
        let mut t = Target::new(company, "supply chain exposure");
        t.email = Some(email.to_string());
        t
    }

    #[test]
    fn draft_parses_on_delimiter() {
        let draft = MessageDraft::parse("Subject line\n---BODY---\nHello body", "Acme");
        assert_eq!(draft.subject, "Subject line");
        assert_eq!(draft.body, "Hello body");
    }

    #[test]
    fn draft_without_delimiter_gets_default_subject() {
        let draft = MessageDraft::parse("just a body", "Acme");
        assert_eq!(draft.subject, "A thought for Acme");
        assert_eq!(draft.body, "just a body");
    }

    #[tokio::test]
    async fn crafting_survives_total_gateway_outage() {
        let seq = sequencer(Err(GatewayError::Timeout("deadline".into())), RecordingMailer::new());
        let draft = seq
            .craft_message(&reachable("Acme", "a@b.c"), ServiceTier::Standard)
            .await;

        assert!(draft.body.contains("$750"));
        assert!(draft.body.contains("https://pay.example/std"));
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_sends_to_reachable_targets_only() {
        let mailer = RecordingMailer::new();
        let seq = sequencer(
            Ok("Subj---BODY---Body".to_string()),
            mailer.clone(),
        );

        let targets = vec![
            reachable("Acme", "a@acme.example"),
            Target::new("NoMail Inc", "n"),
            reachable("Globex", "g@globex.example"),
        ];
        let report = seq.execute_sequence(&targets, ServiceTier::Premium).await;

        assert_eq!(report, SequenceReport { sent: 2, failed: 0, skipped: 1 });
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_failure_is_counted_not_raised() {
        let mailer = RecordingMailer::failing_for("dead@acme.example");
        let seq = sequencer(Ok("S---BODY---B".to_string()), mailer);

        let targets = vec![reachable("Acme", "dead@acme.example")];
        let report = seq.execute_sequence(&targets, ServiceTier::Standard).await;

        assert_eq!(report, SequenceReport { sent: 0, failed: 1, skipped: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_delay_applies_between_sends() {
        let mailer = RecordingMailer::new();
        let seq = OutreachSequencer::new(
            Arc::new(FixedGenerator {
                response: Ok("S---BODY---B".to_string()),
            }),
            mailer,
            PricingPlan::default(),
            PacingConfig {
                send_delay_secs: 50..=50,
                failure_delay_secs: 15..=15,
            },
        );

        let start = tokio::time::Instant::now();
        let targets = vec![reachable("A", "a@x.y"), reachable("B", "b@x.y")];
        seq.execute_sequence(&targets, ServiceTier::Standard).await;

        assert!(start.elapsed() >= Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_target_consumes_no_pacing_delay() {
        let mailer = RecordingMailer::new();
        let seq = OutreachSequencer::new(
            Arc::new(FixedGenerator {
                response: Ok("S---BODY---B".to_string()),
            }),
            mailer.clone(),
            PricingPlan::default(),
            PacingConfig {
                send_delay_secs: 50..=50,
                failure_delay_secs: 15..=15,
            },
        );

        let start = tokio::time::Instant::now();
        let targets = vec![
            reachable("A", "a@x.y"),
            Target::new("NoMail Inc", "n"),
            reachable("B", "b@x.y"),
        ];
        let report = seq.execute_sequence(&targets, ServiceTier::Standard).await;

        assert_eq!(report, SequenceReport { sent: 2, failed: 0, skipped: 1 });
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
        // Two send delays only; the skip in the middle waits for nothing.
        assert_eq!(start.elapsed(), Duration::from_secs(100));
    }

    #[test]
    fn pricing_plan_resolves_by_tier() {
        let plan = PricingPlan::default();
        assert_eq!(plan.price(ServiceTier::Standard), 750);
        assert_eq!(plan.price(ServiceTier::Premium), 1200);
    }
}
