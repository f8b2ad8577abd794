//! Paid report fulfillment.
//!
//! Triggered by a paid order from the payment webhook: generate the report
//! text on the high-quality tier, split it into its five sections, render a
//! PDF, and email it to the buyer with the file attached. Every failure
//! path logs and alerts the operator; nothing here may take down the
//! server that spawned it.

use std::path::PathBuf;
use std::sync::Arc;

use emberline_core::{
    retry_with_backoff, Alerter, ChannelError, GenerateRequest, Mailer, ModelTier, OutboundEmail,
    PdfRenderer, PipelineError, Report, ReportSection, RetryPolicy, TextGenerator,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

const REPORT_MAX_TOKENS: u32 = 3000;
const REPORT_TEMPERATURE: f32 = 0.6;

/// Canonical section order of a delivered report.
pub const REPORT_SECTIONS: [&str; 5] = [
    "Executive Summary",
    "Situation Analysis",
    "Landscape",
    "Risk Assessment",
    "Recommendations",
];

/// A paid order extracted from the payment webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PaidOrder {
    pub order_id: String,
    pub customer_email: String,
    pub product_name: String,
}

pub struct ReportFulfillment {
    generator: Arc<dyn TextGenerator>,
    renderer: Arc<dyn PdfRenderer>,
    mailer: Arc<dyn Mailer>,
    alerter: Arc<dyn Alerter>,
    retry: RetryPolicy,
}

impl ReportFulfillment {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn PdfRenderer>,
        mailer: Arc<dyn Mailer>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            generator,
            renderer,
            mailer,
            alerter,
            retry: RetryPolicy::single(),
        }
    }

    /// Fulfill one order end to end. Failures are logged and alerted here;
    /// the caller (a spawned task) has nowhere to propagate them.
    pub async fn fulfill(&self, order: PaidOrder) {
        let order_id = order.order_id.clone();
        info!(order_id, product = %order.product_name, "fulfilling paid report");

        if let Err(err) = self.fulfill_inner(&order).await {
            error!(order_id, error = %err, "report fulfillment failed");
            self.alerter
                .alert(&format!(
                    "Report fulfillment failed for order {order_id}: {err}"
                ))
                .await;
        }
    }

    async fn fulfill_inner(&self, order: &PaidOrder) -> Result<(), PipelineError> {
        let prompt = Self::report_prompt(order);
        let request = GenerateRequest::new(&prompt, ModelTier::HighQuality)
            .with_max_tokens(REPORT_MAX_TOKENS)
            .with_temperature(REPORT_TEMPERATURE);

        let text = self
            .generator
            .generate(request)
            .await
            .map_err(|e| PipelineError::Fulfillment(e.to_string()))?;

        let report = Report {
            title: order.product_name.clone(),
            client_name: order.customer_email.clone(),
            sections: parse_sections(&text),
        };

        let pdf_path = temp_pdf_path(&order.order_id);
        self.renderer.render(&report, &pdf_path).await?;

        let email = OutboundEmail {
            to: order.customer_email.clone(),
            subject: format!("Your report: {}", order.product_name),
            body: "Thank you for your purchase. Your report is attached.".to_string(),
            attachment: Some(pdf_path.clone()),
        };

        let send_result = retry_with_backoff(
            &self.retry,
            "report_delivery",
            ChannelError::is_retryable,
            || async { self.mailer.send(&email).await },
        )
        .await;

        // The rendered file is transient either way.
        if let Err(err) = tokio::fs::remove_file(&pdf_path).await {
            warn!(path = %pdf_path.display(), error = %err, "failed to remove rendered report");
        }

        send_result.map_err(|e| PipelineError::Fulfillment(e.to_string()))?;
        info!(order_id = %order.order_id, to = %order.customer_email, "report delivered");
        Ok(())
    }

    fn report_prompt(order: &PaidOrder) -> String {
        format!(
            "Write a thorough business consulting report titled \"{product}\". Structure it \
             under exactly these headings: {headings}. Be specific and actionable; aim for \
             depth over breadth.",
            product = order.product_name,
            headings = REPORT_SECTIONS.join(", "),
        )
    }
}

fn temp_pdf_path(order_id: &str) -> PathBuf {
    std::env::temp_dir().join(format!("emberline-report-{}-{}.pdf", order_id, Uuid::new_v4()))
}

/// Split generated text into the canonical sections by heading match.
/// Text with no recognizable headings becomes a single executive-summary
/// section holding everything.
pub fn parse_sections(text: &str) -> Vec<ReportSection> {
    let mut sections: Vec<ReportSection> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(heading) = match_heading(line) {
            if let Some((name, body)) = current.take() {
                sections.push(ReportSection {
                    heading: name,
                    body: body.join("\n").trim().to_string(),
                });
            }
            current = Some((heading, Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((name, body)) = current.take() {
        sections.push(ReportSection {
            heading: name,
            body: body.join("\n").trim().to_string(),
        });
    }

    if sections.is_empty() {
        sections.push(ReportSection {
            heading: REPORT_SECTIONS[0].to_string(),
            body: text.trim().to_string(),
        });
    }
    sections
}

/// Does this line open one of the canonical sections? Markdown heading
/// markers and numbering are stripped before the case-insensitive match.
fn match_heading(line: &str) -> Option<String> {
    let stripped = line
        .trim()
        .trim_start_matches(['#', '*', '-', ' '])
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
        .trim()
        .trim_end_matches([':', '*']);
    if stripped.is_empty() || stripped.chars().count() > 60 {
        return None;
    }
    let lowered = stripped.to_lowercase();
    REPORT_SECTIONS
        .iter()
        .find(|name| lowered.starts_with(&name.to_lowercase()))
        .map(|name| name.to_string())
}
