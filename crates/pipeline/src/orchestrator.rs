//! Cycle orchestration: budget gate, fan-out, fan-in, timeouts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use emberline_budget::BudgetLedger;
use emberline_core::{Alerter, TriggerEvent};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::TargetAnalyzer;
use crate::discovery::TriggerDiscovery;
use crate::outreach::{OutreachSequencer, ServiceTier};

/// How one trigger's processing ended. Failures inside a trigger are
/// handled and reported, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Success,
    HandledFailure,
}

/// Processes a single discovered trigger end to end.
#[async_trait]
pub trait TriggerProcessor: Send + Sync {
    async fn process(&self, event: TriggerEvent) -> TriggerOutcome;
}

/// Outcome counts for one full discovery cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub triggers: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// The standard processor: analyze the trigger, enrich every target, run
/// the outreach sequence.
pub struct OutreachPipeline {
    analyzer: Arc<TargetAnalyzer>,
    sequencer: Arc<OutreachSequencer>,
    tier: ServiceTier,
}

impl OutreachPipeline {
    pub fn new(
        analyzer: Arc<TargetAnalyzer>,
        sequencer: Arc<OutreachSequencer>,
        tier: ServiceTier,
    ) -> Self {
        Self {
            analyzer,
            sequencer,
            tier,
        }
    }
}

#[async_trait]
impl TriggerProcessor for OutreachPipeline {
    async fn process(&self, event: TriggerEvent) -> TriggerOutcome {
        let targets = self.analyzer.analyze_trigger(&event).await;
        if targets.is_empty() {
            info!(source = %event.source, "no targets for trigger");
            return TriggerOutcome::Success;
        }

        let mut enriched = Vec::with_capacity(targets.len());
        for target in targets {
            enriched.push(self.analyzer.enrich_target(target).await);
        }

        let report = self.sequencer.execute_sequence(&enriched, self.tier).await;
        if report.sent == 0 && report.failed > 0 {
            TriggerOutcome::HandledFailure
        } else {
            TriggerOutcome::Success
        }
    }
}

pub struct CycleOrchestrator {
    discovery: Arc<TriggerDiscovery>,
    processor: Arc<dyn TriggerProcessor>,
    ledger: Arc<BudgetLedger>,
    alerter: Arc<dyn Alerter>,
    max_sources: usize,
    max_concurrent_tasks: usize,
    task_timeout: Duration,
}

impl CycleOrchestrator {
    pub fn new(
        discovery: Arc<TriggerDiscovery>,
        processor: Arc<dyn TriggerProcessor>,
        ledger: Arc<BudgetLedger>,
        alerter: Arc<dyn Alerter>,
        max_sources: usize,
        max_concurrent_tasks: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            discovery,
            processor,
            ledger,
            alerter,
            max_sources,
            max_concurrent_tasks,
            task_timeout,
        }
    }

    /// Run one discovery cycle. Returns `None` when the budget gate skips
    /// the cycle entirely.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        if !self.ledger.allows_cycle() {
            warn!(
                remaining = self.ledger.remaining(),
                "budget too low, skipping discovery cycle"
            );
            return None;
        }

        let cycle_id = Uuid::new_v4();
        info!(%cycle_id, "discovery cycle starting");

        let events = match self.discovery.find_trigger_events(self.max_sources).await {
            Ok(events) => events,
            Err(err) => {
                error!(%cycle_id, error = %err, "discovery failed");
                self.alerter
                    .alert(&format!("Discovery cycle {cycle_id} failed: {err}"))
                    .await;
                return Some(CycleReport::default());
            }
        };

        // Concurrency is bounded by taking at most N triggers per cycle;
        // the rest will surface again on a later pass of their sources.
        let mut report = CycleReport::default();
        let batch: Vec<TriggerEvent> =
            events.into_iter().take(self.max_concurrent_tasks).collect();
        report.triggers = batch.len();

        // The deadline is armed inside each task, so every trigger gets the
        // full timeout from its own start and hung tasks expire in parallel
        // instead of serializing through the fan-in loop.
        let handles: Vec<_> = batch
            .into_iter()
            .map(|event| {
                let processor = self.processor.clone();
                let deadline = self.task_timeout;
                tokio::spawn(async move {
                    tokio::time::timeout(deadline, processor.process(event)).await
                })
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok(Ok(TriggerOutcome::Success)) => report.succeeded += 1,
                Ok(Ok(TriggerOutcome::HandledFailure)) => report.failed += 1,
                Ok(Err(_elapsed)) => {
                    warn!(%cycle_id, "trigger task exceeded timeout");
                    report.failed += 1;
                }
                Err(join_err) => {
                    error!(%cycle_id, error = %join_err, "trigger task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            %cycle_id,
            triggers = report.triggers,
            succeeded = report.succeeded,
            failed = report.failed,
            remaining_budget = self.ledger.remaining(),
            "discovery cycle complete"
        );
        Some(report)
    }
}
