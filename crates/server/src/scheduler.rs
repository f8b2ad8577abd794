//! Background loops: the automation cycle and the branding cadence.

use std::sync::Arc;
use std::time::Duration;

use emberline_pipeline::{BrandingCycle, CycleOrchestrator};
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::info;

const BRANDING_MIN_SECS: u64 = 4 * 3600;
const BRANDING_MAX_SECS: u64 = 8 * 3600;

pub struct Scheduler {
    orchestrator: Arc<CycleOrchestrator>,
    branding: Arc<BrandingCycle>,
    cycle_interval: Duration,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<CycleOrchestrator>,
        branding: Arc<BrandingCycle>,
        cycle_interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            branding,
            cycle_interval,
        }
    }

    /// Spawn the two loops. The returned handles run until the process
    /// exits; the server keeps them alive alongside the listener.
    pub fn start(self) -> (JoinHandle<()>, JoinHandle<()>) {
        let cycle_handle = {
            let orchestrator = self.orchestrator;
            let interval = self.cycle_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                // The first tick of an interval is immediate.
                ticker.tick().await;
                loop {
                    if let Some(report) = orchestrator.run_cycle().await {
                        info!(
                            triggers = report.triggers,
                            succeeded = report.succeeded,
                            failed = report.failed,
                            "scheduled cycle finished"
                        );
                    }
                    ticker.tick().await;
                }
            })
        };

        let branding_handle = {
            let branding = self.branding;
            tokio::spawn(async move {
                loop {
                    let sleep_secs =
                        rand::rng().random_range(BRANDING_MIN_SECS..=BRANDING_MAX_SECS);
                    info!(sleep_secs, "next branding pass scheduled");
                    tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
                    branding.run().await;
                }
            })
        };

        (cycle_handle, branding_handle)
    }
}
