//! Service graph construction from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use emberline_budget::{BudgetLedger, RateTable};
use emberline_channels::{FileRenderer, SmtpMailer, StubPoster, TelegramAlerter};
use emberline_config::AppConfig;
use emberline_core::{Alerter, TextGenerator};
use emberline_gateway::ModelGateway;
use emberline_pipeline::{
    BrandingCycle, CycleOrchestrator, HttpFetcher, NullContactLookup, OutreachPipeline,
    OutreachSequencer, PacingConfig, PricingPlan, ReportFulfillment, ServiceTier, TargetAnalyzer,
    TriggerDiscovery,
};
use emberline_voice::{PlatformVoice, VoiceAgent, VoiceConfig};
use tracing::info;

use crate::scheduler::Scheduler;
use crate::AppState;

/// Everything the process runs: the HTTP state plus the background loops.
pub struct Services {
    pub state: Arc<AppState>,
    pub orchestrator: Arc<CycleOrchestrator>,
    pub branding: Arc<BrandingCycle>,
    pub ledger: Arc<BudgetLedger>,
}

pub fn build_services(config: &AppConfig) -> anyhow::Result<Services> {
    let alerter: Arc<dyn Alerter> = Arc::new(TelegramAlerter::new(&config.alerts));

    let ledger = Arc::new(BudgetLedger::new(
        config.budget.initial,
        config.budget.warn_threshold,
        RateTable::with_defaults(),
        alerter.clone(),
    ));

    let gateway: Arc<dyn TextGenerator> = Arc::new(
        ModelGateway::from_config(&config.ai, ledger.clone(), alerter.clone())
            .context("building model gateway")?,
    );

    let discovery = Arc::new(TriggerDiscovery::new(
        Arc::new(HttpFetcher::new().context("building source fetcher")?),
        config.pipeline.sources.clone(),
    ));

    let analyzer = Arc::new(TargetAnalyzer::new(
        gateway.clone(),
        Arc::new(NullContactLookup),
        config.pipeline.target_countries.clone(),
        config.pipeline.target_industries.clone(),
        config.pipeline.max_targets_per_trigger,
    ));

    let mailer = Arc::new(SmtpMailer::new(&config.email));

    let pricing = PricingPlan {
        standard_price: config.pricing.standard,
        premium_price: config.pricing.premium,
        standard_link: config.pricing.standard_link.clone(),
        premium_link: config.pricing.premium_link.clone(),
    };
    let sequencer = Arc::new(OutreachSequencer::new(
        gateway.clone(),
        mailer.clone(),
        pricing,
        PacingConfig::default(),
    ));

    let processor = Arc::new(OutreachPipeline::new(
        analyzer,
        sequencer,
        ServiceTier::Standard,
    ));

    let orchestrator = Arc::new(CycleOrchestrator::new(
        discovery,
        processor,
        ledger.clone(),
        alerter.clone(),
        config.pipeline.max_sources,
        config.pipeline.max_concurrent_tasks,
        Duration::from_secs(config.pipeline.task_timeout_secs),
    ));

    let voice = Arc::new(VoiceAgent::new(
        gateway.clone(),
        Arc::new(PlatformVoice),
        alerter.clone(),
        VoiceConfig {
            session_ttl: Duration::from_secs(config.voice.session_ttl_secs),
            max_turns: config.voice.max_turns,
            standard_price: config.pricing.standard,
            premium_price: config.pricing.premium,
        },
    ));

    let fulfillment = Arc::new(ReportFulfillment::new(
        gateway.clone(),
        Arc::new(FileRenderer),
        mailer,
        alerter.clone(),
    ));

    let branding = Arc::new(BrandingCycle::new(gateway, Arc::new(StubPoster)));

    let state = Arc::new(AppState::new(
        voice,
        fulfillment,
        config.payments.webhook_secret.clone(),
    ));

    Ok(Services {
        state,
        orchestrator,
        branding,
        ledger,
    })
}

/// Build everything, start the scheduler, and serve until shutdown.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let services = build_services(&config)?;

    let scheduler = Scheduler::new(
        services.orchestrator.clone(),
        services.branding.clone(),
        Duration::from_secs(config.pipeline.cycle_interval_secs),
    );
    scheduler.start();

    let router = crate::build_router(services.state.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, remaining_budget = services.ledger.remaining(), "server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
