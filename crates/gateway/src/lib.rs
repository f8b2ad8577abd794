//! The model gateway: a single choke point for every LLM call.
//!
//! Responsibilities, in order of application: response cache lookup, retry
//! with exponential backoff for transient failures, budget accounting on
//! success, and operator alerts for fatal failure classes. Callers only see
//! [`TextGenerator`]; everything else is internal policy.

mod backend;
mod tiers;

pub use backend::OpenRouterBackend;
pub use tiers::model_for;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use emberline_budget::BudgetLedger;
use emberline_config::AiConfig;
use emberline_core::{
    retry_with_backoff, Alerter, GatewayError, GenerateRequest, ModelBackend, RetryPolicy,
    TextGenerator, TokenUsage,
};
use emberline_store::{cache_key, TtlCache};
use tracing::{debug, warn};

/// Cached, retrying, budget-aware text generation.
pub struct ModelGateway {
    backend: Arc<dyn ModelBackend>,
    ledger: Arc<BudgetLedger>,
    alerter: Arc<dyn Alerter>,
    cache: TtlCache<String, String>,
    policy: RetryPolicy,
}

impl ModelGateway {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        ledger: Arc<BudgetLedger>,
        alerter: Arc<dyn Alerter>,
        cache_ttl: Duration,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            ledger,
            alerter,
            cache: TtlCache::new(cache_ttl),
            policy,
        }
    }

    /// Gateway configured from the `[ai]` config section.
    pub fn from_config(
        config: &AiConfig,
        ledger: Arc<BudgetLedger>,
        alerter: Arc<dyn Alerter>,
    ) -> Result<Self, GatewayError> {
        let backend = OpenRouterBackend::new(
            &config.base_url,
            &config.api_key,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(
            Arc::new(backend),
            ledger,
            alerter,
            Duration::from_secs(config.cache_ttl_secs),
            RetryPolicy::new(config.retry_attempts, Duration::from_secs(1)),
        ))
    }

    /// When the API reports no usage, approximate tokens from word counts.
    /// English text averages roughly 0.7 words per token.
    fn estimate_usage(prompt: &str, completion: &str) -> TokenUsage {
        let estimate = |text: &str| {
            let words = text.split_whitespace().count() as f64;
            (words / 0.7).ceil() as u32
        };
        TokenUsage {
            input_tokens: estimate(prompt),
            output_tokens: estimate(completion),
        }
    }
}

#[async_trait]
impl TextGenerator for ModelGateway {
    async fn generate(&self, request: GenerateRequest) -> Result<String, GatewayError> {
        let model = model_for(request.tier);
        let key = cache_key(
            "generate",
            &[
                model,
                &request.prompt,
                &request.max_tokens.to_string(),
                &request.temperature.to_bits().to_string(),
            ],
        );

        if let Some(hit) = self.cache.get(&key).await {
            debug!(model, "gateway cache hit");
            return Ok(hit);
        }

        let result = retry_with_backoff(
            &self.policy,
            "model_generate",
            GatewayError::is_retryable,
            || async { self.backend.generate(model, &request).await },
        )
        .await;

        match result {
            Ok(outcome) => {
                let usage = outcome
                    .usage
                    .unwrap_or_else(|| Self::estimate_usage(&request.prompt, &outcome.text));

                // Accounting must not add latency to the caller's path.
                let ledger = self.ledger.clone();
                let model_name = outcome.model.clone();
                tokio::spawn(async move {
                    ledger
                        .record_usage(
                            &model_name,
                            u64::from(usage.input_tokens),
                            u64::from(usage.output_tokens),
                        )
                        .await;
                });

                self.cache.insert(key, outcome.text.clone()).await;
                Ok(outcome.text)
            }
            Err(err) => {
                match &err {
                    GatewayError::Auth(_) | GatewayError::QuotaExceeded(_) => {
                        self.alerter
                            .alert(&format!("Model gateway fatal error: {err}"))
                            .await;
                    }
                    GatewayError::MalformedResponse(_) | GatewayError::Api { .. } => {
                        warn!(model, error = %err, "model call failed without retry");
                    }
                    _ => {
                        // Transient class that survived all retries.
                        self.alerter
                            .alert(&format!("Model gateway retries exhausted: {err}"))
                            .await;
                        return Err(GatewayError::Exhausted(err.to_string()));
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberline_budget::RateTable;
    use emberline_core::{GenerateOutcome, LogAlerter, ModelTier};
    use std::sync::Mutex;

    struct ScriptedBackend {
        responses: Mutex<Vec<Result<GenerateOutcome, GatewayError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(responses: Vec<Result<GenerateOutcome, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    fn outcome(text: &str) -> GenerateOutcome {
        GenerateOutcome {
            text: text.to_string(),
            model: "google/gemini-pro".to_string(),
            usage: Some(TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            }),
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            _model: &str,
            _request: &GenerateRequest,
        ) -> Result<GenerateOutcome, GatewayError> {
            *self.calls.lock().unwrap() += 1;
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn gateway(backend: Arc<ScriptedBackend>) -> (ModelGateway, Arc<BudgetLedger>) {
        let ledger = Arc::new(BudgetLedger::new(
            50.0,
            10.0,
            RateTable::with_defaults(),
            Arc::new(LogAlerter),
        ));
        let gw = ModelGateway::new(
            backend,
            ledger.clone(),
            Arc::new(LogAlerter),
            Duration::from_secs(3600),
            RetryPolicy::new(2, Duration::from_millis(1)),
        );
        (gw, ledger)
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let backend = ScriptedBackend::new(vec![
            Err(GatewayError::Timeout("deadline".into())),
            Err(GatewayError::Network("reset".into())),
            Ok(outcome("done")),
        ]);
        let (gw, _) = gateway(backend.clone());

        let text = gw.generate(GenerateRequest::new("p", ModelTier::Balanced)).await.unwrap();
        assert_eq!(text, "done");
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn auth_failure_gets_single_attempt() {
        let backend = ScriptedBackend::new(vec![Err(GatewayError::Auth("401".into()))]);
        let (gw, _) = gateway(backend.clone());

        let err = gw
            .generate(GenerateRequest::new("p", ModelTier::Fast))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_map_to_exhausted() {
        let backend = ScriptedBackend::new(vec![
            Err(GatewayError::Timeout("deadline".into())),
            Err(GatewayError::Timeout("deadline".into())),
            Err(GatewayError::Timeout("deadline".into())),
        ]);
        let (gw, _) = gateway(backend.clone());

        let err = gw
            .generate(GenerateRequest::new("p", ModelTier::Balanced))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Exhausted(_)));
        assert_eq!(backend.calls(), 3);
    }

    #[tokio::test]
    async fn identical_requests_hit_the_cache() {
        let backend = ScriptedBackend::new(vec![Ok(outcome("cached"))]);
        let (gw, _) = gateway(backend.clone());

        let request = GenerateRequest::new("same prompt", ModelTier::Flash);
        let first = gw.generate(request.clone()).await.unwrap();
        let second = gw.generate(request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn different_parameters_miss_the_cache() {
        let backend =
            ScriptedBackend::new(vec![Ok(outcome("a")), Ok(outcome("b"))]);
        let (gw, _) = gateway(backend.clone());

        gw.generate(GenerateRequest::new("p", ModelTier::Flash)).await.unwrap();
        gw.generate(GenerateRequest::new("p", ModelTier::Flash).with_max_tokens(60))
            .await
            .unwrap();

        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn successful_call_charges_the_ledger() {
        let backend = ScriptedBackend::new(vec![Ok(outcome("done"))]);
        let (gw, ledger) = gateway(backend);

        gw.generate(GenerateRequest::new("p", ModelTier::Balanced)).await.unwrap();
        // Accounting runs on a spawned task.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(ledger.remaining() < 50.0);
    }

    #[test]
    fn token_estimate_inflates_word_count() {
        let usage = ModelGateway::estimate_usage("one two three four five six seven", "one two");
        assert_eq!(usage.input_tokens, 10); // ceil(7 / 0.7)
        assert_eq!(usage.output_tokens, 3); // ceil(2 / 0.7)
    }
}
