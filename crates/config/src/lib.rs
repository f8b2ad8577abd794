//! Configuration loading, validation, and management for Emberline.
//!
//! Loads configuration from a TOML file with environment variable overrides
//! (`EMBERLINE_*`). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// AI provider settings
    #[serde(default)]
    pub ai: AiConfig,

    /// Spend budget settings
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Automation cycle settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Two-tier service pricing
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Outbound email transport
    #[serde(default)]
    pub email: EmailConfig,

    /// Payment webhook settings
    #[serde(default)]
    pub payments: PaymentsConfig,

    /// Voice session settings
    #[serde(default)]
    pub voice: VoiceConfig,

    /// Operator alert settings
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &str) -> &'static str {
    if s.is_empty() { "\"\"" } else { "[REDACTED]" }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("ai", &self.ai)
            .field("budget", &self.budget)
            .field("pipeline", &self.pipeline)
            .field("pricing", &self.pricing)
            .field("email", &self.email)
            .field("payments", &self.payments)
            .field("voice", &self.voice)
            .field("alerts", &self.alerts)
            .field("server", &self.server)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// OpenRouter API key.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,

    /// Extra attempts after the first for retryable failures.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// TTL for the response cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_ai_timeout() -> u64 {
    60
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_cache_ttl() -> u64 {
    3600
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_ai_timeout(),
            retry_attempts: default_retry_attempts(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

impl std::fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_attempts", &self.retry_attempts)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Starting budget in USD.
    #[serde(default = "default_initial_budget")]
    pub initial: f64,

    /// Threshold below which a single warning alert fires.
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: f64,
}

fn default_initial_budget() -> f64 {
    50.0
}
fn default_warn_threshold() -> f64 {
    10.0
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_budget(),
            warn_threshold: default_warn_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Candidate sources fetched per discovery run.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,

    /// Concurrent per-trigger tasks per cycle.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_tasks: usize,

    /// Per-trigger task timeout.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,

    /// Automation cycle cadence.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,

    /// Candidate source URLs for trigger discovery.
    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default = "default_countries")]
    pub target_countries: Vec<String>,

    #[serde(default = "default_industries")]
    pub target_industries: Vec<String>,

    /// Cap on targets accepted from one trigger analysis.
    #[serde(default = "default_max_targets")]
    pub max_targets_per_trigger: usize,
}

fn default_max_sources() -> usize {
    5
}
fn default_max_concurrent() -> usize {
    3
}
fn default_task_timeout() -> u64 {
    300
}
fn default_cycle_interval() -> u64 {
    3600
}
fn default_countries() -> Vec<String> {
    ["US", "UK", "DE", "CA", "AU"].map(String::from).to_vec()
}
fn default_industries() -> Vec<String> {
    ["Technology", "Finance", "Healthcare", "Industrials"]
        .map(String::from)
        .to_vec()
}
fn default_max_targets() -> usize {
    5
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            max_concurrent_tasks: default_max_concurrent(),
            task_timeout_secs: default_task_timeout(),
            cycle_interval_secs: default_cycle_interval(),
            sources: vec![],
            target_countries: default_countries(),
            target_industries: default_industries(),
            max_targets_per_trigger: default_max_targets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_standard_price")]
    pub standard: u32,

    #[serde(default = "default_premium_price")]
    pub premium: u32,

    #[serde(default)]
    pub standard_link: String,

    #[serde(default)]
    pub premium_link: String,
}

fn default_standard_price() -> u32 {
    750
}
fn default_premium_price() -> u32 {
    1200
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            standard: default_standard_price(),
            premium: default_premium_price(),
            standard_link: String::new(),
            premium_link: String::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_user: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default)]
    pub from_address: String,

    /// Log shaped messages instead of delivering them. On by default until
    /// a relay account exists; sends fail loudly when this is off.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

fn default_smtp_port() -> u16 {
    587
}
fn default_dry_run() -> bool {
    true
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_address: String::new(),
            dry_run: default_dry_run(),
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &redact(&self.smtp_password))
            .field("from_address", &self.from_address)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct PaymentsConfig {
    /// Shared secret for webhook HMAC verification.
    #[serde(default)]
    pub webhook_secret: String,
}

impl std::fmt::Debug for PaymentsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentsConfig")
            .field("webhook_secret", &redact(&self.webhook_secret))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Session expiry for abandoned calls.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Conversation exchanges before the call is wound down.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

fn default_session_ttl() -> u64 {
    900
}
fn default_max_turns() -> usize {
    10
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            max_turns: default_max_turns(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AlertsConfig {
    #[serde(default)]
    pub telegram_bot_token: String,

    #[serde(default)]
    pub telegram_chat_id: String,
}

impl std::fmt::Debug for AlertsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertsConfig")
            .field("telegram_bot_token", &redact(&self.telegram_bot_token))
            .field("telegram_chat_id", &self.telegram_chat_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load from the default path (`./emberline.toml`) with env overrides.
    ///
    /// Recognized environment variables:
    /// - `EMBERLINE_API_KEY` / `OPENROUTER_API_KEY`
    /// - `EMBERLINE_WEBHOOK_SECRET`
    /// - `EMBERLINE_TELEGRAM_BOT_TOKEN`, `EMBERLINE_TELEGRAM_CHAT_ID`
    /// - `EMBERLINE_SMTP_PASSWORD`
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("emberline.toml"))
    }

    /// Load from a specific file path, then apply env overrides and validate.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            tracing::info!("No config file found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.ai.api_key.is_empty() {
            if let Some(key) = std::env::var("EMBERLINE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            {
                self.ai.api_key = key;
            }
        }
        if let Ok(secret) = std::env::var("EMBERLINE_WEBHOOK_SECRET") {
            self.payments.webhook_secret = secret;
        }
        if let Ok(token) = std::env::var("EMBERLINE_TELEGRAM_BOT_TOKEN") {
            self.alerts.telegram_bot_token = token;
        }
        if let Ok(chat) = std::env::var("EMBERLINE_TELEGRAM_CHAT_ID") {
            self.alerts.telegram_chat_id = chat;
        }
        if let Ok(password) = std::env::var("EMBERLINE_SMTP_PASSWORD") {
            self.email.smtp_password = password;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget.initial <= 0.0 {
            return Err(ConfigError::ValidationError(
                "budget.initial must be positive".into(),
            ));
        }
        if self.budget.warn_threshold <= 0.0 || self.budget.warn_threshold > self.budget.initial {
            return Err(ConfigError::ValidationError(
                "budget.warn_threshold must be positive and at most budget.initial".into(),
            ));
        }
        if self.pipeline.max_concurrent_tasks == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_concurrent_tasks must be at least 1".into(),
            ));
        }
        if self.pipeline.max_sources == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.max_sources must be at least 1".into(),
            ));
        }
        if self.voice.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "voice.max_turns must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.budget.initial - 50.0).abs() < 1e-10);
        assert!((config.budget.warn_threshold - 10.0).abs() < 1e-10);
        assert_eq!(config.pipeline.max_concurrent_tasks, 3);
        assert_eq!(config.voice.max_turns, 10);
        assert_eq!(config.pricing.standard, 750);
        assert_eq!(config.pricing.premium, 1200);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.pipeline.target_countries, config.pipeline.target_countries);
    }

    #[test]
    fn email_defaults_are_safe() {
        let email = EmailConfig::default();
        assert_eq!(email.smtp_port, 587);
        assert!(email.dry_run);
    }

    #[test]
    fn default_allowlists() {
        let config = AppConfig::default();
        assert_eq!(
            config.pipeline.target_countries,
            vec!["US", "UK", "DE", "CA", "AU"]
        );
        assert!(config.pipeline.target_industries.contains(&"Finance".to_string()));
    }

    #[test]
    fn invalid_budget_rejected() {
        let config = AppConfig {
            budget: BudgetConfig {
                initial: -1.0,
                warn_threshold: 10.0,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn warn_threshold_above_budget_rejected() {
        let config = AppConfig {
            budget: BudgetConfig {
                initial: 5.0,
                warn_threshold: 10.0,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut config = AppConfig::default();
        config.pipeline.max_concurrent_tasks = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/emberline.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().server.port, 8080);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emberline.toml");
        std::fs::write(
            &path,
            r#"
[budget]
initial = 200.0

[pricing]
standard = 500
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert!((config.budget.initial - 200.0).abs() < 1e-10);
        assert!((config.budget.warn_threshold - 10.0).abs() < 1e-10);
        assert_eq!(config.pricing.standard, 500);
        assert_eq!(config.pricing.premium, 1200);
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.ai.api_key = "sk-or-secret".into();
        config.payments.webhook_secret = "whsec".into();
        config.email.smtp_password = "hunter2".into();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-or-secret"));
        assert!(!debug.contains("whsec"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
