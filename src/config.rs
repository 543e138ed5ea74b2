use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variables the relay cannot start without
pub const REQUIRED_ENV_VARS: &[&str] = &[
    "TELEGRAM_BOT_TOKEN",
    "TELEGRAM_BOT_USERNAME",
    "FRESHDESK_API_KEY",
    "FRESHDESK_DOMAIN",
];

/// Environment variables with usable defaults
pub const OPTIONAL_ENV_VARS: &[&str] = &["WEBHOOK_PORT", "WEBHOOK_URL"];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Webhook/API server configuration
    pub server: ServerConfig,

    /// Down-alert store configuration
    pub state: StateConfig,

    /// Freshdesk API configuration
    pub freshdesk: FreshdeskConfig,

    /// Telegram bot configuration
    pub telegram: TelegramConfig,

    /// Correlation engine configuration
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Webhook receiver configuration
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> std::result::Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: HELPDESK_RELAY_)
            .add_source(
                config::Environment::with_prefix("HELPDESK_RELAY")
                    .separator("__")
                    .try_parsing(true),
            );

        // The plain WEBHOOK_PORT variable wins over everything else
        if let Some(port) = std::env::var("WEBHOOK_PORT")
            .ok()
            .and_then(|p| p.parse::<i64>().ok())
        {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// State backend type
    #[serde(default)]
    pub backend: StateBackend,

    /// Path for the embedded database
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    #[default]
    Sled,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshdeskConfig {
    /// Env var holding the Freshdesk domain (e.g. "acme.freshdesk.com")
    #[serde(default = "default_freshdesk_domain_env")]
    pub domain_env: String,

    /// Env var holding the Freshdesk API key
    #[serde(default = "default_freshdesk_api_key_env")]
    pub api_key_env: String,

    /// HTTP timeout for Freshdesk calls (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl FreshdeskConfig {
    /// Resolve (domain, api_key) from the configured env vars
    pub fn credentials(&self) -> Result<(String, String)> {
        Ok((require_env(&self.domain_env)?, require_env(&self.api_key_env)?))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Env var holding the bot token
    #[serde(default = "default_telegram_token_env")]
    pub bot_token_env: String,

    /// Env var holding the bot username
    #[serde(default = "default_telegram_username_env")]
    pub bot_username_env: String,

    /// Bot API base URL
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,

    /// Enable getUpdates long polling for chat commands
    #[serde(default = "default_true")]
    pub polling_enabled: bool,

    /// Long-poll timeout passed to getUpdates (seconds)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Pause after a failed poll (seconds)
    #[serde(default = "default_poll_backoff")]
    pub poll_backoff_secs: u64,

    /// HTTP timeout for sendMessage calls (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    pub fn bot_token(&self) -> Result<String> {
        require_env(&self.bot_token_env)
    }

    pub fn bot_username(&self) -> Option<String> {
        std::env::var(&self.bot_username_env).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Enable DOWN/UP correlation on new tickets
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Number of recent webhook events kept for /webhook/logs
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Env var holding the public webhook URL (shown by /test)
    #[serde(default = "default_webhook_url_env")]
    pub public_url_env: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            log_capacity: default_log_capacity(),
            public_url_env: default_webhook_url_env(),
        }
    }
}

impl WebhookConfig {
    pub fn public_url(&self) -> Option<String> {
        std::env::var(&self.public_url_env).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

/// Outcome of checking the process environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentReport {
    pub missing: Vec<String>,
    pub warnings: Vec<String>,
}

impl EnvironmentReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Check required and optional environment variables
pub fn check_environment<F>(lookup: F) -> EnvironmentReport
where
    F: Fn(&str) -> Option<String>,
{
    let present = |key: &str| lookup(key).map(|v| !v.is_empty()).unwrap_or(false);

    let missing = REQUIRED_ENV_VARS
        .iter()
        .filter(|key| !present(key))
        .map(|key| key.to_string())
        .collect();

    let warnings = OPTIONAL_ENV_VARS
        .iter()
        .filter(|key| !present(key))
        .map(|key| format!("{} not set, using default", key))
        .collect();

    EnvironmentReport { missing, warnings }
}

/// Validate the process environment, failing when required variables are absent
pub fn validate_environment() -> Result<EnvironmentReport> {
    let report = check_environment(|key| std::env::var(key).ok());

    if !report.is_valid() {
        let list = report
            .missing
            .iter()
            .map(|k| format!("  - {}", k))
            .collect::<Vec<_>>()
            .join("\n");
        return Err(AppError::Configuration(format!(
            "Missing required environment variables:\n{}",
            list
        )));
    }

    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }

    Ok(report)
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(AppError::Configuration(format!(
            "Environment variable {} is not set",
            name
        ))),
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_timeout() -> u64 {
    10
}

fn default_freshdesk_domain_env() -> String {
    "FRESHDESK_DOMAIN".to_string()
}

fn default_freshdesk_api_key_env() -> String {
    "FRESHDESK_API_KEY".to_string()
}

fn default_telegram_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_telegram_username_env() -> String {
    "TELEGRAM_BOT_USERNAME".to_string()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_poll_backoff() -> u64 {
    5
}

fn default_log_capacity() -> usize {
    200
}

fn default_webhook_url_env() -> String {
    "WEBHOOK_URL".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
