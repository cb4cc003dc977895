//! Configuration loading, validation, and management for Prepwire.
//!
//! Loads configuration from `~/.prepwire/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.prepwire/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat model sent upstream
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Upstream credentials, endpoints and transport policy
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Conversation progression thresholds and generation budgets
    #[serde(default)]
    pub interview: InterviewConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS. Empty = same-origin only.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Optional static secret required on every `/api/*` call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,

    /// Include upstream error text in error bodies (development only).
    #[serde(default)]
    pub expose_error_details: bool,

    /// Handler-level deadline; exceeding it yields 408.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Requests per client per minute (0 disables the limiter).
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: usize,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}
fn default_request_timeout() -> u64 {
    90
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_rate_limit() -> usize {
    60
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: vec![],
            shared_secret: None,
            expose_error_details: false,
            request_timeout_secs: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
            rate_limit_per_minute: default_rate_limit(),
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("shared_secret", &redact(&self.shared_secret))
            .field("expose_error_details", &self.expose_error_details)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("body_limit_bytes", &self.body_limit_bytes)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,

    /// Without an OpenAI key, speech synthesis is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    /// Per-attempt upstream timeout.
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,

    /// Additional attempts after a transient failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_tts_model() -> String {
    "tts-1".into()
}
fn default_upstream_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: None,
            openai_api_key: None,
            openai_base_url: None,
            tts_model: default_tts_model(),
            timeout_secs: default_upstream_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl std::fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("tts_model", &self.tts_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// User turns after which the interview is nearing its end.
    #[serde(default = "default_nearing_end_after")]
    pub nearing_end_after: usize,

    /// User turns at which the interviewer must conclude with feedback.
    #[serde(default = "default_final_after")]
    pub final_after: usize,

    /// Max characters of a reply fed to inline speech synthesis.
    #[serde(default = "default_inline_speech_chars")]
    pub inline_speech_chars: usize,

    #[serde(default)]
    pub budgets: BudgetConfig,
}

fn default_nearing_end_after() -> usize {
    7
}
fn default_final_after() -> usize {
    9
}
/// Upper bound for `inline_speech_chars`: strictly below the 10 000 char reply cap.
pub const MAX_INLINE_SPEECH_CHARS: usize = 9_999;

fn default_inline_speech_chars() -> usize {
    1000
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            nearing_end_after: default_nearing_end_after(),
            final_after: default_final_after(),
            inline_speech_chars: default_inline_speech_chars(),
            budgets: BudgetConfig::default(),
        }
    }
}

/// Max output tokens per progress tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_initial_budget")]
    pub initial: u32,

    #[serde(default = "default_early_budget")]
    pub early: u32,

    #[serde(default = "default_early_budget")]
    pub nearing_end: u32,

    #[serde(rename = "final", default = "default_final_budget")]
    pub concluding: u32,
}

fn default_initial_budget() -> u32 {
    300
}
fn default_early_budget() -> u32 {
    450
}
fn default_final_budget() -> u32 {
    2000
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_budget(),
            early: default_early_budget(),
            nearing_end: default_early_budget(),
            concluding: default_final_budget(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.prepwire/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides and re-validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (highest priority).
    ///
    /// - `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`
    /// - `PREPWIRE_SHARED_SECRET`, `PREPWIRE_MODEL`
    /// - `PREPWIRE_PORT` (falls back to `PORT`), `PREPWIRE_HOST`
    /// - `PREPWIRE_ALLOWED_ORIGINS` (comma-separated)
    /// - `PREPWIRE_ENV=development` enables error details
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.upstream.anthropic_api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.upstream.openai_api_key = Some(key);
        }
        if let Some(secret) = non_empty("PREPWIRE_SHARED_SECRET") {
            self.gateway.shared_secret = Some(secret);
        }
        if let Some(model) = non_empty("PREPWIRE_MODEL") {
            self.model = model;
        }
        if let Some(host) = non_empty("PREPWIRE_HOST") {
            self.gateway.host = host;
        }
        let port = non_empty("PREPWIRE_PORT").or_else(|| non_empty("PORT"));
        if let Some(port) = port.and_then(|p| p.trim().parse().ok()) {
            self.gateway.port = port;
        }
        if let Some(origins) = non_empty("PREPWIRE_ALLOWED_ORIGINS") {
            self.gateway.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if non_empty("PREPWIRE_ENV").is_some_and(|env| env.eq_ignore_ascii_case("development")) {
            self.gateway.expose_error_details = true;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".prepwire")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 1.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 1.0".into(),
            ));
        }

        if self.gateway.request_timeout_secs == 0 || self.upstream.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".into(),
            ));
        }

        let interview = &self.interview;
        if interview.nearing_end_after == 0 || interview.nearing_end_after >= interview.final_after
        {
            return Err(ConfigError::ValidationError(
                "interview.nearing_end_after must be > 0 and < interview.final_after".into(),
            ));
        }

        let b = &interview.budgets;
        if b.initial == 0 || b.initial > b.early || b.early > b.nearing_end || b.nearing_end > b.concluding
        {
            return Err(ConfigError::ValidationError(
                "interview.budgets must be non-zero and non-decreasing (initial <= early <= nearing_end <= final)".into(),
            ));
        }

        if interview.inline_speech_chars == 0 || interview.inline_speech_chars > MAX_INLINE_SPEECH_CHARS {
            return Err(ConfigError::ValidationError(format!(
                "interview.inline_speech_chars must be between 1 and {MAX_INLINE_SPEECH_CHARS}"
            )));
        }

        Ok(())
    }

    /// Every configured credential, for log scrubbing.
    pub fn secrets(&self) -> Vec<String> {
        [
            &self.upstream.anthropic_api_key,
            &self.upstream.openai_api_key,
            &self.gateway.shared_secret,
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect()
    }

    /// Whether the chat upstream has a key.
    pub fn has_chat_key(&self) -> bool {
        self.upstream.anthropic_api_key.is_some()
    }

    /// Whether speech synthesis can be enabled.
    pub fn has_speech_key(&self) -> bool {
        self.upstream.openai_api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            gateway: GatewayConfig::default(),
            upstream: UpstreamConfig::default(),
            interview: InterviewConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
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

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.interview.nearing_end_after, 7);
        assert_eq!(config.interview.final_after, 9);
        assert!(!config.gateway.expose_error_details);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.interview.budgets.concluding, 2000);
    }

    #[test]
    fn final_budget_uses_final_key() {
        let parsed: AppConfig = toml::from_str(
            r#"
[interview.budgets]
final = 3000
"#,
        )
        .unwrap();
        assert_eq!(parsed.interview.budgets.concluding, 3000);
        assert_eq!(parsed.interview.budgets.initial, 300);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.interview.nearing_end_after = 9;
        config.interview.final_after = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn inline_speech_must_stay_below_reply_cap() {
        let mut config = AppConfig::default();
        config.interview.inline_speech_chars = 10_000;
        assert!(config.validate().is_err());
        config.interview.inline_speech_chars = 0;
        assert!(config.validate().is_err());
        config.interview.inline_speech_chars = MAX_INLINE_SPEECH_CHARS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn decreasing_budgets_rejected() {
        let mut config = AppConfig::default();
        config.interview.budgets.concluding = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.gateway.port, 3000);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "claude-haiku"
[gateway]
port = 8088
allowed_origins = ["https://app.example.com"]
"#,
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "claude-haiku");
        assert_eq!(config.gateway.port, 8088);
        assert_eq!(config.gateway.allowed_origins.len(), 1);
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[
            ("ANTHROPIC_API_KEY", "sk-ant-123"),
            ("OPENAI_API_KEY", "sk-openai-456"),
            ("PORT", "9000"),
            ("PREPWIRE_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("PREPWIRE_ENV", "development"),
        ]));
        assert_eq!(config.upstream.anthropic_api_key.as_deref(), Some("sk-ant-123"));
        assert!(config.has_speech_key());
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(
            config.gateway.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert!(config.gateway.expose_error_details);
    }

    #[test]
    fn prepwire_port_wins_over_port() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("PORT", "9000"), ("PREPWIRE_PORT", "9100")]));
        assert_eq!(config.gateway.port, 9100);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("ANTHROPIC_API_KEY", "  ")]));
        assert!(!config.has_chat_key());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.upstream.anthropic_api_key = Some("sk-ant-very-secret".into());
        config.gateway.shared_secret = Some("hunter2".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-ant-very-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn secrets_lists_configured_credentials() {
        let mut config = AppConfig::default();
        config.upstream.openai_api_key = Some("sk-openai".into());
        config.gateway.shared_secret = Some(String::new());
        assert_eq!(config.secrets(), vec!["sk-openai".to_string()]);
    }
}
