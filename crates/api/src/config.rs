// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server configuration module
//!
//! Configuration structures and hierarchical loading for the classification
//! service. Policy values (rate limit, window, confidence threshold) live here
//! rather than as literals so deployments can tune them.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Result, anyhow, ensure};
use config::{Config, ConfigError, Environment as ConfigEnv, File};
use feedback_store::DEFAULT_FEEDBACK_PATH;
use serde::{Deserialize, Deserializer, Serialize, de};
use url::Url;
use waste_classifier::{
    NormalizationPolicy, OpenAiConfig,
    config::{DEFAULT_MAX_COMPLETION_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECONDS},
    normalizer::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FALLBACK_CONFIDENCE},
};

use crate::error::{ServerError, ServerResult};

/// Default number of classification requests per client and window
pub const DEFAULT_MAX_REQUESTS: u32 = 10;

/// Default rate limit window in milliseconds
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Default bound on the number of clients tracked by the rate limiter
pub const DEFAULT_MAX_TRACKED_CLIENTS: usize = 10_000;

/// A validated server port that ensures the value is appropriate for the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPort {
    port: u16,
    environment: Environment,
}

impl ServerPort {
    /// Create a new `ServerPort`, ensuring it's valid for the given environment
    ///
    /// # Errors
    ///
    /// Returns an error if the port is 0 in non-testing environments
    pub fn new(port: u16, environment: Environment) -> Result<Self> {
        if port == 0 && environment != Environment::Testing {
            return Err(anyhow!("port cannot be 0 in non-testing environments"));
        }
        Ok(Self { port, environment })
    }

    /// Create a safe default port for development
    pub const fn default_development() -> Self {
        Self {
            port: 3000,
            environment: Environment::Development,
        }
    }

    /// Create a safe testing port (port 0)
    pub const fn testing() -> Self {
        Self {
            port: 0,
            environment: Environment::Testing,
        }
    }

    /// Get the port value
    pub fn value(&self) -> u16 {
        self.port
    }
}

impl<'de> Deserialize<'de> for ServerPort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let port = u16::deserialize(deserializer)?;
        // Re-validated in `ServerConfig::load` once the environment is known
        Ok(Self {
            port,
            environment: Environment::Development,
        })
    }
}

/// A validated timeout duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeoutSeconds(Duration);

impl TimeoutSeconds {
    /// Create a new `TimeoutSeconds`, ensuring the value is within valid bounds
    ///
    /// # Errors
    ///
    /// Returns an error if timeout is 0 or greater than 300 seconds
    pub fn new(seconds: u64) -> Result<Self> {
        ensure!(seconds != 0, "timeout must be greater than 0");
        ensure!(seconds <= 300, "timeout cannot exceed 300");
        Ok(Self(Duration::from_secs(seconds)))
    }

    /// Create a safe default timeout (90 seconds, above the classifier's own timeout)
    pub const fn default_value() -> Self {
        Self(Duration::from_secs(90))
    }

    /// Create a safe testing timeout (5 seconds)
    pub const fn testing() -> Self {
        Self(Duration::from_secs(5))
    }

    /// Get the timeout value
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for TimeoutSeconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Self::new(seconds).map_err(|e| de::Error::custom(e.to_string()))
    }
}

impl Default for TimeoutSeconds {
    fn default() -> Self {
        Self::default_value()
    }
}

/// Maximum number of admitted requests per client and window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestLimit(u32);

impl RequestLimit {
    /// Create a new `RequestLimit`
    ///
    /// # Errors
    ///
    /// Returns an error if the limit is 0
    pub fn new(limit: u32) -> Result<Self> {
        ensure!(limit != 0, "request limit must be greater than 0");
        Ok(Self(limit))
    }

    /// Get the limit value
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Default for RequestLimit {
    fn default() -> Self {
        Self(DEFAULT_MAX_REQUESTS)
    }
}

impl<'de> Deserialize<'de> for RequestLimit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let limit = u32::deserialize(deserializer)?;
        Self::new(limit).map_err(|e| de::Error::custom(e.to_string()))
    }
}

/// Length of a rate limit window in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowMillis(Duration);

impl WindowMillis {
    /// Create a new `WindowMillis`
    ///
    /// # Errors
    ///
    /// Returns an error if the window is 0 or longer than one day
    pub fn new(millis: u64) -> Result<Self> {
        ensure!(millis != 0, "rate limit window must be greater than 0");
        ensure!(
            millis <= 86_400_000,
            "rate limit window cannot exceed one day"
        );
        Ok(Self(Duration::from_millis(millis)))
    }

    /// Get the window duration
    pub fn value(&self) -> Duration {
        self.0
    }
}

impl Default for WindowMillis {
    fn default() -> Self {
        Self(Duration::from_millis(DEFAULT_WINDOW_MS))
    }
}

impl<'de> Deserialize<'de> for WindowMillis {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Self::new(millis).map_err(|e| de::Error::custom(e.to_string()))
    }
}

/// Confidence below which results are overridden to `Special`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceThreshold(f64);

impl ConfidenceThreshold {
    /// Create a new `ConfidenceThreshold`
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside `[0, 1]`
    pub fn new(value: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&value),
            "confidence threshold must be between 0.0 and 1.0"
        );
        Ok(Self(value))
    }

    /// Get the threshold value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl<'de> Deserialize<'de> for ConfidenceThreshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::new(value).map_err(|e| de::Error::custom(e.to_string()))
    }
}

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Development environment
    Development,
    /// Testing environment
    Testing,
}

/// Per-client rate limiting of the classification endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Whether rate limiting is applied at all
    pub enabled: bool,
    /// Admitted requests per client and window
    pub max_requests: RequestLimit,
    /// Window length in milliseconds
    pub window_ms: WindowMillis,
    /// Tracked clients above which expired windows are swept
    ///
    /// If the map is still over the bound after the sweep, the oldest live
    /// windows are evicted down to half the bound. An evicted client that was
    /// over its limit starts a fresh window on its next request, so under more
    /// than this many concurrent clients the limit is not strictly enforced.
    pub max_tracked_clients: usize,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: RequestLimit::default(),
            window_ms: WindowMillis::default(),
            max_tracked_clients: DEFAULT_MAX_TRACKED_CLIENTS,
        }
    }
}

/// Classifier backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// OpenAI API key
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Override for the OpenAI base URL
    pub base_url: Option<Url>,
    /// Vision model
    pub model: String,
    /// Backend request timeout (1-300 seconds)
    pub timeout_seconds: TimeoutSeconds,
    /// Completion token budget
    pub max_completion_tokens: u32,
    /// OpenAI organization
    pub organization_id: Option<String>,
    /// Low-confidence override threshold
    pub confidence_threshold: ConfidenceThreshold,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: TimeoutSeconds(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            organization_id: None,
            confidence_threshold: ConfidenceThreshold::default(),
        }
    }
}

impl ClassifierConfig {
    /// Backend configuration for the OpenAI client
    pub fn openai_config(&self) -> OpenAiConfig {
        let mut config = OpenAiConfig::new(self.api_key.clone())
            .with_model(self.model.clone())
            .with_timeout(self.timeout_seconds.value().as_secs())
            .with_max_completion_tokens(self.max_completion_tokens);
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(organization_id) = &self.organization_id {
            config = config.with_organization(organization_id.clone());
        }
        config
    }

    /// Normalization policy derived from the configured threshold
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the policy is rejected
    pub fn normalization_policy(&self) -> ServerResult<NormalizationPolicy> {
        NormalizationPolicy::new(
            self.confidence_threshold.value(),
            DEFAULT_FALLBACK_CONFIDENCE,
        )
        .map_err(|e| ServerError::Config {
            message: e.to_string(),
        })
    }
}

/// Where feedback records are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackBackend {
    /// Append-only JSON Lines file
    Jsonl,
    /// Process memory, lost on restart
    Memory,
}

/// Feedback persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Storage backend
    pub backend: FeedbackBackend,
    /// Log file for the `jsonl` backend
    pub path: PathBuf,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            backend: FeedbackBackend::Jsonl,
            path: PathBuf::from(DEFAULT_FEEDBACK_PATH),
        }
    }
}

/// Server configuration for different environments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    pub host: IpAddr,
    /// Server port (validated for environment compatibility)
    pub port: ServerPort,
    /// Request timeout in seconds (validated range: 1-300)
    pub timeout_seconds: TimeoutSeconds,
    /// Environment type
    pub environment: Environment,
    /// Rate limiting of the classification endpoint
    pub rate_limiting: RateLimitingConfig,
    /// Classifier backend
    pub classifier: ClassifierConfig,
    /// Feedback persistence
    pub feedback: FeedbackConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::default_development(),
            timeout_seconds: TimeoutSeconds::default(),
            environment: Environment::Development,
            rate_limiting: RateLimitingConfig::default(),
            classifier: ClassifierConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables and optional configuration files
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if configuration is invalid or cannot be loaded.
    pub fn from_env() -> ServerResult<Self> {
        Self::load().map_err(|e| ServerError::Config {
            message: format!("failed to load configuration: {e}"),
        })
    }

    /// Load configuration using the config crate with hierarchical sources
    ///
    /// Configuration is loaded in the following order (later sources override earlier ones):
    /// 1. Default values
    /// 2. Configuration file (config.json)
    /// 3. Environment-specific files (config.{env}.json)
    /// 4. Environment variables with `SORTIT_` prefix and `__` between nested keys,
    ///    e.g. `SORTIT_RATE_LIMITING__MAX_REQUESTS`
    /// 5. `OPENAI_API_KEY` for `classifier.api_key`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let env_var = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let mut config_builder = Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 3000)?
            .set_default("timeout_seconds", 90)?
            .set_default("environment", "development")?
            .set_default("rate_limiting.enabled", true)?
            .set_default("rate_limiting.max_requests", DEFAULT_MAX_REQUESTS)?
            .set_default("rate_limiting.window_ms", DEFAULT_WINDOW_MS)?
            .set_default(
                "rate_limiting.max_tracked_clients",
                u64::try_from(DEFAULT_MAX_TRACKED_CLIENTS).unwrap_or(u64::MAX),
            )?
            .set_default("classifier.api_key", "")?
            .set_default("classifier.model", DEFAULT_MODEL)?
            .set_default("classifier.timeout_seconds", DEFAULT_TIMEOUT_SECONDS)?
            .set_default(
                "classifier.max_completion_tokens",
                DEFAULT_MAX_COMPLETION_TOKENS,
            )?
            .set_default(
                "classifier.confidence_threshold",
                DEFAULT_CONFIDENCE_THRESHOLD,
            )?
            .set_default("feedback.backend", "jsonl")?
            .set_default("feedback.path", DEFAULT_FEEDBACK_PATH)?
            .add_source(File::with_name("config.json").required(false))
            .add_source(
                File::with_name(&format!("config.{}.json", env_var.to_lowercase())).required(false),
            )
            .add_source(
                ConfigEnv::with_prefix("SORTIT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if std::env::var("ENVIRONMENT").is_ok() {
            config_builder = config_builder.set_override("environment", env_var.to_lowercase())?;
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            config_builder = config_builder.set_override("classifier.api_key", api_key)?;
        }

        let config = config_builder.build()?;
        let mut server_config: Self = config.try_deserialize()?;

        server_config.port = ServerPort::new(server_config.port.value(), server_config.environment)
            .map_err(|e| ConfigError::Message(format!("invalid port configuration: {e}")))?;

        server_config
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(server_config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    ///
    /// Returns an error if production runs without an API key or the rate
    /// limiter has no room to track clients
    pub fn validate(&self) -> Result<()> {
        if self.environment == Environment::Production {
            ensure!(
                !self.classifier.api_key.trim().is_empty(),
                "classifier.api_key (or OPENAI_API_KEY) is required in production"
            );
        }
        ensure!(
            self.rate_limiting.max_tracked_clients > 0,
            "rate_limiting.max_tracked_clients must be greater than 0"
        );
        Ok(())
    }

    /// Create configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: ServerPort::testing(),
            timeout_seconds: TimeoutSeconds::testing(),
            environment: Environment::Testing,
            rate_limiting: RateLimitingConfig::default(),
            classifier: ClassifierConfig {
                api_key: "test-key".to_string(),
                timeout_seconds: TimeoutSeconds::testing(),
                ..ClassifierConfig::default()
            },
            feedback: FeedbackConfig {
                backend: FeedbackBackend::Memory,
                path: PathBuf::from(DEFAULT_FEEDBACK_PATH),
            },
        }
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port.value())
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
            Environment::Testing => write!(f, "testing"),
        }
    }
}
