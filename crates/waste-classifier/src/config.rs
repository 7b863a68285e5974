// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! OpenAI backend configuration

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{ClassifierError, ClassifierResult};

/// Default vision model
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Default completion token budget
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 1024;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// OpenAI API key
    pub api_key: String,
    /// Base URL for OpenAI API (defaults to official API)
    pub base_url: Option<Url>,
    /// Vision-capable model to call
    pub model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum number of completion tokens
    pub max_completion_tokens: u32,
    /// Organization ID (optional)
    pub organization_id: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
            organization_id: None,
        }
    }
}

impl OpenAiConfig {
    /// Create a new OpenAI configuration
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            ..Default::default()
        }
    }

    /// Set the base URL for the OpenAI API
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Set the completion token budget
    pub fn with_max_completion_tokens(mut self, max_completion_tokens: u32) -> Self {
        self.max_completion_tokens = max_completion_tokens;
        self
    }

    /// Set the organization ID
    pub fn with_organization(mut self, organization_id: String) -> Self {
        self.organization_id = Some(organization_id);
        self
    }

    /// Validate the OpenAI configuration
    pub fn validate(&self) -> ClassifierResult<()> {
        if self.api_key.is_empty() {
            return Err(ClassifierError::config("OpenAI API key cannot be empty"));
        }

        if !self.api_key.starts_with("sk-") && !self.api_key.starts_with("test-") {
            warn!("OpenAI API key doesn't match expected format (should start with 'sk-')");
        }

        if self.model.trim().is_empty() {
            return Err(ClassifierError::config("OpenAI model cannot be empty"));
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 300 {
            return Err(ClassifierError::config(format!(
                "Invalid timeout: {} seconds (must be 1-300)",
                self.timeout_seconds
            )));
        }

        if self.max_completion_tokens == 0 || self.max_completion_tokens > 16384 {
            return Err(ClassifierError::config(format!(
                "Invalid max_completion_tokens: {} (must be 1-16384)",
                self.max_completion_tokens
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = OpenAiConfig::new("sk-test".to_string());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_completion_tokens, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_values() {
        assert!(OpenAiConfig::default().validate().unwrap_err().is_config_error());
        assert!(
            OpenAiConfig::new("sk-test".to_string())
                .with_timeout(0)
                .validate()
                .is_err()
        );
        assert!(
            OpenAiConfig::new("sk-test".to_string())
                .with_timeout(301)
                .validate()
                .is_err()
        );
        assert!(
            OpenAiConfig::new("sk-test".to_string())
                .with_max_completion_tokens(20_000)
                .validate()
                .is_err()
        );
        assert!(
            OpenAiConfig::new("sk-test".to_string())
                .with_model(" ")
                .validate()
                .is_err()
        );
    }
}
