// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for waste classification operations
//!
//! Malformed model output is deliberately absent from this taxonomy: the
//! normalizer absorbs it. These errors describe input validation problems and
//! failures to reach or authenticate against the classifier backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for classification operations
pub type ClassifierResult<T> = Result<T, ClassifierError>;

/// Error context with request correlation
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Request ID for correlation across logs
    pub request_id: Option<String>,
    /// Operation that failed
    pub operation: Option<String>,
    /// Timestamp when error occurred
    pub timestamp: Option<DateTime<Utc>>,
    /// Additional metadata
    pub metadata: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create new error context
    pub fn new() -> Self {
        Self {
            request_id: None,
            operation: None,
            timestamp: Some(Utc::now()),
            metadata: BTreeMap::new(),
        }
    }

    /// Set request ID for correlation
    pub fn with_request_id(mut self, request_id: String) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Set operation name
    pub fn with_operation(mut self, operation: String) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Add metadata key-value pair
    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }

    fn annotate(&self, message: &mut String) {
        if let Some(request_id) = &self.request_id {
            message.push_str(&format!(" [request_id: {request_id}]"));
        }
        if let Some(operation) = &self.operation {
            message.push_str(&format!(" [operation: {operation}]"));
        }
        for (key, value) in &self.metadata {
            message.push_str(&format!(" [{key}: {value}]"));
        }
        if let Some(timestamp) = &self.timestamp {
            message.push_str(&format!(" [timestamp: {timestamp}]"));
        }
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types for classification operations
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ClassifierError {
    /// Classifier configuration is missing or invalid
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Caller supplied an unusable image or request
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Backend rejected the credentials
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Backend quota or rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// Request timeout
    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    /// Backend reported a server-side failure
    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// HTTP request failed
    #[error("HTTP request failed: {message}")]
    Http { message: String },

    /// Backend answered without any usable completion
    #[error("Invalid response format: {message}")]
    InvalidResponse { message: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {message}")]
    Json { message: String },

    /// OpenAI API error not covered by a more specific variant
    #[error("OpenAI API error: {message}")]
    OpenAi { message: String },
}

impl ClassifierError {
    /// Create a configuration error
    pub fn config<T: ToString>(message: T) -> Self {
        Self::Configuration {
            message: message.to_string(),
        }
    }

    /// Create a validation error
    pub fn validation<T: ToString>(message: T) -> Self {
        Self::Validation {
            message: message.to_string(),
        }
    }

    /// Create an authentication error
    pub fn authentication<T: ToString>(message: T) -> Self {
        Self::Authentication {
            message: message.to_string(),
        }
    }

    /// Create a rate limit error
    pub fn rate_limit(retry_after_seconds: u64) -> Self {
        Self::RateLimitExceeded {
            retry_after_seconds,
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout_seconds: u64) -> Self {
        Self::Timeout { timeout_seconds }
    }

    /// Create a service unavailable error
    pub fn service_unavailable<T: ToString>(message: T) -> Self {
        Self::ServiceUnavailable {
            message: message.to_string(),
        }
    }

    /// Create an HTTP error
    pub fn http<T: ToString>(message: T) -> Self {
        Self::Http {
            message: message.to_string(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response<T: ToString>(message: T) -> Self {
        Self::InvalidResponse {
            message: message.to_string(),
        }
    }

    /// Create an OpenAI API error
    pub fn openai<T: ToString>(message: T) -> Self {
        Self::OpenAi {
            message: message.to_string(),
        }
    }

    /// Create an HTTP error annotated with request context
    pub fn http_with_context<T: ToString>(message: T, context: &ErrorContext) -> Self {
        let mut message = message.to_string();
        context.annotate(&mut message);
        Self::Http { message }
    }

    /// Create an OpenAI error annotated with request context
    pub fn openai_with_context<T: ToString>(message: T, context: &ErrorContext) -> Self {
        let mut message = message.to_string();
        context.annotate(&mut message);
        Self::OpenAi { message }
    }

    /// Check if this error indicates a temporary failure that could be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClassifierError::Http { .. }
                | ClassifierError::Timeout { .. }
                | ClassifierError::ServiceUnavailable { .. }
                | ClassifierError::RateLimitExceeded { .. }
        )
    }

    /// Check if this error indicates a permanent failure that should not be retried
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            ClassifierError::Authentication { .. }
                | ClassifierError::Configuration { .. }
                | ClassifierError::Validation { .. }
        )
    }

    /// Check if this error indicates an authentication problem
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ClassifierError::Authentication { .. })
    }

    /// Check if this error indicates a configuration problem
    pub fn is_config_error(&self) -> bool {
        matches!(self, ClassifierError::Configuration { .. })
    }

    /// Check if this error was caused by the caller's input
    pub fn is_validation_error(&self) -> bool {
        matches!(self, ClassifierError::Validation { .. })
    }
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                timeout_seconds: 30,
            };
        }

        match err.status().map(|s| s.as_u16()) {
            Some(401 | 403) => Self::Authentication {
                message: err.to_string(),
            },
            Some(429) => Self::RateLimitExceeded {
                retry_after_seconds: 60,
            },
            Some(status) if status >= 500 => Self::ServiceUnavailable {
                message: err.to_string(),
            },
            _ => Self::Http {
                message: err.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ClassifierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_constructors() {
        let config_err = ClassifierError::config("test message");
        assert!(matches!(config_err, ClassifierError::Configuration { .. }));

        let validation_err = ClassifierError::validation("No image provided");
        assert!(matches!(validation_err, ClassifierError::Validation { .. }));

        let rate_limit_err = ClassifierError::rate_limit(60);
        assert!(matches!(
            rate_limit_err,
            ClassifierError::RateLimitExceeded {
                retry_after_seconds: 60
            }
        ));
    }

    #[test]
    fn error_classification() {
        let auth_error = ClassifierError::authentication("invalid key");
        assert!(auth_error.is_auth_error());
        assert!(!auth_error.is_retryable());
        assert!(!auth_error.is_config_error());

        let timeout_error = ClassifierError::timeout(30);
        assert!(timeout_error.is_retryable());
        assert!(!timeout_error.is_auth_error());

        let config_error = ClassifierError::config("bad config");
        assert!(config_error.is_config_error());
        assert!(!config_error.is_retryable());

        let validation_error = ClassifierError::validation("too small");
        assert!(validation_error.is_validation_error());
        assert!(validation_error.is_permanent_failure());
    }

    #[test]
    fn metadata_renders_in_key_order() {
        let context = ErrorContext::new()
            .with_metadata("url".to_string(), "http://backend/v1/chat".to_string())
            .with_metadata("status_code".to_string(), "418".to_string());

        let message = ClassifierError::openai_with_context("teapot", &context).to_string();

        let status = message.find("[status_code: 418]").unwrap();
        let url = message.find("[url: http://backend/v1/chat]").unwrap();
        assert!(status < url);
    }

    #[test]
    fn error_display() {
        let error = ClassifierError::openai("API failed");
        let display = error.to_string();
        assert!(display.contains("OpenAI API error"));
        assert!(display.contains("API failed"));
    }

    #[test]
    fn error_with_context() {
        let context = ErrorContext::new()
            .with_request_id("req-456".to_string())
            .with_operation("classify_image".to_string())
            .with_metadata("status_code".to_string(), "503".to_string());

        let error = ClassifierError::http_with_context("HTTP 503", &context);
        let error_str = error.to_string();

        assert!(error_str.contains("HTTP 503"));
        assert!(error_str.contains("request_id: req-456"));
        assert!(error_str.contains("operation: classify_image"));
        assert!(error_str.contains("[status_code: 503]"));
    }
}
