// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server state management module
//!
//! This module provides shared application state for the classification
//! service, including configuration, the classifier, the feedback sink and
//! coordinated cancellation.

use std::{collections::HashMap, sync::Arc};

use feedback_store::{FeedbackSink, FeedbackStore};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use utoipa::ToSchema;
use waste_classifier::{OpenAiVisionClient, WasteClassifier};

use crate::{
    config::{Environment, ServerConfig},
    error::ServerResult,
};

/// Classifier used by the HTTP layer
pub type ServiceClassifier = WasteClassifier<OpenAiVisionClient>;

/// Shared application state with cancellation token support
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Server configuration
    config: ServerConfig,
    /// Backend plus normalizer
    classifier: ServiceClassifier,
    /// Feedback persistence
    feedback: Arc<FeedbackSink>,
    /// Cancellation token for coordinated shutdown
    pub cancellation_token: CancellationToken,
}

impl ServerState {
    /// Create new server state
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `classifier` - Classifier backend wrapped with its normalizer
    /// * `feedback` - Feedback store
    /// * `cancellation_token` - Token for coordinated cancellation
    pub fn new(
        config: ServerConfig,
        classifier: ServiceClassifier,
        feedback: Arc<FeedbackSink>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            classifier,
            feedback,
            cancellation_token,
        }
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Classifier backend wrapped with its normalizer
    pub fn classifier(&self) -> &ServiceClassifier {
        &self.classifier
    }

    /// Feedback store
    pub fn feedback(&self) -> &FeedbackSink {
        &self.feedback
    }

    /// Perform health check operations
    pub async fn health_check(&self) -> ServerResult<HealthCheck> {
        let (classifier, feedback) = tokio::join!(
            self.classifier.health_check(),
            self.feedback.health_check()
        );

        let mut dependencies = HashMap::new();
        dependencies.insert(
            format!("classifier:{}", self.classifier.backend_name()),
            Self::dependency_status(classifier, "backend did not respond"),
        );
        dependencies.insert(
            format!("feedback:{}", self.feedback.name()),
            Self::dependency_status(feedback, "store is not writable"),
        );

        let status = match dependencies
            .values()
            .find(|status| **status != HealthStatus::Up)
        {
            None => HealthStatus::Up,
            Some(_) => HealthStatus::Degraded {
                reason: Box::from("one or more dependencies are unavailable"),
            },
        };

        Ok(HealthCheck {
            status,
            version: Box::from(env!("CARGO_PKG_VERSION")),
            environment: self.config.environment,
            timestamp: chrono::Utc::now().to_rfc3339(),
            dependencies,
        })
    }

    fn dependency_status<E: std::fmt::Display>(
        result: Result<bool, E>,
        unhealthy_reason: &str,
    ) -> HealthStatus {
        match result {
            Ok(true) => HealthStatus::Up,
            Ok(false) => HealthStatus::Down {
                reason: Box::from(unhealthy_reason),
            },
            Err(e) => {
                warn!("dependency health check failed: {e}");
                HealthStatus::Down {
                    reason: e.to_string().into_boxed_str(),
                }
            }
        }
    }
}

/// Health status of a service or dependency
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum HealthStatus {
    /// Service is fully operational and responding normally
    Up,

    /// Service is not operational or has critical failures
    Down {
        /// Human-readable explanation of why the service is down
        reason: Box<str>,
    },

    /// Service is operational but experiencing performance issues or partial failures
    Degraded {
        /// Human-readable explanation of the degradation condition
        reason: Box<str>,
    },
}

/// Health check status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheck {
    /// Service status
    pub status: HealthStatus,
    /// Service version
    pub version: Box<str>,
    /// Environment
    pub environment: Environment,
    /// Timestamp
    pub timestamp: String,
    /// Status of the classifier backend and feedback store
    #[schema(value_type = Object)]
    pub dependencies: HashMap<String, HealthStatus>,
}
