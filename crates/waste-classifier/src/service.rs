// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Classification orchestration
//!
//! [`WasteClassifier`] invokes a backend, normalizes whatever it returns and
//! logs the outcome. Backend errors are passed through untouched so the
//! serving boundary decides how to present them.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use shared_types::ClassificationResult;
use tracing::{info, instrument, warn};

use crate::{
    classifier::{ClassificationRequest, Classifier},
    error::ClassifierResult,
    normalizer::ResultNormalizer,
};

/// Normalized result with details about how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationOutcome {
    /// Safe, normalized result
    pub result: ClassificationResult,
    /// Whether the low-confidence override applied
    pub low_confidence: bool,
    /// Time spent waiting on the backend
    pub backend_latency: Duration,
}

/// Backend plus normalizer
#[derive(Debug)]
pub struct WasteClassifier<C> {
    backend: Arc<C>,
    normalizer: ResultNormalizer,
}

impl<C> Clone for WasteClassifier<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            normalizer: self.normalizer,
        }
    }
}

impl<C: Classifier> WasteClassifier<C> {
    /// Wrap a backend with the given normalizer
    pub fn new(backend: C, normalizer: ResultNormalizer) -> Self {
        Self {
            backend: Arc::new(backend),
            normalizer,
        }
    }

    /// Normalizer applied to every backend payload
    pub fn normalizer(&self) -> &ResultNormalizer {
        &self.normalizer
    }

    /// Underlying backend
    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Classify an image and return a normalized result
    #[instrument(skip(self, request), fields(backend = self.backend.name(), region = %request.region))]
    pub async fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> ClassifierResult<ClassificationOutcome> {
        let start_time = Instant::now();
        let raw = match self.backend.classify(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    error = %e,
                    retryable = e.is_retryable(),
                    duration_ms = start_time.elapsed().as_millis(),
                    "Classifier backend failed"
                );
                return Err(e);
            }
        };
        let backend_latency = start_time.elapsed();

        let result = self.normalizer.normalize(&raw);
        let low_confidence = self.normalizer.is_low_confidence(result.confidence);

        info!(
            category = %result.category,
            confidence = result.confidence,
            low_confidence,
            item_guess = %result.item_guess,
            duration_ms = backend_latency.as_millis(),
            "Classification completed"
        );

        Ok(ClassificationOutcome {
            result,
            low_confidence,
            backend_latency,
        })
    }

    /// Check whether the backend is reachable
    pub async fn health_check(&self) -> ClassifierResult<bool> {
        self.backend.health_check().await
    }

    /// Name of the backend
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}
