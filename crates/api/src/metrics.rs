// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics module
//!
//! Provides global metrics using the default Prometheus registry via macros and
//! an Axum-compatible metrics handler.

use std::sync::LazyLock;

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder, register_histogram_vec,
    register_int_counter, register_int_counter_vec,
};
use shared_types::Category;
use tracing::error;

/// Classifications returned to callers, labeled by category.
pub static CLASSIFICATIONS_BY_CATEGORY: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "sortit_classifications_total",
        "Total number of classifications returned, labeled by category",
        &["category"]
    )
    .expect("Failed to create sortit_classifications_total counter vec")
});

/// Results forced to `Special` because the backend was not confident enough.
pub static LOW_CONFIDENCE_OVERRIDES: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "sortit_low_confidence_overrides_total",
        "Total number of results overridden to Special for low confidence"
    )
    .expect("Failed to create low confidence override counter")
});

/// Requests rejected by the rate limiter.
pub static RATE_LIMIT_DENIALS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        "sortit_rate_limit_denials_total",
        "Total number of classification requests denied by the rate limiter"
    )
    .expect("Failed to create rate limit denial counter")
});

/// Feedback submissions, labeled by whether the result was correct.
pub static FEEDBACK_SUBMISSIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "sortit_feedback_submissions_total",
        "Total number of feedback submissions, labeled by is_correct",
        &["is_correct"]
    )
    .expect("Failed to create feedback submission counter vec")
});

/// Histogram for classifier backend request durations in seconds.
pub static CLASSIFIER_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "sortit_classifier_request_duration",
        "Classifier backend request durations in seconds",
        &["backend", "result"],
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
    )
    .expect("Failed to create classifier request duration histogram")
});

/// Count a classification returned to a caller
pub fn record_classification(category: Category, low_confidence: bool) {
    CLASSIFICATIONS_BY_CATEGORY
        .with_label_values(&[category.as_str()])
        .inc();
    if low_confidence {
        LOW_CONFIDENCE_OVERRIDES.inc();
    }
}

/// Observe the duration of a classifier backend request
///
/// # Arguments
/// * `backend` - The backend name
/// * `result` - `success` or `error`
/// * `duration_secs` - The duration of the request in seconds
pub fn observe_classifier_duration(backend: &str, result: &str, duration_secs: f64) {
    CLASSIFIER_REQUEST_DURATION
        .with_label_values(&[backend, result])
        .observe(duration_secs);
}

/// Count a feedback submission
pub fn record_feedback(is_correct: bool) {
    FEEDBACK_SUBMISSIONS
        .with_label_values(&[if is_correct { "true" } else { "false" }])
        .inc();
}

/// Axum handler that exports metrics in Prometheus text format
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("failed to encode metrics: {e}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("metrics buffer is not valid UTF-8: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
