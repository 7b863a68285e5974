// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! This module provides route configuration for the classification service.

pub mod handlers;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use handlers::{classify_handler, feedback_handler, health_handler, method_not_allowed};

use crate::{
    metrics::metrics_handler,
    middleware::{RateLimiter, rate_limiting_middleware},
    openapi::{openapi_spec, swagger_ui},
    state::ServerState,
};

/// Create application routes with conditional rate limiting
#[allow(clippy::needless_pass_by_value)] // We need to clone the rate limiter for middleware
pub fn create_routes(rate_limiter: RateLimiter) -> Router<ServerState> {
    // Monitoring endpoints are not rate limited
    let monitoring_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    let docs_routes = Router::new()
        .route("/api-doc/openapi.json", get(openapi_spec))
        .route("/swagger-ui", get(swagger_ui));

    // Only POST classification calls the paid backend, so only it is rate
    // limited. Other methods reach the 405 fallback without using quota.
    let mut classify = post(classify_handler);
    if rate_limiter.is_enabled() {
        classify = classify.route_layer(middleware::from_fn_with_state(
            rate_limiter.clone(),
            rate_limiting_middleware,
        ));
    }
    let classify_routes =
        Router::new().route("/api/classify", classify.fallback(method_not_allowed));

    let feedback_routes = Router::new().route(
        "/api/feedback",
        post(feedback_handler).fallback(method_not_allowed),
    );

    Router::new()
        .merge(monitoring_routes)
        .merge(docs_routes)
        .merge(classify_routes)
        .merge(feedback_routes)
}
