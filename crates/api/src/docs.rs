// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! `OpenAPI` document for the service

use shared_types::{ApiResponse, Category, ClassificationResult};
use utoipa::OpenApi;

use crate::{
    config::Environment,
    routes::handlers::{self, ClassifyRequest, FeedbackAck, FeedbackRequest},
    state::{HealthCheck, HealthStatus},
};

/// Generated `OpenAPI` document
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "SortIt Waste Classification API",
        description = "Classifies photos of waste items into Recycle, Landfill, Compost or Special and records user feedback."
    ),
    paths(
        handlers::health_handler,
        handlers::classify_handler,
        handlers::feedback_handler,
    ),
    components(schemas(
        ApiResponse<ClassificationResult>,
        ApiResponse<FeedbackAck>,
        Category,
        ClassificationResult,
        ClassifyRequest,
        Environment,
        FeedbackAck,
        FeedbackRequest,
        HealthCheck,
        HealthStatus,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "classification", description = "Waste item classification"),
        (name = "feedback", description = "Classification feedback"),
    )
)]
pub struct ApiDoc;
