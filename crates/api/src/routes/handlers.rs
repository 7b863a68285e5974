// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers module
//!
//! Health checks, classification and feedback endpoints. Handlers validate the
//! request, call into the classifier or feedback store, and return the
//! [`ApiResponse`] envelope. Backend failures are logged here and surface to
//! the caller only as a generic message.

use std::time::Instant;

use axum::{Json, extract::State, response::IntoResponse};
use feedback_store::FeedbackStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{ApiResponse, Category, ClassificationResult, FeedbackRecord};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use waste_classifier::{ClassificationRequest, ClassifierError, ImagePayload, Region};

use crate::{
    error::{MISSING_FIELDS_MESSAGE, ServerError},
    extractors::JsonExtractor,
    metrics,
    state::{HealthCheck, ServerState},
};

/// Acknowledgement returned for recorded feedback
pub const FEEDBACK_RECORDED_MESSAGE: &str = "Feedback recorded. Thank you!";

/// Health check endpoint handler
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Health check endpoint",
    description = "Returns the current health status of the service including version, environment information, and the status of the classifier backend and feedback store.",
    responses(
        (status = 200, description = "Service health report", body = HealthCheck),
        (status = 503, description = "Service unavailable", body = String)
    )
)]
pub async fn health_handler(
    State(state): State<ServerState>,
) -> Result<impl IntoResponse, ServerError> {
    let health = state.health_check().await?;
    Ok(Json(health))
}

/// Waste classification request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ClassifyRequest {
    /// Photo as a `data:image/...;base64,` URL or bare base64
    #[schema(example = "data:image/jpeg;base64,/9j/4AAQSkZJRg...")]
    pub image: Option<String>,
    /// Free-form region hint used to tailor local disposal notes
    #[schema(example = "Portland, OR")]
    pub region: Option<String>,
}

/// Classify a photo of a waste item
///
/// The backend answer is normalized before it is returned: unknown categories
/// and missing fields get safe defaults, and answers below the confidence
/// threshold become `Special` with a disclaimer.
#[utoipa::path(
    post,
    path = "/api/classify",
    tag = "classification",
    summary = "Classify a waste item",
    description = "Classifies a photo of a waste item into Recycle, Landfill, Compost or Special, with disposal guidance for the given region.",
    request_body = ClassifyRequest,
    responses(
        (status = 200, description = "Item classified", body = ApiResponse<ClassificationResult>),
        (status = 400, description = "Missing or invalid image", body = ApiResponse<String>),
        (status = 413, description = "Request body too large", body = ApiResponse<String>),
        (status = 429, description = "Too many requests", body = ApiResponse<String>),
        (status = 500, description = "Classification failed", body = ApiResponse<String>)
    )
)]
pub async fn classify_handler(
    State(state): State<ServerState>,
    JsonExtractor(request): JsonExtractor<ClassifyRequest>,
) -> Result<Json<ApiResponse<ClassificationResult>>, ServerError> {
    let image = ImagePayload::from_data_url(request.image.as_deref().unwrap_or_default())
        .map_err(|e| match e {
            ClassifierError::Validation { message } => ServerError::ValidationError(message),
            other => ServerError::from(other),
        })?;
    let region = Region::from_optional(request.region.as_deref());
    let classification = ClassificationRequest::new(image).with_region(region);

    let classifier = state.classifier();
    let backend = classifier.backend_name();
    let start_time = Instant::now();

    match classifier.classify(&classification).await {
        Ok(outcome) => {
            metrics::observe_classifier_duration(
                backend,
                "success",
                outcome.backend_latency.as_secs_f64(),
            );
            metrics::record_classification(outcome.result.category, outcome.low_confidence);
            Ok(Json(ApiResponse::ok(outcome.result)))
        }
        Err(e) => {
            metrics::observe_classifier_duration(
                backend,
                "error",
                start_time.elapsed().as_secs_f64(),
            );
            error!(
                error = %e,
                auth_error = e.is_auth_error(),
                permanent = e.is_permanent_failure(),
                "classification failed"
            );
            Err(ServerError::from(e))
        }
    }
}

/// Feedback on a previous classification
///
/// Fields are loosely typed so that missing or mistyped values are reported
/// with the envelope message rather than a deserialization error.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    /// Identifier of the scan, must be a non-empty string
    #[schema(value_type = String, example = "scan-1718000000000")]
    pub scan_id: Option<Value>,
    /// Whether the classification was right, must be a boolean
    #[schema(value_type = bool)]
    pub is_correct: Option<Value>,
    /// Category the user says is right
    #[schema(value_type = Option<Category>)]
    pub correct_category: Option<Value>,
}

impl FeedbackRequest {
    /// Build the record to persist, or `None` when required fields are missing
    pub fn into_record(self, timestamp: i64) -> Option<FeedbackRecord> {
        let scan_id = match self.scan_id {
            Some(Value::String(scan_id)) if !scan_id.trim().is_empty() => scan_id,
            _ => return None,
        };
        let Some(Value::Bool(is_correct)) = self.is_correct else {
            return None;
        };

        let correct_category = match self.correct_category {
            None | Some(Value::Null) => None,
            Some(Value::String(category)) => {
                let parsed = category.parse::<Category>().ok();
                if parsed.is_none() {
                    warn!(category = %category, "ignoring unknown correct category");
                }
                parsed
            }
            Some(other) => {
                warn!(value = %other, "ignoring non-string correct category");
                None
            }
        };

        Some(FeedbackRecord::new(
            scan_id,
            is_correct,
            correct_category,
            timestamp,
        ))
    }
}

/// Body of a successful feedback submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FeedbackAck {
    /// Confirmation text
    pub message: String,
}

/// Record whether a classification was correct
#[utoipa::path(
    post,
    path = "/api/feedback",
    tag = "feedback",
    summary = "Submit classification feedback",
    description = "Appends a feedback record for a previous scan. Records are never modified or deleted.",
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback recorded", body = ApiResponse<FeedbackAck>),
        (status = 400, description = "Missing required fields", body = ApiResponse<String>),
        (status = 500, description = "Feedback could not be saved", body = ApiResponse<String>)
    )
)]
pub async fn feedback_handler(
    State(state): State<ServerState>,
    JsonExtractor(request): JsonExtractor<FeedbackRequest>,
) -> Result<Json<ApiResponse<FeedbackAck>>, ServerError> {
    let record = request
        .into_record(chrono::Utc::now().timestamp_millis())
        .ok_or_else(|| ServerError::ValidationError(MISSING_FIELDS_MESSAGE.to_string()))?;
    let is_correct = record.is_correct;
    let scan_id = record.scan_id.clone();

    if let Err(e) = state.feedback().append(record).await {
        error!(error = %e, scan_id = %scan_id, "failed to save feedback");
        return Err(ServerError::from(e));
    }

    metrics::record_feedback(is_correct);
    info!(scan_id = %scan_id, is_correct, "feedback recorded");

    Ok(Json(ApiResponse::ok(FeedbackAck {
        message: FEEDBACK_RECORDED_MESSAGE.to_string(),
    })))
}

/// Fallback for methods other than POST on the API routes
pub async fn method_not_allowed() -> ServerError {
    ServerError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feedback(body: Value) -> FeedbackRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn feedback_requires_scan_id_and_boolean() {
        assert!(feedback(json!({"isCorrect": true})).into_record(0).is_none());
        assert!(
            feedback(json!({"scanId": "", "isCorrect": true}))
                .into_record(0)
                .is_none()
        );
        assert!(
            feedback(json!({"scanId": "   ", "isCorrect": true}))
                .into_record(0)
                .is_none()
        );
        assert!(
            feedback(json!({"scanId": 7, "isCorrect": true}))
                .into_record(0)
                .is_none()
        );
        assert!(feedback(json!({"scanId": "scan-1"})).into_record(0).is_none());
        assert!(
            feedback(json!({"scanId": "scan-1", "isCorrect": "yes"}))
                .into_record(0)
                .is_none()
        );
    }

    #[test]
    fn false_is_a_valid_answer() {
        let record = feedback(json!({
            "scanId": "scan-1",
            "isCorrect": false,
            "correctCategory": "Compost"
        }))
        .into_record(1_700_000_000_000)
        .unwrap();

        assert_eq!(record.scan_id, "scan-1");
        assert!(!record.is_correct);
        assert_eq!(record.correct_category, Some(Category::Compost));
        assert_eq!(record.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn unknown_correct_category_is_dropped() {
        let record = feedback(json!({
            "scanId": "scan-1",
            "isCorrect": false,
            "correctCategory": "Hazardous"
        }))
        .into_record(0)
        .unwrap();

        assert_eq!(record.correct_category, None);
    }

    #[test]
    fn correct_results_carry_no_correction() {
        let record = feedback(json!({
            "scanId": "scan-1",
            "isCorrect": true,
            "correctCategory": "Landfill"
        }))
        .into_record(0)
        .unwrap();

        assert_eq!(record.correct_category, None);
    }
}
