// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! Server error types and their single translation into HTTP responses. Every
//! body uses the [`ApiResponse`] envelope, and failures from the classifier
//! backend or the feedback store are reduced to a fixed user-facing message.

use std::net::SocketAddr;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use feedback_store::FeedbackStoreError;
use shared_types::ApiResponse;
use thiserror::Error;
use waste_classifier::ClassifierError;

/// Message returned for any classifier failure
pub const CLASSIFICATION_FAILED_MESSAGE: &str = "Failed to classify image. Please try again.";

/// Message returned when a client exceeds the rate limit
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many requests. Please wait a minute before trying again.";

/// Message returned when feedback cannot be persisted
pub const FEEDBACK_FAILED_MESSAGE: &str = "Failed to save feedback";

/// Message returned when required feedback fields are missing
pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields";

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Input validation errors, the message is shown to the caller
    #[error("{0}")]
    ValidationError(String),

    /// JSON parsing errors with detailed context
    #[error("Invalid JSON request: {message}")]
    JsonError {
        /// Detailed error message
        message: String,
    },

    /// Request body above the accepted size
    #[error("Request body too large (limit {limit_bytes} bytes)")]
    PayloadTooLarge {
        /// Accepted size in bytes
        limit_bytes: usize,
    },

    /// Method not served on this route
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Client exceeded its request budget
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimited {
        /// Seconds until the client's window resets
        retry_after_seconds: u64,
    },

    /// Classifier backend failure
    #[error("Classification failed: {source}")]
    Classification {
        /// Underlying classifier error, never sent to the caller
        #[from]
        source: ClassifierError,
    },

    /// Feedback persistence failure
    #[error("Feedback persistence failed: {source}")]
    Feedback {
        /// Underlying store error, never sent to the caller
        #[from]
        source: FeedbackStoreError,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(..) | Self::JsonError { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Config { .. }
            | Self::Bind { .. }
            | Self::Startup { .. }
            | Self::Shutdown { .. }
            | Self::Classification { .. }
            | Self::Feedback { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller
    pub fn public_message(&self) -> String {
        match self {
            Self::ValidationError(message) => message.clone(),
            Self::JsonError { .. } | Self::PayloadTooLarge { .. } | Self::MethodNotAllowed => {
                self.to_string()
            }
            Self::RateLimited { .. } => RATE_LIMITED_MESSAGE.to_string(),
            Self::Classification { .. } => CLASSIFICATION_FAILED_MESSAGE.to_string(),
            Self::Feedback { .. } => FEEDBACK_FAILED_MESSAGE.to_string(),
            Self::Config { .. } | Self::Bind { .. } | Self::Startup { .. } | Self::Shutdown { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ApiResponse::<()>::error(self.public_message()));
        let mut response = (status, body).into_response();

        if let Self::RateLimited {
            retry_after_seconds,
        } = self
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
        }

        response
    }
}
