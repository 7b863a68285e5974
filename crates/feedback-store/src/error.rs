// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for feedback persistence

use std::path::Path;

use thiserror::Error;

/// Result type alias for feedback store operations
pub type FeedbackStoreResult<T> = Result<T, FeedbackStoreError>;

/// Error types for feedback persistence
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum FeedbackStoreError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// Record could not be encoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl FeedbackStoreError {
    /// Create an I/O error for a path
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FeedbackStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
