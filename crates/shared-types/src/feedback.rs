// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! User feedback records
//!
//! A [`FeedbackRecord`] is written once per feedback action and never mutated.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::Category;

/// Append-only record of whether a scan result was correct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    /// Identifier of the scan the feedback refers to
    pub scan_id: String,
    /// Whether the user agreed with the recommendation
    pub is_correct: bool,
    /// The category the user says was right, only kept for incorrect results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_category: Option<Category>,
    /// Submission time in Unix epoch milliseconds
    pub timestamp: i64,
}

impl FeedbackRecord {
    /// Create a new feedback record
    ///
    /// A correction is only meaningful when the result was wrong, so
    /// `correct_category` is dropped when `is_correct` is true.
    pub fn new(
        scan_id: impl Into<String>,
        is_correct: bool,
        correct_category: Option<Category>,
        timestamp: i64,
    ) -> Self {
        Self {
            scan_id: scan_id.into(),
            is_correct,
            correct_category: if is_correct { None } else { correct_category },
            timestamp,
        }
    }
}
