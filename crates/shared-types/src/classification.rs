// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Validated classification result
//!
//! A [`ClassificationResult`] is only ever produced by the result normalizer, so
//! every consumer may rely on its invariants without re-validating.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::Category;

/// Safe, renderable disposal recommendation for a single scanned item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Disposal bucket, forced to `Special` when confidence is low
    pub category: Category,
    /// Classifier confidence, always within `[0, 1]`
    #[schema(minimum = 0.0, maximum = 1.0, example = 0.9)]
    pub confidence: f64,
    /// What the classifier thinks the item is
    #[schema(example = "glass bottle")]
    pub item_guess: String,
    /// Why the item belongs in its category
    pub explanation: String,
    /// Preparation steps before disposal, possibly empty
    pub prep_steps: Vec<String>,
    /// Region-specific note
    pub local_note: String,
    /// Alternative category, only present when the classifier offered a valid one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_category: Option<Category>,
    /// Confidence in the alternative category, within `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(minimum = 0.0, maximum = 1.0)]
    pub secondary_confidence: Option<f64>,
}
