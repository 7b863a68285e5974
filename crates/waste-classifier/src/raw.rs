// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Untrusted classifier output
//!
//! [`RawClassification`] mirrors the rough shape a backend is asked to return,
//! but every field is an optional, loosely-typed JSON value. Nothing about the
//! declared shape is trusted; the normalizer type-checks each field on its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::ClassificationResult;

/// Raw payload as produced by a classifier backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawClassification {
    /// Claimed disposal category
    pub category: Option<Value>,
    /// Claimed confidence
    pub confidence: Option<Value>,
    /// Claimed item identification
    pub item_guess: Option<Value>,
    /// Claimed explanation
    pub explanation: Option<Value>,
    /// Claimed preparation steps
    pub prep_steps: Option<Value>,
    /// Claimed regional note
    pub local_note: Option<Value>,
    /// Claimed alternative category
    pub secondary_category: Option<Value>,
    /// Claimed confidence in the alternative category
    pub secondary_confidence: Option<Value>,
}

impl RawClassification {
    /// Payload with every field missing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from any JSON value; anything other than an object yields the empty payload
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
            _ => Self::empty(),
        }
    }

    /// Parse from JSON text
    ///
    /// # Errors
    ///
    /// Returns the parse error when the text is not JSON at all. Valid JSON of
    /// the wrong shape is never an error.
    pub fn try_from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(text).map(Self::from_value)
    }

    /// Parse from JSON text, treating unparseable text as the empty payload
    pub fn from_json_str(text: &str) -> Self {
        Self::try_from_json_str(text).unwrap_or_default()
    }
}

impl From<Value> for RawClassification {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

impl From<&ClassificationResult> for RawClassification {
    fn from(result: &ClassificationResult) -> Self {
        serde_json::to_value(result)
            .map(Self::from_value)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shared_types::Category;

    use super::*;

    #[test]
    fn non_objects_become_empty_payloads() {
        assert_eq!(RawClassification::from_value(json!(null)), RawClassification::empty());
        assert_eq!(RawClassification::from_value(json!([1, 2])), RawClassification::empty());
        assert_eq!(RawClassification::from_value(json!("Recycle")), RawClassification::empty());
    }

    #[test]
    fn keeps_fields_of_any_type() {
        let raw = RawClassification::from_value(json!({
            "category": 42,
            "confidence": "high",
            "prepSteps": "rinse",
            "unrelated": true
        }));

        assert_eq!(raw.category, Some(json!(42)));
        assert_eq!(raw.confidence, Some(json!("high")));
        assert_eq!(raw.prep_steps, Some(json!("rinse")));
        assert_eq!(raw.item_guess, None);
    }

    #[test]
    fn json_null_fields_are_missing() {
        let raw = RawClassification::from_value(json!({"itemGuess": null}));
        assert_eq!(raw.item_guess, None);
    }

    #[test]
    fn unparseable_text_is_empty_payload() {
        assert!(RawClassification::try_from_json_str("not json").is_err());
        assert_eq!(
            RawClassification::from_json_str("not json"),
            RawClassification::empty()
        );
    }

    #[test]
    fn built_back_from_validated_result() {
        let result = ClassificationResult {
            category: Category::Compost,
            confidence: 0.8,
            item_guess: "apple core".to_string(),
            explanation: "food scraps".to_string(),
            prep_steps: vec![],
            local_note: "green bin".to_string(),
            secondary_category: Some(Category::Landfill),
            secondary_confidence: None,
        };

        let raw = RawClassification::from(&result);
        assert_eq!(raw.category, Some(json!("Compost")));
        assert_eq!(raw.secondary_category, Some(json!("Landfill")));
        assert_eq!(raw.prep_steps, Some(json!([])));
        assert_eq!(raw.secondary_confidence, None);
    }
}
