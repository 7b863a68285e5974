// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Result normalization
//!
//! The trust boundary between an arbitrary classifier backend and the rest of
//! the system. [`ResultNormalizer::normalize`] is total: every malformed or
//! missing field has a fallback, so it always returns a [`ClassificationResult`]
//! that is safe to render and act on.
//!
//! The low-confidence override is the central business rule. When the resolved
//! confidence is below the policy threshold the category is forced to
//! [`Category::Special`] and the explanation is replaced by a fixed disclaimer,
//! whatever the backend claimed.

use serde_json::Value;
use shared_types::{Category, ClassificationResult};

use crate::{
    error::{ClassifierError, ClassifierResult},
    raw::RawClassification,
};

/// Confidence below which a result is overridden to `Special`
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.55;

/// Confidence assumed when the backend gives no numeric confidence
pub const DEFAULT_FALLBACK_CONFIDENCE: f64 = 0.5;

/// Explanation shown for every low-confidence result
pub const LOW_CONFIDENCE_EXPLANATION: &str = "Not sure about this item. The image may be unclear, or this item has rules that vary significantly by location. Try retaking the photo with better lighting, showing any labels, or including a size reference.";

/// Item guess used when the backend gives none
pub const DEFAULT_ITEM_GUESS: &str = "Unknown item";

/// Explanation used when the backend gives none
pub const DEFAULT_EXPLANATION: &str = "Unable to determine explanation.";

/// Local note used when the backend gives none
pub const DEFAULT_LOCAL_NOTE: &str = "Local rules may vary. Check with your municipality.";

/// Policy values applied during normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationPolicy {
    confidence_threshold: f64,
    fallback_confidence: f64,
}

impl NormalizationPolicy {
    /// Create a policy, validating both values lie within `[0, 1]`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either value is outside `[0, 1]` or NaN
    pub fn new(confidence_threshold: f64, fallback_confidence: f64) -> ClassifierResult<Self> {
        for (name, value) in [
            ("confidence threshold", confidence_threshold),
            ("fallback confidence", fallback_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ClassifierError::config(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        Ok(Self {
            confidence_threshold,
            fallback_confidence,
        })
    }

    /// Confidence below which the low-confidence override applies
    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Confidence assumed for payloads without a numeric confidence
    pub fn fallback_confidence(&self) -> f64 {
        self.fallback_confidence
    }
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            fallback_confidence: DEFAULT_FALLBACK_CONFIDENCE,
        }
    }
}

/// Converts untrusted payloads into validated results
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultNormalizer {
    policy: NormalizationPolicy,
}

impl ResultNormalizer {
    /// Create a normalizer applying the given policy
    pub fn new(policy: NormalizationPolicy) -> Self {
        Self { policy }
    }

    /// Policy applied by this normalizer
    pub fn policy(&self) -> &NormalizationPolicy {
        &self.policy
    }

    /// Whether a resolved confidence triggers the low-confidence override
    pub fn is_low_confidence(&self, confidence: f64) -> bool {
        confidence < self.policy.confidence_threshold
    }

    /// Normalize an untrusted payload. Never fails and has no side effects.
    pub fn normalize(&self, raw: &RawClassification) -> ClassificationResult {
        let claimed_category =
            parse_category(raw.category.as_ref()).unwrap_or(Category::Special);
        let confidence =
            unit_interval(raw.confidence.as_ref()).unwrap_or(self.policy.fallback_confidence);

        let (category, explanation) = if self.is_low_confidence(confidence) {
            (Category::Special, LOW_CONFIDENCE_EXPLANATION.to_string())
        } else {
            (
                claimed_category,
                text(raw.explanation.as_ref()).unwrap_or_else(|| DEFAULT_EXPLANATION.to_string()),
            )
        };

        ClassificationResult {
            category,
            confidence,
            item_guess: text(raw.item_guess.as_ref())
                .unwrap_or_else(|| DEFAULT_ITEM_GUESS.to_string()),
            explanation,
            prep_steps: steps(raw.prep_steps.as_ref()),
            local_note: text(raw.local_note.as_ref())
                .unwrap_or_else(|| DEFAULT_LOCAL_NOTE.to_string()),
            secondary_category: parse_category(raw.secondary_category.as_ref()),
            secondary_confidence: unit_interval(raw.secondary_confidence.as_ref()),
        }
    }
}

/// Normalize with the default policy
pub fn normalize(raw: &RawClassification) -> ClassificationResult {
    ResultNormalizer::default().normalize(raw)
}

fn parse_category(value: Option<&Value>) -> Option<Category> {
    value.and_then(Value::as_str).and_then(Category::parse_lenient)
}

fn unit_interval(value: Option<&Value>) -> Option<f64> {
    value
        .and_then(Value::as_f64)
        .filter(|number| number.is_finite())
        .map(|number| number.clamp(0.0, 1.0))
}

// Stricter than a plain emptiness check: whitespace-only text counts as
// missing, so rendered fields always carry visible text.
fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

fn steps(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn normalize_json(value: Value) -> ClassificationResult {
        normalize(&RawClassification::from_value(value))
    }

    fn assorted_payloads() -> Vec<Value> {
        vec![
            json!({}),
            json!(null),
            json!({"category": "Recycle", "confidence": 0.9, "itemGuess": "glass bottle"}),
            json!({"category": "Recycle", "confidence": 0.3, "itemGuess": "mystery item"}),
            json!({"category": "Banana", "confidence": 1.5}),
            json!({"category": "Compost", "confidence": -2, "explanation": "peel"}),
            json!({"category": "Landfill", "confidence": "0.9", "prepSteps": "bag it"}),
            json!({"category": 7, "confidence": 0.55, "prepSteps": ["a", 1, null, "b"]}),
            json!({
                "category": "Special",
                "confidence": 0.8,
                "secondaryCategory": "Compost",
                "secondaryConfidence": 3
            }),
            json!({"secondaryCategory": "compost", "secondaryConfidence": "0.2"}),
            json!({"itemGuess": "   ", "explanation": "", "localNote": 12}),
        ]
    }

    #[test]
    fn well_formed_confident_payload_passes_through_unchanged() {
        let raw = json!({
            "category": "Recycle",
            "confidence": 0.9,
            "itemGuess": "glass bottle",
            "explanation": "clean glass",
            "prepSteps": ["rinse"],
            "localNote": "ok locally"
        });

        let result = normalize_json(raw.clone());

        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }

    #[test]
    fn low_confidence_forces_special_and_disclaimer() {
        let result = normalize_json(json!({
            "category": "Recycle",
            "confidence": 0.3,
            "itemGuess": "mystery item"
        }));

        assert_eq!(result.category, Category::Special);
        assert_eq!(result.explanation, LOW_CONFIDENCE_EXPLANATION);
        assert_eq!(result.item_guess, "mystery item");
        assert!(result.prep_steps.is_empty());
        assert_eq!(result.local_note, DEFAULT_LOCAL_NOTE);
    }

    #[test]
    fn low_confidence_override_ignores_model_explanation() {
        for category in Category::ALL {
            let result = normalize_json(json!({
                "category": category.as_str(),
                "confidence": 0.54,
                "explanation": "definitely recyclable"
            }));
            assert_eq!(result.category, Category::Special);
            assert_eq!(result.explanation, LOW_CONFIDENCE_EXPLANATION);
        }
    }

    #[test]
    fn threshold_is_strict() {
        let at_threshold = normalize_json(json!({"category": "Compost", "confidence": 0.55}));
        assert_eq!(at_threshold.category, Category::Compost);
        assert_eq!(at_threshold.explanation, DEFAULT_EXPLANATION);
    }

    #[test]
    fn out_of_range_confidence_is_clamped_and_unknown_category_is_special() {
        let result = normalize_json(json!({"confidence": 1.5, "category": "Banana"}));

        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.category, Category::Special);
        assert_eq!(result.explanation, DEFAULT_EXPLANATION);
        assert_eq!(result.item_guess, DEFAULT_ITEM_GUESS);
    }

    #[test]
    fn negative_confidence_is_clamped_to_zero() {
        let result = normalize_json(json!({"category": "Landfill", "confidence": -0.4}));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.category, Category::Special);
    }

    #[test]
    fn non_numeric_or_missing_confidence_uses_fallback() {
        for raw in [
            json!({"category": "Recycle"}),
            json!({"category": "Recycle", "confidence": "0.99"}),
            json!({"category": "Recycle", "confidence": true}),
        ] {
            let result = normalize_json(raw);
            assert_eq!(result.confidence, DEFAULT_FALLBACK_CONFIDENCE);
            // 0.5 is below the default threshold
            assert_eq!(result.category, Category::Special);
        }
    }

    #[test]
    fn confidence_always_in_unit_interval() {
        for raw in assorted_payloads() {
            let result = normalize_json(raw);
            assert!((0.0..=1.0).contains(&result.confidence));
            if let Some(secondary) = result.secondary_confidence {
                assert!((0.0..=1.0).contains(&secondary));
            }
        }
    }

    #[test]
    fn unknown_categories_resolve_to_special() {
        for category in [json!("Banana"), json!("recycle"), json!(3), json!(["Recycle"])] {
            let result = normalize_json(json!({"category": category, "confidence": 0.95}));
            assert_eq!(result.category, Category::Special);
        }
    }

    #[test]
    fn text_fields_are_never_empty() {
        for raw in assorted_payloads() {
            let result = normalize_json(raw);
            assert!(!result.item_guess.trim().is_empty());
            assert!(!result.explanation.trim().is_empty());
            assert!(!result.local_note.trim().is_empty());
        }
    }

    #[test]
    fn prep_steps_keep_only_strings_of_a_sequence() {
        let result = normalize_json(json!({"prepSteps": ["a", 1, null, "b"]}));
        assert_eq!(result.prep_steps, vec!["a".to_string(), "b".to_string()]);

        let result = normalize_json(json!({"prepSteps": "rinse"}));
        assert!(result.prep_steps.is_empty());
    }

    #[test]
    fn secondary_category_present_only_when_valid() {
        let present = normalize_json(json!({"secondaryCategory": "Compost"}));
        assert_eq!(present.secondary_category, Some(Category::Compost));

        for raw in [
            json!({}),
            json!({"secondaryCategory": "compost"}),
            json!({"secondaryCategory": null}),
            json!({"secondaryCategory": 2}),
        ] {
            assert_eq!(normalize_json(raw).secondary_category, None);
        }
    }

    #[test]
    fn secondary_confidence_present_only_when_numeric() {
        let clamped = normalize_json(json!({"secondaryConfidence": 3}));
        assert_eq!(clamped.secondary_confidence, Some(1.0));

        let missing = normalize_json(json!({"secondaryConfidence": "0.2"}));
        assert_eq!(missing.secondary_confidence, None);
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in assorted_payloads() {
            let once = normalize_json(raw);
            let twice = normalize(&RawClassification::from(&once));
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn custom_threshold_is_honoured() {
        let policy = NormalizationPolicy::new(0.8, DEFAULT_FALLBACK_CONFIDENCE).unwrap();
        let normalizer = ResultNormalizer::new(policy);
        let raw = RawClassification::from_value(json!({"category": "Recycle", "confidence": 0.7}));

        let result = normalizer.normalize(&raw);

        assert_eq!(result.category, Category::Special);
        assert_eq!(result.explanation, LOW_CONFIDENCE_EXPLANATION);
    }

    #[test]
    fn secondary_category_resolves_when_primary_is_overridden() {
        let result = normalize_json(json!({
            "category": "Recycle",
            "confidence": 0.2,
            "secondaryCategory": "Landfill",
            "secondaryConfidence": 0.4
        }));

        assert_eq!(result.category, Category::Special);
        assert_eq!(result.secondary_category, Some(Category::Landfill));
        assert_eq!(result.secondary_confidence, Some(0.4));
    }

    #[test]
    fn whitespace_only_text_uses_defaults() {
        let result = normalize_json(json!({
            "category": "Compost",
            "confidence": 0.9,
            "itemGuess": "  ",
            "explanation": "\t",
            "localNote": " \n "
        }));

        assert_eq!(result.item_guess, DEFAULT_ITEM_GUESS);
        assert_eq!(result.explanation, DEFAULT_EXPLANATION);
        assert_eq!(result.local_note, DEFAULT_LOCAL_NOTE);
    }

    #[test]
    fn policy_validation() {
        assert!(NormalizationPolicy::new(0.55, 0.5).is_ok());
        assert!(NormalizationPolicy::new(1.2, 0.5).is_err());
        assert!(NormalizationPolicy::new(0.55, -0.1).is_err());
        assert!(NormalizationPolicy::new(f64::NAN, 0.5).is_err());
    }
}
