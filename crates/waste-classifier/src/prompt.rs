// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Classifier prompt construction

use std::fmt;

use shared_types::Category;

/// Region used when the caller gives none
pub const DEFAULT_REGION: &str = "Generic / Unknown";

/// Longest region hint placed in the prompt
pub const MAX_REGION_LENGTH: usize = 100;

/// Instruction sent alongside the image
pub const USER_INSTRUCTION: &str = "Classify this waste item and return JSON only.";

/// Free-text region hint, sanitised before it reaches the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region(String);

impl Region {
    /// Sanitise a caller-supplied region. Blank input yields the default region.
    pub fn new(value: &str) -> Self {
        let cleaned: String = value
            .chars()
            .filter(|c| !c.is_control())
            .collect::<String>()
            .trim()
            .chars()
            .take(MAX_REGION_LENGTH)
            .collect();

        if cleaned.is_empty() {
            Self::default()
        } else {
            Self(cleaned)
        }
    }

    /// Region from an optional hint
    pub fn from_optional(value: Option<&str>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }

    /// Region text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(DEFAULT_REGION.to_string())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the system prompt for a region
pub fn system_prompt(region: &Region) -> String {
    let categories: String = Category::ALL
        .iter()
        .map(|category| format!("- {}: {}\n", category, category.description()))
        .collect();

    format!(
        r#"You are a waste classification expert. Analyze the image and determine the correct disposal category.

RULES:
- Be CONSERVATIVE with recycling claims. When in doubt, prefer "Special" or "Landfill"
- Food-contaminated items (grease, food residue) should go to "Landfill" or "Compost"
- If you cannot identify the item or are uncertain, return "Special" with guidance
- Consider the user's region when making recommendations: {region}

CATEGORIES:
{categories}
You MUST respond with valid JSON only, matching this exact schema:
{{
  "category": "Recycle" | "Landfill" | "Compost" | "Special",
  "confidence": 0.0-1.0,
  "itemGuess": "what you think the item is",
  "explanation": "brief explanation for the classification",
  "prepSteps": ["step1", "step2"],
  "localNote": "any regional considerations",
  "secondaryCategory": "optional alternative category",
  "secondaryConfidence": 0.0-1.0
}}"#
    )
}
