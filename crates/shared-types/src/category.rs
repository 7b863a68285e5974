// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Disposal categories
//!
//! The closed set of buckets a waste item can be sorted into. No other value is
//! ever allowed past the classification boundary.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Disposal bucket for a waste item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    /// Clean paper, cardboard, metal cans, glass and #1/#2 plastic bottles
    Recycle,
    /// Contaminated or mixed-material items that go to general waste
    Landfill,
    /// Food scraps, yard waste and other organics
    Compost,
    /// Hazardous items, electronics, or anything the classifier is unsure about
    Special,
}

/// Error returned when text does not name one of the four categories
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown disposal category: {0:?}")]
pub struct CategoryParseError(pub String);

impl Category {
    /// Every category, in display order
    pub const ALL: [Self; 4] = [Self::Recycle, Self::Landfill, Self::Compost, Self::Special];

    /// Returns the canonical wire name of the category
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recycle => "Recycle",
            Self::Landfill => "Landfill",
            Self::Compost => "Compost",
            Self::Special => "Special",
        }
    }

    /// Returns a short guide to what belongs in this bucket
    pub const fn description(self) -> &'static str {
        match self {
            Self::Recycle => {
                "Clean paper, cardboard, metal cans, glass bottles, plastic bottles (#1, #2)"
            }
            Self::Landfill => {
                "Contaminated items, mixed materials, plastic bags, styrofoam, broken glass"
            }
            Self::Compost => "Food scraps, yard waste, coffee grounds, paper towels",
            Self::Special => {
                "Electronics, batteries, light bulbs, medications, paint, hazardous materials, or when uncertain"
            }
        }
    }

    /// Parses a category, returning `None` for anything that is not an exact wire name
    pub fn parse_lenient(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| CategoryParseError(s.to_string()))
    }
}
