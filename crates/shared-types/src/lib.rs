// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Shared types for the waste classification service
//!
//! This crate provides the wire and domain types that are shared across the
//! classifier, the feedback store and the HTTP service, avoiding circular
//! dependencies between them.

pub mod category;
pub mod classification;
pub mod feedback;
pub mod response;

pub use category::{Category, CategoryParseError};
pub use classification::ClassificationResult;
pub use feedback::FeedbackRecord;
pub use response::ApiResponse;
