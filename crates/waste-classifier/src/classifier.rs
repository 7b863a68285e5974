// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Classifier backend abstraction
//!
//! A [`Classifier`] is an opaque function from an image and region hint to an
//! untrusted [`RawClassification`]. Nothing it returns is trusted; callers run
//! every payload through the [`crate::ResultNormalizer`].

use crate::{error::ClassifierResult, image::ImagePayload, prompt::Region, raw::RawClassification};

/// Single classification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    /// Image to classify
    pub image: ImagePayload,
    /// Region hint placed in the prompt
    pub region: Region,
}

impl ClassificationRequest {
    /// Create a request for the default region
    pub fn new(image: ImagePayload) -> Self {
        Self {
            image,
            region: Region::default(),
        }
    }

    /// Set the region hint
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }
}

/// Backend capable of producing a raw classification
pub trait Classifier: Send + Sync {
    /// Classify one image
    ///
    /// # Errors
    ///
    /// Returns an error when the backend cannot be reached, rejects the
    /// credentials, or answers without any content. A malformed payload is not
    /// an error.
    fn classify(
        &self,
        request: &ClassificationRequest,
    ) -> impl Future<Output = ClassifierResult<RawClassification>> + Send;

    /// Check whether the backend is reachable
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself could not be performed
    fn health_check(&self) -> impl Future<Output = ClassifierResult<bool>> + Send;

    /// Name of this backend for logs and health reports
    fn name(&self) -> &str;
}
