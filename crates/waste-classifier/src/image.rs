// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Image payload extraction from data URLs

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ClassifierError, ClassifierResult};

/// MIME type assumed when the payload carries no data URL prefix
pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Shortest base64 body accepted as an image
pub const MIN_BASE64_LENGTH: usize = 100;

/// Regex for the `data:image/<type>;base64,` prefix
static DATA_URL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/[^;]+);base64,").expect("data URL prefix regex should compile")
});

/// Base64 image with its MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    base64_data: String,
}

impl ImagePayload {
    /// Parse a `data:image/<type>;base64,<data>` URL or bare base64 text
    ///
    /// # Errors
    ///
    /// Returns a validation error when the input is empty or the base64 body is
    /// shorter than [`MIN_BASE64_LENGTH`]
    pub fn from_data_url(input: &str) -> ClassifierResult<Self> {
        if input.is_empty() {
            return Err(ClassifierError::validation("No image provided"));
        }

        let (mime_type, base64_data) = match DATA_URL_PREFIX.captures(input) {
            Some(captures) => {
                let prefix_len = captures.get(0).map_or(0, |m| m.end());
                let mime_type = captures
                    .get(1)
                    .map_or(DEFAULT_MIME_TYPE, |m| m.as_str());
                (mime_type, &input[prefix_len..])
            }
            None => (DEFAULT_MIME_TYPE, input),
        };

        if base64_data.len() < MIN_BASE64_LENGTH {
            return Err(ClassifierError::validation(
                "Image appears to be invalid or too small",
            ));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            base64_data: base64_data.to_string(),
        })
    }

    /// MIME type of the image
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 body without any prefix
    pub fn base64_data(&self) -> &str {
        &self.base64_data
    }

    /// Rebuild the data URL sent to the backend
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64_data)
    }
}
