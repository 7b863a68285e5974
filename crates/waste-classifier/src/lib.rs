// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Vision-model waste classification
//!
//! This crate turns a photo of a waste item into a disposal recommendation. The
//! classifier backend is treated as an untrusted black box: whatever it returns
//! passes through the [`ResultNormalizer`], which guarantees a well-formed
//! [`shared_types::ClassificationResult`] and forces low-confidence answers to
//! the cautious `Special` category.
//!
//! # Architecture
//!
//! - [`normalizer`]: untrusted payload to safe result, including the
//!   low-confidence override
//! - [`raw`]: loosely-typed backend payload
//! - [`classifier`]: backend trait and request type
//! - [`openai`]: OpenAI vision backend with retries
//! - [`service`]: orchestration of backend plus normalizer
//! - [`image`] and [`prompt`]: request inputs
//! - [`config`]: backend settings
//! - [`error`]: error taxonomy
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use waste_classifier::{
//!     ClassificationRequest, ImagePayload, OpenAiConfig, OpenAiVisionClient, Region,
//!     ResultNormalizer, WasteClassifier,
//! };
//!
//! # async fn example(image: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let backend = OpenAiVisionClient::new(&OpenAiConfig::new("sk-your-api-key".to_string()))?;
//! let classifier = WasteClassifier::new(backend, ResultNormalizer::default());
//!
//! let request = ClassificationRequest::new(ImagePayload::from_data_url(image)?)
//!     .with_region(Region::new("Portland, OR"));
//! let outcome = classifier.classify(&request).await?;
//!
//! println!("{}: {}", outcome.result.category, outcome.result.explanation);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod error;
pub mod image;
pub mod normalizer;
pub mod openai;
pub mod prompt;
pub mod raw;
pub mod service;

pub use classifier::{ClassificationRequest, Classifier};
pub use config::OpenAiConfig;
pub use error::{ClassifierError, ClassifierResult, ErrorContext};
pub use image::ImagePayload;
pub use normalizer::{NormalizationPolicy, ResultNormalizer, normalize};
pub use openai::OpenAiVisionClient;
pub use prompt::{Region, system_prompt};
pub use raw::RawClassification;
pub use service::{ClassificationOutcome, WasteClassifier};
