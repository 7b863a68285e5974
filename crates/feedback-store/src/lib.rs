// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Append-only persistence for classification feedback
//!
//! - [`store`]: the [`FeedbackStore`] trait
//! - [`file`]: JSON Lines log on disk
//! - [`memory`]: in-process store
//! - [`sink`]: enum over the concrete stores

pub mod error;
pub mod file;
pub mod memory;
pub mod sink;
pub mod store;

pub use error::{FeedbackStoreError, FeedbackStoreResult};
pub use file::{DEFAULT_FEEDBACK_PATH, JsonLinesFeedbackStore};
pub use memory::InMemoryFeedbackStore;
pub use sink::FeedbackSink;
pub use store::FeedbackStore;
