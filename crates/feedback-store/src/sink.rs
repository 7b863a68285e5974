// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Concrete store selection

use shared_types::FeedbackRecord;

use crate::{
    error::FeedbackStoreResult, file::JsonLinesFeedbackStore, memory::InMemoryFeedbackStore,
    store::FeedbackStore,
};

/// One of the available feedback stores
#[derive(Debug)]
pub enum FeedbackSink {
    /// Append-only JSON Lines file
    JsonLines(JsonLinesFeedbackStore),
    /// Process memory
    InMemory(InMemoryFeedbackStore),
}

impl From<JsonLinesFeedbackStore> for FeedbackSink {
    fn from(store: JsonLinesFeedbackStore) -> Self {
        Self::JsonLines(store)
    }
}

impl From<InMemoryFeedbackStore> for FeedbackSink {
    fn from(store: InMemoryFeedbackStore) -> Self {
        Self::InMemory(store)
    }
}

impl FeedbackStore for FeedbackSink {
    async fn append(&self, record: FeedbackRecord) -> FeedbackStoreResult<()> {
        match self {
            Self::JsonLines(store) => store.append(record).await,
            Self::InMemory(store) => store.append(record).await,
        }
    }

    async fn health_check(&self) -> FeedbackStoreResult<bool> {
        match self {
            Self::JsonLines(store) => store.health_check().await,
            Self::InMemory(store) => store.health_check().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::JsonLines(store) => store.name(),
            Self::InMemory(store) => store.name(),
        }
    }
}
