// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory feedback store for tests and ephemeral deployments

use shared_types::FeedbackRecord;
use tokio::sync::RwLock;

use crate::{error::FeedbackStoreResult, store::FeedbackStore};

/// Feedback store that keeps records in process memory
#[derive(Debug, Default)]
pub struct InMemoryFeedbackStore {
    records: RwLock<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record in append order
    pub async fn records(&self) -> Vec<FeedbackRecord> {
        self.records.read().await.clone()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether nothing has been stored yet
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl FeedbackStore for InMemoryFeedbackStore {
    async fn append(&self, record: FeedbackRecord) -> FeedbackStoreResult<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn health_check(&self) -> FeedbackStoreResult<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
