// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Feedback store abstraction

use shared_types::FeedbackRecord;

use crate::error::FeedbackStoreResult;

/// Append-only sink for feedback records
///
/// Records are never mutated or deleted once appended.
pub trait FeedbackStore: Send + Sync {
    /// Persist one record
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be durably written
    fn append(&self, record: FeedbackRecord) -> impl Future<Output = FeedbackStoreResult<()>> + Send;

    /// Check whether the store can accept writes
    ///
    /// # Errors
    ///
    /// Returns an error if the check itself could not be performed
    fn health_check(&self) -> impl Future<Output = FeedbackStoreResult<bool>> + Send;

    /// Name of this store for logs and health reports
    fn name(&self) -> &str;
}
