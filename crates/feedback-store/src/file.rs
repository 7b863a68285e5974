// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! JSON Lines feedback log
//!
//! One [`FeedbackRecord`] per line, appended under an async mutex so that
//! concurrent submissions never interleave within a line.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use shared_types::FeedbackRecord;
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, warn};

use crate::{
    error::{FeedbackStoreError, FeedbackStoreResult},
    store::FeedbackStore,
};

/// Default location of the feedback log
pub const DEFAULT_FEEDBACK_PATH: &str = "data/feedback.jsonl";

/// Append-only feedback log on the local filesystem
#[derive(Debug)]
pub struct JsonLinesFeedbackStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesFeedbackStore {
    /// Store backed by the file at `path`; the file is created on first append
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every well-formed record, skipping blank or corrupt lines
    pub async fn read_all(&self) -> FeedbackStoreResult<Vec<FeedbackRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FeedbackStoreError::io(&self.path, &e)),
        };

        let records = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping corrupt feedback line"
                    );
                    None
                }
            })
            .collect();

        Ok(records)
    }

    async fn ensure_parent_dir(&self) -> FeedbackStoreResult<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .await
                .map_err(|e| FeedbackStoreError::io(parent, &e)),
            _ => Ok(()),
        }
    }
}

impl Default for JsonLinesFeedbackStore {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_PATH)
    }
}

impl FeedbackStore for JsonLinesFeedbackStore {
    async fn append(&self, record: FeedbackRecord) -> FeedbackStoreResult<()> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        self.ensure_parent_dir().await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| FeedbackStoreError::io(&self.path, &e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| FeedbackStoreError::io(&self.path, &e))?;
        file.flush()
            .await
            .map_err(|e| FeedbackStoreError::io(&self.path, &e))?;

        debug!(path = %self.path.display(), scan_id = %record.scan_id, "Feedback appended");
        Ok(())
    }

    async fn health_check(&self) -> FeedbackStoreResult<bool> {
        if let Err(e) = self.ensure_parent_dir().await {
            warn!(error = %e, "Feedback directory unavailable");
            return Ok(false);
        }

        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        match fs::metadata(directory).await {
            Ok(metadata) => Ok(metadata.is_dir() && !metadata.permissions().readonly()),
            Err(e) => {
                warn!(error = %e, "Feedback directory unavailable");
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
