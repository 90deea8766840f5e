//! Example journal
//!
//! Append-only JSON Lines record of every processed query, kept for offline
//! inspection. Writing is best effort: failures are logged, never returned.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Local>,
    pub query_text: String,
    pub decision: String,
    pub response_text_snippet: String,
}

pub struct ExampleJournal {
    path: Option<PathBuf>,
    // Serializes appends so concurrent queries never interleave lines.
    write_lock: Mutex<()>,
}

impl ExampleJournal {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            write_lock: Mutex::new(()),
        }
    }

    /// A journal that records nothing.
    pub fn disabled() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn record(&self, query: &str, decision: &str, response: &str) {
        let Some(path) = self.path.as_ref() else {
            return;
        };

        let entry = JournalEntry {
            timestamp: Local::now(),
            query_text: query.to_string(),
            decision: decision.to_string(),
            response_text_snippet: response.to_string(),
        };

        if let Err(e) = self.append(path, &entry).await {
            error!("Failed to write to {}: {}", path.display(), e);
        }
    }

    async fn append(&self, path: &Path, entry: &JournalEntry) -> crate::Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
