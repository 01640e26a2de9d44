use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ParleyError, Result};

/// Default number of turns returned by [`ConversationLog::recent`]
pub const DEFAULT_RECENT_LIMIT: usize = 50;

/// One persisted exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub user_message: String,
    pub bot_response: String,
    pub detected_language: String,
    /// Text handed to the backend, after normalization to English
    pub normalized_message: String,
    pub backend: Option<String>,
    #[serde(default)]
    pub used_fallback: bool,
}

/// Append-only JSON-lines store of conversation turns
pub struct ConversationLog {
    path: PathBuf,
}

impl ConversationLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, turn: &ConversationTurn) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_string(turn)?;
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ParleyError::History(format!("Cannot open {}: {}", self.path.display(), e)))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Saved turn {} to {}", turn.id, self.path.display());
        Ok(())
    }

    /// Up to `limit` turns, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<ConversationTurn>> {
        let mut turns = self.read_all().await?;
        turns.reverse();
        turns.truncate(limit);
        Ok(turns)
    }

    /// Remove every stored turn, returning how many there were
    pub async fn clear(&self) -> Result<u64> {
        let count = self.read_all().await?.len() as u64;
        if fs::try_exists(&self.path).await? {
            fs::remove_file(&self.path).await?;
        }
        Ok(count)
    }

    async fn read_all(&self) -> Result<Vec<ConversationTurn>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let mut turns = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ConversationTurn>(line) {
                Ok(turn) => turns.push(turn),
                Err(e) => warn!(
                    "Skipping malformed history line {} in {}: {}",
                    number + 1,
                    self.path.display(),
                    e
                ),
            }
        }
        Ok(turns)
    }
}
