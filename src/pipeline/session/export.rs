use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ConversationMessage;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Conversation history is empty, nothing to export")]
    EmptyHistory,

    #[error("Cannot write transcript {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot serialize transcript: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub export_time: String,
    pub total_messages: usize,
    pub total_tokens: u64,
}

/// Flat transcript record of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExport {
    pub metadata: ExportMetadata,
    pub messages: Vec<ConversationMessage>,
}

impl SessionExport {
    pub fn new(
        messages: &[ConversationMessage],
        total_tokens: u64,
        export_time: NaiveDateTime,
    ) -> Result<Self, ExportError> {
        if messages.is_empty() {
            return Err(ExportError::EmptyHistory);
        }
        Ok(Self {
            metadata: ExportMetadata {
                export_time: export_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                total_messages: messages.len(),
                total_tokens,
            },
            messages: messages.to_vec(),
        })
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the transcript into `dir` (created if needed). Returns the file path.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(export_file_name(Local::now().naive_local()));
        let json = self.to_json()?;
        std::fs::write(&path, json).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            messages = self.metadata.total_messages,
            "Exported conversation transcript"
        );
        Ok(path)
    }
}

/// `chatlog_YYYYmmdd_HHMMSS.json`
pub fn export_file_name(at: NaiveDateTime) -> String {
    format!("chatlog_{}.json", at.format("%Y%m%d_%H%M%S"))
}
