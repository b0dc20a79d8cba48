use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::uploader::progress_tracker::{EntryId, EntryList, Notification, UploadEntry};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file type: {path}. Only audio recordings are supported.")]
    InvalidFileType { path: String },

    #[error("File too large: {path}. Maximum size is {max_mb}MB.")]
    FileTooLarge { path: String, max_mb: u64 },

    #[error("Webhook failed: {status} {reason}")]
    RemoteRejected {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::FileNotFound {
            path: path.to_string(),
        }
    }

    pub fn invalid_file_type(path: &str) -> Self {
        Self::InvalidFileType {
            path: path.to_string(),
        }
    }

    pub fn file_too_large(path: &str, max_mb: u64) -> Self {
        Self::FileTooLarge {
            path: path.to_string(),
            max_mb,
        }
    }

    pub fn invalid_endpoint(url: &str) -> Self {
        Self::InvalidEndpoint {
            url: url.to_string(),
        }
    }

    pub fn remote_rejected(status: reqwest::StatusCode, body: String) -> Self {
        Self::RemoteRejected {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            body,
        }
    }

    /// Transport failures and server-side rejections may succeed on a later
    /// attempt. The relay never retries on its own; callers use this to decide.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) | AppError::Io(_) => true,
            AppError::RemoteRejected { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

/// Replace a single entry through copy-on-write. Readers holding an older
/// snapshot keep seeing the list as it was.
pub fn safe_entry_update<F>(entries: &EntryList, entry_id: &EntryId, operation: &str, f: F) -> bool
where
    F: FnOnce(&mut UploadEntry),
{
    match entries.lock() {
        Ok(mut current) => {
            let mut next: Vec<UploadEntry> = (**current).clone();
            if let Some(entry) = next.iter_mut().find(|e| &e.id == entry_id) {
                f(entry);
                *current = Arc::new(next);
                true
            } else {
                log::warn!("Entry {} not found for {} operation", entry_id, operation);
                false
            }
        }
        Err(e) => {
            log::error!(
                "Failed to acquire entry lock for {} on {} (non-critical): {}",
                operation,
                entry_id,
                e
            );
            false
        }
    }
}

pub fn safe_entry_read<F, R>(
    entries: &EntryList,
    entry_id: &EntryId,
    operation: &str,
    f: F,
) -> Option<R>
where
    F: FnOnce(&UploadEntry) -> R,
{
    match entries.lock() {
        Ok(current) => match current.iter().find(|e| &e.id == entry_id) {
            Some(entry) => Some(f(entry)),
            None => {
                log::warn!("Entry {} not found for {} operation", entry_id, operation);
                None
            }
        },
        Err(e) => {
            log::error!(
                "Failed to acquire entry lock for {} on {} (non-critical): {}",
                operation,
                entry_id,
                e
            );
            None
        }
    }
}

/// Snapshot of the whole list.
pub fn safe_entries_read(entries: &EntryList) -> Arc<Vec<UploadEntry>> {
    match entries.lock() {
        Ok(current) => Arc::clone(&*current),
        Err(poisoned) => {
            log::warn!("Entry lock poisoned, reading last written list");
            let current = poisoned.into_inner();
            Arc::clone(&*current)
        }
    }
}

/// Emit a notification to whoever renders them
pub fn safe_notify(sender: &UnboundedSender<Notification>, notification: Notification) -> bool {
    log::debug!(
        "Notification ({:?}): {}",
        notification.level,
        notification.message
    );
    match sender.send(notification) {
        Ok(_) => true,
        Err(e) => {
            log::warn!("Failed to deliver notification (non-critical): {}", e.0.message);
            false
        }
    }
}
