use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::errors::{
    safe_entries_read, safe_entry_read, safe_entry_update, safe_notify, AppError, AppResult,
};
use crate::media::SourceFile;
use crate::security::InputValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadEntry {
    pub id: EntryId,
    pub display_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub status: UploadStatus,
    pub progress_percent: u8,
}

/// Shared, copy-on-write list of entries
pub type EntryList = Arc<Mutex<Arc<Vec<UploadEntry>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Simulated progress settings. The value is cosmetic: it climbs by `step`
/// every `interval` and stops at `cap` until the relay confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSettings {
    pub interval: Duration,
    pub step: u8,
    pub cap: u8,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            step: 10,
            cap: 90,
        }
    }
}

impl From<&RelayConfig> for ProgressSettings {
    fn from(config: &RelayConfig) -> Self {
        Self {
            interval: config.progress_interval(),
            step: config.progress_step,
            cap: config.progress_cap,
        }
    }
}

/// One simulated tick. Never decreases and never passes `cap`.
pub fn advance_progress(current: u8, step: u8, cap: u8) -> u8 {
    if current >= cap {
        return current;
    }
    current.saturating_add(step).min(cap)
}

/// Owns the user-visible upload attempts of one session.
pub struct UploadTracker {
    entries: EntryList,
    tickers: Mutex<HashMap<EntryId, JoinHandle<()>>>,
    notifications: UnboundedSender<Notification>,
    progress: ProgressSettings,
    fallback_email: String,
}

impl UploadTracker {
    /// Returns the tracker and the stream of user-facing notifications
    pub fn new(
        progress: ProgressSettings,
        fallback_email: impl Into<String>,
    ) -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let tracker = Self {
            entries: Arc::new(Mutex::new(Arc::new(Vec::new()))),
            tickers: Mutex::new(HashMap::new()),
            notifications: sender,
            progress,
            fallback_email: fallback_email.into(),
        };
        (tracker, receiver)
    }

    pub fn from_config(config: &RelayConfig) -> (Self, UnboundedReceiver<Notification>) {
        Self::new(ProgressSettings::from(config), config.fallback_email.clone())
    }

    /// Register a selected file as a pending entry and start its progress
    /// ticker. A blank name creates nothing and raises a warning instead.
    /// Must be called from within a tokio runtime.
    pub fn register(&self, name: &str, file: &SourceFile) -> AppResult<EntryId> {
        if let Err(e) = InputValidator::validate_contributor_name(name) {
            self.warn_validation(&e);
            return Err(e);
        }

        let entry = UploadEntry {
            id: EntryId::generate(),
            display_name: file.file_name.clone(),
            size_bytes: file.size_bytes(),
            created_at: Utc::now(),
            status: UploadStatus::Pending,
            progress_percent: 0,
        };
        let entry_id = entry.id;

        self.append(entry)?;
        self.start_ticker(entry_id);

        log::info!(
            "Registered {} ({} bytes) as entry {}",
            file.file_name,
            file.size_bytes(),
            entry_id
        );
        Ok(entry_id)
    }

    /// Settle a pending entry with the relay outcome
    pub fn resolve(&self, entry_id: &EntryId, outcome: &AppResult<()>) {
        self.stop_ticker(entry_id);

        let display_name = match safe_entry_read(&self.entries, entry_id, "resolve", |e| {
            e.display_name.clone()
        }) {
            Some(name) => name,
            None => return,
        };

        match outcome {
            Ok(()) => {
                safe_entry_update(&self.entries, entry_id, "resolve success", |entry| {
                    entry.status = UploadStatus::Complete;
                    entry.progress_percent = 100;
                });
                log::info!("Upload of {} complete (entry {})", display_name, entry_id);
                safe_notify(
                    &self.notifications,
                    Notification::success(format!("{} uploaded successfully!", display_name)),
                );
            }
            Err(e) => {
                safe_entry_update(&self.entries, entry_id, "resolve failure", |entry| {
                    entry.status = UploadStatus::Failed;
                    entry.progress_percent = 0;
                });
                log::warn!(
                    "Upload of {} failed (entry {}, retryable: {}): {}",
                    display_name,
                    entry_id,
                    e.is_retryable(),
                    e
                );
                safe_notify(
                    &self.notifications,
                    Notification::error(format!(
                        "Failed to upload {}. Try emailing to {} instead.",
                        display_name, self.fallback_email
                    )),
                );
            }
        }
    }

    /// Raise a user-facing warning for input rejected before any upload
    pub fn warn_validation(&self, error: &AppError) {
        let message = match error {
            AppError::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };
        log::warn!("Submission rejected: {}", message);
        safe_notify(&self.notifications, Notification::warning(message));
    }

    /// Raise an error notification not tied to an entry
    pub fn report_error(&self, message: impl Into<String>) {
        safe_notify(&self.notifications, Notification::error(message));
    }

    pub fn snapshot(&self) -> Arc<Vec<UploadEntry>> {
        safe_entries_read(&self.entries)
    }

    pub fn entry(&self, entry_id: &EntryId) -> Option<UploadEntry> {
        self.snapshot().iter().find(|e| &e.id == entry_id).cloned()
    }

    pub fn completed_count(&self) -> usize {
        count_with_status(&self.snapshot(), UploadStatus::Complete)
    }

    pub fn failed_count(&self) -> usize {
        count_with_status(&self.snapshot(), UploadStatus::Failed)
    }

    fn append(&self, entry: UploadEntry) -> AppResult<()> {
        let mut current = self
            .entries
            .lock()
            .map_err(|e| AppError::Internal(format!("Entry list lock poisoned: {}", e)))?;
        let mut next: Vec<UploadEntry> = (**current).clone();
        next.push(entry);
        *current = Arc::new(next);
        Ok(())
    }

    fn start_ticker(&self, entry_id: EntryId) {
        let entries = Arc::clone(&self.entries);
        let settings = self.progress;

        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + settings.interval, settings.interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;

                let pending_progress = safe_entry_read(&entries, &entry_id, "progress tick", |e| {
                    (e.status == UploadStatus::Pending).then_some(e.progress_percent)
                })
                .flatten();
                match pending_progress {
                    None => break,
                    Some(progress) if progress >= settings.cap => continue,
                    Some(_) => {}
                }

                safe_entry_update(&entries, &entry_id, "progress tick", |entry| {
                    if entry.status == UploadStatus::Pending {
                        entry.progress_percent =
                            advance_progress(entry.progress_percent, settings.step, settings.cap);
                    }
                });
            }
        });

        match self.tickers.lock() {
            Ok(mut tickers) => {
                tickers.insert(entry_id, handle);
            }
            Err(e) => {
                log::warn!("Failed to track progress ticker (non-critical): {}", e);
                handle.abort();
            }
        }
    }

    fn stop_ticker(&self, entry_id: &EntryId) {
        match self.tickers.lock() {
            Ok(mut tickers) => {
                if let Some(handle) = tickers.remove(entry_id) {
                    handle.abort();
                }
            }
            Err(e) => {
                log::warn!("Failed to stop progress ticker (non-critical): {}", e);
            }
        }
    }
}

impl Drop for UploadTracker {
    fn drop(&mut self) {
        if let Ok(mut tickers) = self.tickers.lock() {
            for (_, handle) in tickers.drain() {
                handle.abort();
            }
        }
    }
}

pub fn count_with_status(entries: &[UploadEntry], status: UploadStatus) -> usize {
    entries.iter().filter(|e| e.status == status).count()
}
