use crate::errors::AppResult;
use crate::media::format_file_size;
use crate::uploader::progress_tracker::{
    count_with_status, Notification, NotificationLevel, UploadEntry, UploadStatus,
};

pub const NAME_REQUIRED_HINT: &str = "Please enter your name above first";

/// Shown instead of the file picker while no name has been entered
pub fn input_gate(name: &str) -> Option<&'static str> {
    if name.trim().is_empty() {
        Some(NAME_REQUIRED_HINT)
    } else {
        None
    }
}

pub fn render_entry(entry: &UploadEntry) -> String {
    let (marker, detail) = match entry.status {
        UploadStatus::Pending => ("…", format!("{:>3}%", entry.progress_percent)),
        UploadStatus::Complete => ("✔", "Done!".to_string()),
        UploadStatus::Failed => ("✖", "Failed".to_string()),
    };

    format!(
        "{} {}  ({})  {}",
        marker,
        entry.display_name,
        format_file_size(entry.size_bytes),
        detail
    )
}

/// The uploaded file list with its header and thank-you message
pub fn render_entries(entries: &[UploadEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let completed = count_with_status(entries, UploadStatus::Complete);
    let mut lines = vec![format!("Uploaded Files ({} complete)", completed)];
    lines.extend(entries.iter().map(|entry| format!("  {}", render_entry(entry))));

    if let Some(thanks) = thank_you_message(completed) {
        lines.push(String::new());
        lines.push(thanks);
    }

    lines.join("\n")
}

pub fn thank_you_message(completed: usize) -> Option<String> {
    match completed {
        0 => None,
        1 => Some("Thank you! Your recording has been received.".to_string()),
        _ => Some("Thank you! Your recordings have been received.".to_string()),
    }
}

pub fn render_notification(notification: &Notification) -> String {
    let prefix = match notification.level {
        NotificationLevel::Success => "✔",
        NotificationLevel::Warning => "⚠",
        NotificationLevel::Error => "✖",
    };
    format!("{} {}", prefix, notification.message)
}

pub fn render_entries_json(entries: &[UploadEntry]) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(entries)?)
}
