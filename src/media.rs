use std::path::Path;

use crate::errors::AppResult;
use crate::security::InputValidator;

/// Extensions accepted by the upload picker
pub const ACCEPTED_AUDIO_EXTENSIONS: &[&str] = &[
    "m4a", "mp3", "wav", "ogg", "webm", "aac", "flac", "opus", "mp4", "caf", "amr",
];

/// A file ready to be relayed: bytes plus the descriptors the webhook sees.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk, detecting its MIME type from the extension
    pub async fn from_path(file_path: &str) -> AppResult<Self> {
        let data = tokio::fs::read(file_path).await?;
        let file_name = Path::new(file_path)
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let content_type = detect_mime_type(file_path).to_string();

        log::debug!(
            "Loaded {} ({} bytes, {})",
            file_name,
            data.len(),
            content_type
        );

        Ok(Self {
            file_name: InputValidator::sanitize_filename(&file_name),
            content_type,
            data,
        })
    }

    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

pub fn detect_mime_type(file_path: &str) -> &'static str {
    let extension = Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("m4a") => "audio/mp4",
        Some("mp4") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("webm") => "audio/webm",
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        Some("caf") => "audio/x-caf",
        Some("amr") => "audio/amr",
        _ => "application/octet-stream",
    }
}

/// Human readable size, one decimal above bytes.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
