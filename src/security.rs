use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::{AppError, AppResult};
use crate::media::ACCEPTED_AUDIO_EXTENSIONS;

const MAX_NAME_LENGTH: usize = 100;

// Path separators and control characters only
fn unsafe_filename_chars() -> &'static Regex {
    static UNSAFE_CHARS: OnceLock<Regex> = OnceLock::new();
    UNSAFE_CHARS.get_or_init(|| {
        Regex::new(r"[/\\\x00-\x1f\x7f]").expect("filename pattern is a valid regex")
    })
}

pub struct InputValidator;

impl InputValidator {
    /// The contributor name gates every submission.
    pub fn validate_contributor_name(name: &str) -> AppResult<()> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("name", "Please enter your name first"));
        }

        if trimmed.chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::validation("name", "Name too long (max 100 characters)"));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(AppError::validation("name", "Name contains invalid characters"));
        }

        Ok(())
    }

    pub fn validate_relationship(relationship: Option<&str>) -> AppResult<()> {
        let Some(relationship) = relationship else {
            return Ok(());
        };

        if relationship.trim().chars().count() > MAX_NAME_LENGTH {
            return Err(AppError::validation(
                "relationship",
                "Relationship too long (max 100 characters)",
            ));
        }

        if relationship.chars().any(char::is_control) {
            return Err(AppError::validation(
                "relationship",
                "Relationship contains invalid characters",
            ));
        }

        Ok(())
    }

    pub fn validate_endpoint_url(url: &str) -> AppResult<()> {
        let trimmed = url.trim();

        if trimmed.is_empty() {
            return Err(AppError::validation("endpoint_url", "Endpoint URL cannot be empty"));
        }

        let parsed = reqwest::Url::parse(trimmed).map_err(|_| AppError::invalid_endpoint(trimmed))?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(AppError::invalid_endpoint(trimmed));
        }

        if trimmed.len() > 2000 {
            return Err(AppError::validation("endpoint_url", "Endpoint URL too long"));
        }

        Ok(())
    }

    pub fn validate_file_path(path: &str) -> AppResult<()> {
        if path.trim().is_empty() {
            return Err(AppError::validation("file_path", "File path cannot be empty"));
        }

        let path_obj = Path::new(path);

        match path_obj.extension() {
            Some(extension) => {
                let ext = extension.to_string_lossy().to_lowercase();
                if !ACCEPTED_AUDIO_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(AppError::invalid_file_type(path));
                }
            }
            None => {
                return Err(AppError::validation("file_path", "File must have an extension"));
            }
        }

        if !path_obj.exists() {
            return Err(AppError::file_not_found(path));
        }

        if !path_obj.is_file() {
            return Err(AppError::validation("file_path", "Path is not a file"));
        }

        Ok(())
    }

    pub fn validate_upload_file(file_path: &str, max_file_size_mb: u64) -> AppResult<()> {
        Self::validate_file_path(file_path)?;

        let metadata = std::fs::metadata(file_path)?;
        if metadata.len() > max_file_size_mb.saturating_mul(1024 * 1024) {
            return Err(AppError::file_too_large(file_path, max_file_size_mb));
        }

        Ok(())
    }

    pub fn sanitize_filename(filename: &str) -> String {
        let sanitized = unsafe_filename_chars().replace_all(filename, "_");

        if sanitized.chars().count() > 255 {
            let truncated: String = sanitized.chars().take(252).collect();
            format!("{}...", truncated)
        } else {
            sanitized.to_string()
        }
    }
}
