use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

pub const DEFAULT_ENDPOINT_URL: &str = "https://plex.app.n8n.cloud/webhook/for-kirsten";
pub const ENDPOINT_ENV_VAR: &str = "MEMORY_RELAY_ENDPOINT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub endpoint_url: String,
    pub attachment_field: String,
    pub metadata_field: String,
    pub upload_type: String,
    pub progress_tick_ms: u64,
    pub progress_step: u8,
    pub progress_cap: u8,
    pub fallback_email: String,
    pub max_file_size_mb: u64,
    pub request_timeout_secs: Option<u64>, // None keeps the transport default
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            attachment_field: "attachment".to_string(),
            metadata_field: "metadata".to_string(),
            upload_type: "file_upload".to_string(),
            progress_tick_ms: 200,
            progress_step: 10,
            progress_cap: 90,
            fallback_email: "jeff@plex.nz".to_string(),
            max_file_size_mb: 500,
            request_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    /// Apply the endpoint override from the environment, if set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV_VAR) {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                log::info!("Using endpoint from {}", ENDPOINT_ENV_VAR);
                self.endpoint_url = endpoint.to_string();
            }
        }
        self
    }
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("Memory Relay");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<RelayConfig> {
    let config_path = get_config_path()?;
    load_config_from(&config_path)
}

pub fn load_config_from(config_path: &Path) -> AppResult<RelayConfig> {
    if config_path.exists() {
        let config_str = fs::read_to_string(config_path)?;
        let config: RelayConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!(
                "Failed to parse config file {}: {}. Using defaults.",
                config_path.display(),
                e
            );
            RelayConfig::default()
        });

        validate_config(&config)?;

        Ok(config)
    } else {
        let default_config = RelayConfig::default();
        save_config_to(&default_config, config_path)?;
        Ok(default_config)
    }
}

pub fn save_config_to(config: &RelayConfig, config_path: &Path) -> AppResult<()> {
    validate_config(config)?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &RelayConfig) -> AppResult<()> {
    InputValidator::validate_endpoint_url(&config.endpoint_url)?;

    if config.attachment_field.trim().is_empty() {
        return Err(AppError::validation("attachment_field", "Must not be empty"));
    }

    if config.metadata_field.trim().is_empty() {
        return Err(AppError::validation("metadata_field", "Must not be empty"));
    }

    if config.attachment_field == config.metadata_field {
        return Err(AppError::validation(
            "metadata_field",
            "Must differ from attachment_field",
        ));
    }

    if config.upload_type.trim().is_empty() {
        return Err(AppError::validation("upload_type", "Must not be empty"));
    }

    if config.progress_tick_ms < 10 {
        return Err(AppError::validation("progress_tick_ms", "Must be at least 10ms"));
    }

    if config.progress_step == 0 || config.progress_step > 100 {
        return Err(AppError::validation("progress_step", "Must be between 1 and 100"));
    }

    // 100 is reserved for confirmed completion
    if config.progress_cap == 0 || config.progress_cap > 99 {
        return Err(AppError::validation("progress_cap", "Must be between 1 and 99"));
    }

    if config.max_file_size_mb == 0 {
        return Err(AppError::validation("max_file_size_mb", "Must be greater than 0"));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0 when set",
        ));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
