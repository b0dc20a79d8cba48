use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, RelayConfig};
use crate::errors::{AppError, AppResult};
use crate::presentation;
use crate::uploader::metadata::{Contributor, RecordingKind, VoiceRecording};
use crate::uploader::progress_tracker::UploadTracker;
use crate::uploader::webhook_client::WebhookClient;
use crate::uploader::{self, UploadSummary};

pub const USAGE: &str = "\
Usage:
  memory-relay [--config PATH] [--endpoint URL] [--json] upload --name NAME [--relationship REL]
               FILE...
  memory-relay [--config PATH] [--endpoint URL] [--json] voice --name NAME [--relationship REL]
               --recording-type TYPE [--duration SECS] [--agenda TEXT] [--skill-target TEXT]
               [--project-type TYPE] [--project-name TEXT] FILE
  memory-relay [--config PATH] config";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub name: String,
    pub relationship: Option<String>,
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceRequest {
    pub name: String,
    pub relationship: Option<String>,
    pub recording_type: String,
    #[serde(default)]
    pub duration_secs: u64,
    pub agenda: Option<String>,
    pub skill_target: Option<String>,
    pub project_type: Option<String>,
    pub project_name: Option<String>,
    pub file_path: String,
}

impl VoiceRequest {
    pub fn recording(&self) -> VoiceRecording {
        VoiceRecording {
            kind: RecordingKind::parse(&self.recording_type),
            duration_secs: self.duration_secs,
            agenda: self.agenda.clone(),
            skill_target: self.skill_target.clone(),
            project_type: self.project_type.clone(),
            project_name: self.project_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Upload(UploadRequest),
    Voice(VoiceRequest),
    ShowConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub json: bool,
    pub command: Command,
}

impl Invocation {
    /// Load the configuration this invocation asks for, with overrides applied
    pub fn load_config(&self) -> AppResult<RelayConfig> {
        let mut config = match &self.config_path {
            Some(path) => config::load_config_from(path)?,
            None => config::load_config()?,
        }
        .with_env_overrides();

        if let Some(endpoint) = &self.endpoint {
            config.endpoint_url = endpoint.clone();
        }

        config::validate_config(&config)?;
        Ok(config)
    }
}

fn take_value(args: &mut impl Iterator<Item = String>, flag: &str) -> AppResult<String> {
    args.next()
        .ok_or_else(|| AppError::validation(flag, "Missing value"))
}

/// Parse the command line (without the program name)
pub fn parse_args(args: impl IntoIterator<Item = String>) -> AppResult<Invocation> {
    let mut args = args.into_iter();

    let mut config_path = None;
    let mut endpoint = None;
    let mut json = false;
    let mut subcommand = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(take_value(&mut args, "--config")?)),
            "--endpoint" => endpoint = Some(take_value(&mut args, "--endpoint")?),
            "--json" => json = true,
            "upload" | "voice" | "config" => {
                subcommand = Some(arg);
                break;
            }
            other => {
                let message = format!("Unknown argument: {}", other);
                return Err(AppError::validation("arguments", &message));
            }
        }
    }

    let command = match subcommand.as_deref() {
        Some("upload") => Command::Upload(parse_upload(args)?),
        Some("voice") => Command::Voice(parse_voice(args)?),
        Some("config") => Command::ShowConfig,
        _ => return Err(AppError::validation("arguments", "Missing command")),
    };

    Ok(Invocation {
        config_path,
        endpoint,
        json,
        command,
    })
}

fn parse_upload(mut args: impl Iterator<Item = String>) -> AppResult<UploadRequest> {
    let mut name = String::new();
    let mut relationship = None;
    let mut file_paths = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => name = take_value(&mut args, "--name")?,
            "--relationship" => relationship = Some(take_value(&mut args, "--relationship")?),
            flag if flag.starts_with("--") => {
                return Err(AppError::validation("arguments", &format!("Unknown option: {}", flag)))
            }
            _ => file_paths.push(arg),
        }
    }

    Ok(UploadRequest {
        name,
        relationship,
        file_paths,
    })
}

fn parse_voice(mut args: impl Iterator<Item = String>) -> AppResult<VoiceRequest> {
    let mut name = String::new();
    let mut relationship = None;
    let mut recording_type = None;
    let mut duration_secs = 0;
    let mut agenda = None;
    let mut skill_target = None;
    let mut project_type = None;
    let mut project_name = None;
    let mut file_path = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" => name = take_value(&mut args, "--name")?,
            "--relationship" => relationship = Some(take_value(&mut args, "--relationship")?),
            "--recording-type" => recording_type = Some(take_value(&mut args, "--recording-type")?),
            "--duration" => {
                let value = take_value(&mut args, "--duration")?;
                duration_secs = value.parse().map_err(|_| {
                    AppError::validation("--duration", "Must be a whole number of seconds")
                })?;
            }
            "--agenda" => agenda = Some(take_value(&mut args, "--agenda")?),
            "--skill-target" => skill_target = Some(take_value(&mut args, "--skill-target")?),
            "--project-type" => project_type = Some(take_value(&mut args, "--project-type")?),
            "--project-name" => project_name = Some(take_value(&mut args, "--project-name")?),
            flag if flag.starts_with("--") => {
                return Err(AppError::validation("arguments", &format!("Unknown option: {}", flag)))
            }
            _ if file_path.is_none() => file_path = Some(arg),
            _ => {
                let message = "Only one recording can be sent at a time";
                return Err(AppError::validation("arguments", message));
            }
        }
    }

    Ok(VoiceRequest {
        name,
        relationship,
        recording_type: recording_type
            .ok_or_else(|| AppError::validation("--recording-type", "Missing value"))?,
        duration_secs,
        agenda,
        skill_target,
        project_type,
        project_name,
        file_path: file_path.ok_or_else(|| AppError::validation("file_path", "Missing recording"))?,
    })
}

/// Relay the selected files and render the outcome
pub async fn upload_files(
    config: &RelayConfig,
    request: UploadRequest,
    json: bool,
) -> AppResult<UploadSummary> {
    if let Some(hint) = presentation::input_gate(&request.name) {
        println!("{}", hint);
    }

    let client = WebhookClient::from_config(config)?;
    let contributor = Contributor::new(request.name, request.relationship);

    run_session(config, json, |tracker| async move {
        uploader::process_upload_queue(
            &client,
            &tracker,
            &contributor,
            &config.upload_type,
            &request.file_paths,
            config.max_file_size_mb,
        )
        .await
    })
    .await
}

/// Relay a voice recording with its recording context
pub async fn send_voice_recording(
    config: &RelayConfig,
    request: VoiceRequest,
    json: bool,
) -> AppResult<UploadSummary> {
    let client = WebhookClient::from_config(config)?;
    let recording = request.recording();
    let contributor = Contributor::new(request.name, request.relationship);
    let file_path = request.file_path;

    run_session(config, json, |tracker| async move {
        uploader::relay_voice_recording(
            &client,
            &tracker,
            &contributor,
            &recording,
            &file_path,
            config.max_file_size_mb,
        )
        .await
    })
    .await
}

/// Own the tracker for one submission, print notifications as they arrive
/// and render the final entry list.
async fn run_session<F, Fut>(
    config: &RelayConfig,
    json: bool,
    submit: F,
) -> AppResult<UploadSummary>
where
    F: FnOnce(Arc<UploadTracker>) -> Fut,
    Fut: Future<Output = UploadSummary>,
{
    let (tracker, mut notifications) = UploadTracker::from_config(config);
    let tracker = Arc::new(tracker);

    let printer = tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            eprintln!("{}", presentation::render_notification(&notification));
        }
    });

    let summary = submit(Arc::clone(&tracker)).await;

    let entries = tracker.snapshot();
    drop(tracker);
    if let Err(e) = printer.await {
        log::warn!("Notification printer stopped unexpectedly: {}", e);
    }

    if json {
        println!("{}", presentation::render_entries_json(&entries)?);
    } else {
        let rendered = presentation::render_entries(&entries);
        if !rendered.is_empty() {
            println!("{}", rendered);
        }
    }

    Ok(summary)
}

pub fn show_config(config: &RelayConfig) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
