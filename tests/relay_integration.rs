mod common;

use axum::http::StatusCode;
use chrono::Utc;

use common::{spawn_mock_webhook, write_recording};
use memory_relay::config::RelayConfig;
use memory_relay::errors::AppError;
use memory_relay::media::{format_file_size, SourceFile};
use memory_relay::presentation;
use memory_relay::uploader::metadata::{
    file_upload_metadata, Contributor, RecordingKind, VoiceRecording,
};
use memory_relay::uploader::progress_tracker::{NotificationLevel, UploadStatus, UploadTracker};
use memory_relay::uploader::webhook_client::{RelayEndpoint, WebhookClient};
use memory_relay::uploader::{process_upload_queue, relay_voice_recording};

/// Integration tests for the relay flow, run against an in-process webhook

fn test_config(endpoint_url: &str) -> RelayConfig {
    RelayConfig {
        endpoint_url: endpoint_url.to_string(),
        progress_tick_ms: 10,
        fallback_email: "family@example.com".to_string(),
        ..RelayConfig::default()
    }
}

#[tokio::test]
async fn test_client_sends_attachment_and_metadata_parts() {
    let webhook = spawn_mock_webhook(StatusCode::OK).await;
    let client = WebhookClient::new(RelayEndpoint::new(webhook.url.clone())).unwrap();

    let file = SourceFile::new("nana.m4a", "audio/mp4", vec![1, 2, 3, 4]);
    let metadata = file_upload_metadata(
        "file_upload",
        &file,
        &Contributor::new("Sarah", Some("Granddaughter".to_string())),
        Utc::now(),
    );

    client.send(file, &metadata).await.unwrap();

    let requests = webhook.requests();
    assert_eq!(requests.len(), 1);

    let attachment = requests[0].part("attachment").unwrap();
    assert_eq!(attachment.file_name.as_deref(), Some("nana.m4a"));
    assert_eq!(attachment.content_type.as_deref(), Some("audio/mp4"));
    assert_eq!(attachment.data, vec![1, 2, 3, 4]);

    let sent = requests[0].metadata();
    assert_eq!(sent["type"], "file_upload");
    assert_eq!(sent["name"], "Sarah");
    assert_eq!(sent["relationship"], "Granddaughter");
    assert_eq!(sent["file_size"], 4);
    assert!(sent["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_client_uses_configured_field_names() {
    let webhook = spawn_mock_webhook(StatusCode::OK).await;
    let config = RelayConfig {
        attachment_field: "file".to_string(),
        metadata_field: "context".to_string(),
        ..test_config(&webhook.url)
    };
    let client = WebhookClient::from_config(&config).unwrap();

    let file = SourceFile::new("nana.m4a", "audio/mp4", vec![9]);
    let metadata = file_upload_metadata("file_upload", &file, &Contributor::default(), Utc::now());
    client.send(file, &metadata).await.unwrap();

    let request = &webhook.requests()[0];
    assert!(request.part("file").is_some());
    assert!(request.part("context").is_some());
    assert!(request.part("attachment").is_none());
}

#[tokio::test]
async fn test_client_reports_remote_rejection() {
    let webhook = spawn_mock_webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
    let client = WebhookClient::new(RelayEndpoint::new(webhook.url.clone())).unwrap();

    let file = SourceFile::new("nana.m4a", "audio/mp4", vec![1]);
    let metadata = file_upload_metadata("file_upload", &file, &Contributor::default(), Utc::now());

    match client.send(file, &metadata).await {
        Err(AppError::RemoteRejected { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "Error in workflow");
        }
        other => panic!("expected remote rejection, got {:?}", other),
    }

    // Exactly one attempt, no retries
    assert_eq!(webhook.requests().len(), 1);
}

#[tokio::test]
async fn test_sarah_uploads_a_two_megabyte_recording() {
    let webhook = spawn_mock_webhook(StatusCode::OK).await;
    let config = test_config(&webhook.url);
    let client = WebhookClient::from_config(&config).unwrap();
    let (tracker, mut notifications) = UploadTracker::from_config(&config);

    let path = write_recording("m4a", 2 * 1024 * 1024);
    let path_str = path.to_string_lossy().to_string();

    let summary = process_upload_queue(
        &client,
        &tracker,
        &Contributor::new("Sarah", None),
        &config.upload_type,
        &[path_str],
        config.max_file_size_mb,
    )
    .await;
    let _ = std::fs::remove_file(&path);

    assert_eq!(summary.submitted, 1);
    assert_eq!(summary.completed, 1);
    assert!(summary.all_succeeded());

    let entries = tracker.snapshot();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, UploadStatus::Complete);
    assert_eq!(entries[0].progress_percent, 100);
    assert_eq!(format_file_size(entries[0].size_bytes), "2.0 MB");
    assert_eq!(tracker.completed_count(), 1);

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Success);
    assert!(notification.message.ends_with("uploaded successfully!"));

    let rendered = presentation::render_entries(&entries);
    assert!(rendered.contains("Uploaded Files (1 complete)"));
    assert!(rendered.contains("(2.0 MB)  Done!"));

    let sent = webhook.requests()[0].metadata();
    assert_eq!(sent["name"], "Sarah");
    assert_eq!(sent["relationship"], "");
    assert_eq!(sent["file_only"], true);
    assert_eq!(sent["file_size"], 2 * 1024 * 1024);
}

#[tokio::test]
async fn test_blank_name_creates_no_entry() {
    let webhook = spawn_mock_webhook(StatusCode::OK).await;
    let config = test_config(&webhook.url);
    let client = WebhookClient::from_config(&config).unwrap();
    let (tracker, mut notifications) = UploadTracker::from_config(&config);

    let path = write_recording("mp3", 1024);
    let path_str = path.to_string_lossy().to_string();

    let summary = process_upload_queue(
        &client,
        &tracker,
        &Contributor::new("   ", None),
        &config.upload_type,
        &[path_str],
        config.max_file_size_mb,
    )
    .await;
    let _ = std::fs::remove_file(&path);

    assert_eq!(summary.submitted, 0);
    assert!(tracker.snapshot().is_empty());
    assert_eq!(tracker.completed_count(), 0);
    assert!(webhook.requests().is_empty());

    let warning = notifications.try_recv().unwrap();
    assert_eq!(warning.level, NotificationLevel::Warning);
    assert_eq!(warning.message, "Please enter your name first");
}

#[tokio::test]
async fn test_server_error_marks_entry_failed() {
    let webhook = spawn_mock_webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
    let config = test_config(&webhook.url);
    let client = WebhookClient::from_config(&config).unwrap();
    let (tracker, mut notifications) = UploadTracker::from_config(&config);

    let path = write_recording("wav", 4096);
    let path_str = path.to_string_lossy().to_string();

    let summary = process_upload_queue(
        &client,
        &tracker,
        &Contributor::new("Sarah", Some("Friend".to_string())),
        &config.upload_type,
        &[path_str],
        config.max_file_size_mb,
    )
    .await;
    let _ = std::fs::remove_file(&path);

    assert_eq!(summary.failed, 1);
    assert!(!summary.all_succeeded());

    let entries = tracker.snapshot();
    assert_eq!(entries[0].status, UploadStatus::Failed);
    assert_eq!(entries[0].progress_percent, 0);

    let notification = notifications.try_recv().unwrap();
    assert_eq!(notification.level, NotificationLevel::Error);
    assert!(notification.message.contains("Try emailing to family@example.com"));

    assert!(presentation::render_entries(&entries).contains("Failed"));
}

#[tokio::test]
async fn test_each_file_is_relayed_independently() {
    let webhook = spawn_mock_webhook(StatusCode::OK).await;
    let config = test_config(&webhook.url);
    let client = WebhookClient::from_config(&config).unwrap();
    let (tracker, _notifications) = UploadTracker::from_config(&config);

    let first = write_recording("m4a", 100);
    let second = write_recording("ogg", 200);
    let paths = vec![
        first.to_string_lossy().to_string(),
        "missing_recording.m4a".to_string(),
        second.to_string_lossy().to_string(),
    ];

    let summary = process_upload_queue(
        &client,
        &tracker,
        &Contributor::new("Sarah", None),
        &config.upload_type,
        &paths,
        config.max_file_size_mb,
    )
    .await;
    let _ = std::fs::remove_file(&first);
    let _ = std::fs::remove_file(&second);

    assert_eq!(summary.submitted, 2);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.rejected, 1);

    // Entries keep selection order
    let entries = tracker.snapshot();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].size_bytes, 100);
    assert_eq!(entries[1].size_bytes, 200);
    assert!(entries.iter().all(|e| e.status == UploadStatus::Complete));
    assert_eq!(webhook.requests().len(), 2);
}

#[tokio::test]
async fn test_voice_recording_metadata_reaches_webhook() {
    let webhook = spawn_mock_webhook(StatusCode::OK).await;
    let config = test_config(&webhook.url);
    let client = WebhookClient::from_config(&config).unwrap();
    let (tracker, _notifications) = UploadTracker::from_config(&config);

    let path = write_recording("webm", 512);
    let mut recording = VoiceRecording::new(RecordingKind::ProjectResearch, 240);
    recording.project_type = Some("new_project".to_string());
    recording.project_name = Some("Memory book".to_string());
    recording.agenda = Some("ignored for research".to_string());

    let summary = relay_voice_recording(
        &client,
        &tracker,
        &Contributor::new("Sarah", None),
        &recording,
        &path.to_string_lossy(),
        config.max_file_size_mb,
    )
    .await;
    let _ = std::fs::remove_file(&path);

    assert_eq!(summary.completed, 1);

    let request = &webhook.requests()[0];
    assert_eq!(
        request.part("attachment").unwrap().content_type.as_deref(),
        Some("audio/webm")
    );

    let sent = request.metadata();
    assert_eq!(sent["type"], "voice_recording");
    assert_eq!(sent["recording_type"], "project_research");
    assert_eq!(sent["duration"], 240);
    assert_eq!(sent["project_type"], "new_project");
    assert_eq!(sent["project_name"], "Memory book");
    assert!(sent.get("agenda").is_none());
    assert!(sent.get("skill_target").is_none());
}
