use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;

use crate::errors::AppResult;
use crate::media::SourceFile;
use crate::security::InputValidator;

use super::metadata::{file_upload_metadata, Contributor, RelayMetadata, VoiceRecording};
use super::progress_tracker::{EntryId, UploadTracker};
use super::webhook_client::WebhookClient;

/// Outcome counts for one submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub rejected: usize,
}

impl UploadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.rejected == 0
    }
}

/// A registered file waiting to be relayed
struct RelayJob {
    entry_id: EntryId,
    file: SourceFile,
    metadata: RelayMetadata,
}

/// Relay every selected file. Files are registered in selection order, then
/// all of them are sent at once; one failure never holds up the others.
pub async fn process_upload_queue(
    client: &WebhookClient,
    tracker: &UploadTracker,
    contributor: &Contributor,
    upload_type: &str,
    file_paths: &[String],
    max_file_size_mb: u64,
) -> UploadSummary {
    let mut summary = UploadSummary::default();

    if file_paths.is_empty() {
        log::info!("No files selected, nothing to relay");
        return summary;
    }

    if !check_contributor(tracker, contributor) {
        return summary;
    }

    let mut jobs = Vec::with_capacity(file_paths.len());
    for file_path in file_paths {
        let file = match load_upload_file(file_path, max_file_size_mb).await {
            Ok(file) => file,
            Err(e) => {
                log::error!("File validation failed for {}: {}", file_path, e);
                tracker.report_error(format!("Could not upload {}: {}", file_path, e));
                summary.rejected += 1;
                continue;
            }
        };

        let metadata = file_upload_metadata(upload_type, &file, contributor, Utc::now());
        if let Some(job) = register_job(tracker, contributor, file, metadata) {
            jobs.push(job);
        } else {
            summary.rejected += 1;
        }
    }

    dispatch_jobs(client, tracker, jobs, &mut summary).await;

    log::info!(
        "Submission finished: {} sent, {} complete, {} failed, {} rejected",
        summary.submitted,
        summary.completed,
        summary.failed,
        summary.rejected
    );
    summary
}

/// Relay a single voice recording with its recording context
pub async fn relay_voice_recording(
    client: &WebhookClient,
    tracker: &UploadTracker,
    contributor: &Contributor,
    recording: &VoiceRecording,
    file_path: &str,
    max_file_size_mb: u64,
) -> UploadSummary {
    let mut summary = UploadSummary::default();

    if !check_contributor(tracker, contributor) {
        return summary;
    }

    let file = match load_upload_file(file_path, max_file_size_mb).await {
        Ok(file) => file,
        Err(e) => {
            log::error!("Recording validation failed for {}: {}", file_path, e);
            tracker.report_error(format!("Could not upload {}: {}", file_path, e));
            summary.rejected += 1;
            return summary;
        }
    };

    log::info!(
        "Relaying {} recording ({}s) from {}",
        recording.kind.tag(),
        recording.duration_secs,
        file.file_name
    );

    let metadata = recording.metadata(&file, contributor, Utc::now());
    match register_job(tracker, contributor, file, metadata) {
        Some(job) => dispatch_jobs(client, tracker, vec![job], &mut summary).await,
        None => summary.rejected += 1,
    }

    summary
}

/// Gate the whole submission on the contributor details
fn check_contributor(tracker: &UploadTracker, contributor: &Contributor) -> bool {
    let validation = InputValidator::validate_contributor_name(&contributor.name)
        .and_then(|_| InputValidator::validate_relationship(contributor.relationship.as_deref()));

    match validation {
        Ok(()) => true,
        Err(e) => {
            tracker.warn_validation(&e);
            false
        }
    }
}

async fn load_upload_file(file_path: &str, max_file_size_mb: u64) -> AppResult<SourceFile> {
    InputValidator::validate_upload_file(file_path, max_file_size_mb)?;
    SourceFile::from_path(file_path).await
}

fn register_job(
    tracker: &UploadTracker,
    contributor: &Contributor,
    file: SourceFile,
    metadata: RelayMetadata,
) -> Option<RelayJob> {
    match tracker.register(&contributor.name, &file) {
        Ok(entry_id) => Some(RelayJob {
            entry_id,
            file,
            metadata,
        }),
        Err(e) => {
            log::warn!("Could not register {}: {}", file.file_name, e);
            None
        }
    }
}

async fn dispatch_jobs(
    client: &WebhookClient,
    tracker: &UploadTracker,
    jobs: Vec<RelayJob>,
    summary: &mut UploadSummary,
) {
    summary.submitted += jobs.len();

    let sends = jobs.into_iter().map(|job| async move {
        let outcome = client.send(job.file, &job.metadata).await;
        tracker.resolve(&job.entry_id, &outcome);
        outcome.is_ok()
    });

    for delivered in join_all(sends).await {
        if delivered {
            summary.completed += 1;
        } else {
            summary.failed += 1;
        }
    }
}
