// Uploader module - relays recordings and files to the webhook
//
// The webhook client sends one multipart request per file, the progress
// tracker owns the per-session entry list, and the upload queue ties them
// together for each submission.

pub mod metadata;
pub mod progress_tracker;
pub mod upload_queue;
pub mod webhook_client;

pub use upload_queue::{process_upload_queue, relay_voice_recording, UploadSummary};
