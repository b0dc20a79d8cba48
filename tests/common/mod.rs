//! In-process webhook that records every relay request it receives.

#![allow(dead_code)]

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ReceivedPart {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReceivedRequest {
    pub parts: Vec<ReceivedPart>,
}

impl ReceivedRequest {
    pub fn part(&self, name: &str) -> Option<&ReceivedPart> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn metadata(&self) -> serde_json::Value {
        let part = self.part("metadata").expect("metadata part present");
        serde_json::from_str(&part.text()).expect("metadata is JSON")
    }
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

pub struct MockWebhook {
    pub url: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl MockWebhook {
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn receive(
    State(state): State<MockState>,
    mut multipart: Multipart,
) -> (StatusCode, &'static str) {
    let mut request = ReceivedRequest::default();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        request.parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }

    state.received.lock().unwrap().push(request);

    if state.status.is_success() {
        (state.status, "Workflow was started")
    } else {
        (state.status, "Error in workflow")
    }
}

/// Start a webhook on an ephemeral port answering every request with `status`
pub async fn spawn_mock_webhook(status: StatusCode) -> MockWebhook {
    let received = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        received: Arc::clone(&received),
    };

    let app = Router::new()
        .route("/webhook/memories", post(receive))
        .layer(DefaultBodyLimit::disable())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockWebhook {
        url: format!("http://{}/webhook/memories", addr),
        received,
    }
}

/// Write a throwaway recording and return its path
pub fn write_recording(extension: &str, size_bytes: usize) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "memory_relay_it_{}.{}",
        uuid::Uuid::new_v4(),
        extension
    ));
    std::fs::write(&path, vec![7u8; size_bytes]).unwrap();
    path
}
