use reqwest::{multipart, Client};

use crate::config::RelayConfig;
use crate::errors::{AppError, AppResult};
use crate::media::SourceFile;

use super::metadata::RelayMetadata;

/// Where and how a relay is delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    pub url: String,
    pub attachment_field: String,
    pub metadata_field: String,
}

impl RelayEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attachment_field: "attachment".to_string(),
            metadata_field: "metadata".to_string(),
        }
    }
}

impl From<&RelayConfig> for RelayEndpoint {
    fn from(config: &RelayConfig) -> Self {
        Self {
            url: config.endpoint_url.clone(),
            attachment_field: config.attachment_field.clone(),
            metadata_field: config.metadata_field.clone(),
        }
    }
}

/// Sends one attachment plus its metadata record per request. Never retries;
/// a failed relay is reported and the caller decides what to do next.
pub struct WebhookClient {
    client: Client,
    endpoint: RelayEndpoint,
}

impl WebhookClient {
    pub fn new(endpoint: RelayEndpoint) -> AppResult<Self> {
        Self::build(endpoint, Client::builder())
    }

    pub fn from_config(config: &RelayConfig) -> AppResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Self::build(RelayEndpoint::from(config), builder)
    }

    fn build(endpoint: RelayEndpoint, builder: reqwest::ClientBuilder) -> AppResult<Self> {
        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// Consumes the attachment so its bytes move into the request body
    pub async fn send(&self, attachment: SourceFile, metadata: &RelayMetadata) -> AppResult<()> {
        let file_name = attachment.file_name.clone();
        log::info!("Relaying {} to webhook", file_name);

        let payload = RelayPayload::new(attachment, metadata)?;
        log::debug!("Relay metadata: {}", payload.metadata_json);

        let form = payload.build_form(&self.endpoint)?;

        let response = match self.client.post(&self.endpoint.url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                log::error!("Webhook request failed: {}", e);
                return Err(AppError::Network(e));
            }
        };

        let status = response.status();
        log::info!(
            "Webhook response status: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );

        if status.is_success() {
            log::info!("✅ {} relayed successfully", file_name);
            return Ok(());
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        log::error!(
            "Webhook error response (first 300 chars): {}",
            error_text.chars().take(300).collect::<String>()
        );

        Err(AppError::remote_rejected(status, error_text))
    }
}

/// The two parts of a relay request
#[derive(Debug, Clone)]
pub struct RelayPayload {
    file_name: String,
    content_type: String,
    data: Vec<u8>,
    metadata_json: String,
}

impl RelayPayload {
    pub fn new(attachment: SourceFile, metadata: &RelayMetadata) -> AppResult<Self> {
        let metadata_json = metadata.to_json()?;
        Ok(Self {
            file_name: attachment.file_name,
            content_type: attachment.content_type,
            data: attachment.data,
            metadata_json,
        })
    }

    pub fn metadata_json(&self) -> &str {
        &self.metadata_json
    }

    pub fn build_form(self, endpoint: &RelayEndpoint) -> AppResult<multipart::Form> {
        // A malformed MIME type is a local input problem, never a transport one
        let part = multipart::Part::bytes(self.data)
            .file_name(self.file_name)
            .mime_str(&self.content_type)
            .map_err(|_| {
                AppError::validation(
                    "content_type",
                    &format!("Invalid MIME type: {}", self.content_type),
                )
            })?;

        let form = multipart::Form::new()
            .part(endpoint.attachment_field.clone(), part)
            .text(endpoint.metadata_field.clone(), self.metadata_json);

        Ok(form)
    }
}
