use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::errors::AppResult;
use crate::media::SourceFile;

pub const VOICE_RECORDING_TYPE: &str = "voice_recording";
pub const UNKNOWN_CONTRIBUTOR: &str = "Unknown";

/// A single metadata value. Only scalars are representable, so the record
/// stays flat for the webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    Integer(u64),
    Flag(bool),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        MetadataValue::Integer(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Flag(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RelayMetadata {
    fields: BTreeMap<String, MetadataValue>,
}

impl RelayMetadata {
    pub fn new(kind: &str, timestamp: DateTime<Utc>) -> Self {
        let mut metadata = Self::default();
        metadata.insert("type", kind);
        metadata.insert(
            "timestamp",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        metadata
    }

    pub fn insert(&mut self, key: &str, value: impl Into<MetadataValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Insert only when the value has non-whitespace content
    pub fn insert_present(&mut self, key: &str, value: Option<&str>) -> bool {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => {
                self.insert(key, v);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn kind(&self) -> Option<&str> {
        match self.fields.get("type") {
            Some(MetadataValue::Text(kind)) => Some(kind),
            _ => None,
        }
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Describe the originating file
    fn insert_file_descriptors(&mut self, file: &SourceFile) {
        self.insert("file_name", file.file_name.as_str());
        self.insert("file_type", file.content_type.as_str());
        self.insert("file_size", file.size_bytes());
    }

    /// Blank names become "Unknown" and a missing relationship becomes "".
    /// The webhook expects both keys on every record.
    fn insert_contributor(&mut self, contributor: &Contributor) {
        let name = contributor.name.trim();
        self.insert(
            "name",
            if name.is_empty() { UNKNOWN_CONTRIBUTOR } else { name },
        );
        self.insert(
            "relationship",
            contributor
                .relationship
                .as_deref()
                .map(str::trim)
                .unwrap_or_default(),
        );
    }
}

/// Who a memory came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contributor {
    pub name: String,
    pub relationship: Option<String>,
}

impl Contributor {
    pub fn new(name: impl Into<String>, relationship: Option<String>) -> Self {
        Self {
            name: name.into(),
            relationship,
        }
    }
}

/// Metadata for a plain file upload
pub fn file_upload_metadata(
    upload_type: &str,
    file: &SourceFile,
    contributor: &Contributor,
    timestamp: DateTime<Utc>,
) -> RelayMetadata {
    let mut metadata = RelayMetadata::new(upload_type, timestamp);
    metadata.insert("file_only", true);
    metadata.insert_file_descriptors(file);
    metadata.insert_contributor(contributor);
    metadata
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingKind {
    Meeting,
    SkillUpdate,
    ProjectResearch,
    Other(String),
}

impl RecordingKind {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "meeting" => RecordingKind::Meeting,
            "skill_update" => RecordingKind::SkillUpdate,
            "project_research" => RecordingKind::ProjectResearch,
            other => RecordingKind::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            RecordingKind::Meeting => "meeting",
            RecordingKind::SkillUpdate => "skill_update",
            RecordingKind::ProjectResearch => "project_research",
            RecordingKind::Other(tag) => tag,
        }
    }
}

pub const NEW_PROJECT: &str = "new_project";

/// Context captured alongside a voice recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRecording {
    pub kind: RecordingKind,
    pub duration_secs: u64,
    pub agenda: Option<String>,
    pub skill_target: Option<String>,
    pub project_type: Option<String>,
    pub project_name: Option<String>,
}

impl VoiceRecording {
    pub fn new(kind: RecordingKind, duration_secs: u64) -> Self {
        Self {
            kind,
            duration_secs,
            agenda: None,
            skill_target: None,
            project_type: None,
            project_name: None,
        }
    }

    pub fn metadata(
        &self,
        file: &SourceFile,
        contributor: &Contributor,
        timestamp: DateTime<Utc>,
    ) -> RelayMetadata {
        let mut metadata = RelayMetadata::new(VOICE_RECORDING_TYPE, timestamp);
        metadata.insert("recording_type", self.kind.tag());
        metadata.insert("duration", self.duration_secs);
        metadata.insert_file_descriptors(file);
        metadata.insert_contributor(contributor);

        // Each kind carries only its own context fields
        match self.kind {
            RecordingKind::Meeting => {
                metadata.insert_present("agenda", self.agenda.as_deref());
            }
            RecordingKind::SkillUpdate => {
                metadata.insert_present("skill_target", self.skill_target.as_deref());
            }
            RecordingKind::ProjectResearch => {
                let project_type = self.project_type.as_deref().map(str::trim);
                metadata.insert_present("project_type", project_type);
                if project_type == Some(NEW_PROJECT) {
                    metadata.insert_present("project_name", self.project_name.as_deref());
                }
            }
            RecordingKind::Other(_) => {}
        }

        metadata
    }
}
