use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{file_extension, ValidationError};
use crate::tenant_scoped_entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingType {
    Video,
    Audio,
    Screenshot,
}

impl RecordingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingType::Video => "video",
            RecordingType::Audio => "audio",
            RecordingType::Screenshot => "screenshot",
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            RecordingType::Video => &["mp4", "webm", "ogg"],
            RecordingType::Audio => &["mp3", "wav", "ogg"],
            RecordingType::Screenshot => &["jpg", "png"],
        }
    }
}

impl fmt::Display for RecordingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "video" => Ok(RecordingType::Video),
            "audio" => Ok(RecordingType::Audio),
            "screenshot" => Ok(RecordingType::Screenshot),
            other => Err(ValidationError::new(format!("Invalid recording type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    pub session_id: i64,
    pub recording_type: RecordingType,
    pub file: String,
    pub recorded_at: DateTime<Utc>,
}

tenant_scoped_entity!(SessionRecord, "session_records");

impl SessionRecord {
    pub fn new(session_id: i64, recording_type: RecordingType, file: &str) -> Result<Self, ValidationError> {
        let file = file.trim();
        if file.is_empty() {
            return Err(ValidationError::new("No file provided"));
        }
        let allowed = recording_type.allowed_extensions();
        match file_extension(file) {
            Some(ext) if allowed.contains(&ext.as_str()) => {}
            _ => {
                return Err(ValidationError::new(format!(
                    "Invalid file extension for {} recording type. Allowed extensions: {}",
                    recording_type,
                    allowed.join(", ")
                )))
            }
        }
        Ok(Self {
            id: None,
            company_id: None,
            session_id,
            recording_type,
            file: format!("recordings/{}", file),
            recorded_at: Utc::now(),
        })
    }

    /// Change type and/or file; the extension is checked against the resulting type
    pub fn replace(&mut self, recording_type: Option<RecordingType>, file: Option<&str>) -> Result<(), ValidationError> {
        let recording_type = recording_type.unwrap_or(self.recording_type);
        let file = match file {
            Some(file) => file,
            None => self.file.strip_prefix("recordings/").unwrap_or(self.file.as_str()),
        };
        let replaced = Self::new(self.session_id, recording_type, file)?;
        self.recording_type = replaced.recording_type;
        self.file = replaced.file;
        Ok(())
    }
}
