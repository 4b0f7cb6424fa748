use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{file_extension, ValidationError};
use crate::tenant_scoped_entity;

pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPhoto {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    pub session_id: i64,
    pub photo: String,
    pub captured_at: DateTime<Utc>,
}

tenant_scoped_entity!(SessionPhoto, "session_photos");

impl SessionPhoto {
    pub fn new(session_id: i64, photo: &str) -> Result<Self, ValidationError> {
        let photo = photo.trim();
        if photo.is_empty() {
            return Err(ValidationError::new("No photo provided"));
        }
        match file_extension(photo) {
            Some(ext) if PHOTO_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(ValidationError::new(format!(
                    "Unsupported photo extension. Allowed: {}",
                    PHOTO_EXTENSIONS.join(", ")
                )))
            }
        }
        Ok(Self {
            id: None,
            company_id: None,
            session_id,
            photo: format!("photos/{}", photo),
            captured_at: Utc::now(),
        })
    }

    /// Point the record at a different file, validated like a new upload
    pub fn replace(&mut self, photo: &str) -> Result<(), ValidationError> {
        self.photo = Self::new(self.session_id, photo)?.photo;
        Ok(())
    }
}
