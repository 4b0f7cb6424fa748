use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{file_extension, ValidationError};
use crate::tenant_scoped_entity;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const NO_IMAGE_ERROR: &str = "No image file provided";
pub const IMAGE_TOO_LARGE_ERROR: &str = "Image file too large ( > 5MB )";

/// Reference photo of a user, kept for identity checks during sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseImage {
    pub id: Option<i64>,
    pub company_id: Option<i64>,
    pub user_id: i64,
    pub image: String,
    pub uploaded_at: DateTime<Utc>,
}

tenant_scoped_entity!(BaseImage, "base_images");

impl BaseImage {
    /// Validate an upload and build the record stored for it.
    ///
    /// The stored path is `users/base_image/{user_id}/{user_id}_{timestamp}_{suffix}.{ext}`,
    /// where `suffix` keeps images uploaded within the same second apart.
    pub fn upload(user_id: i64, company_id: Option<i64>, filename: &str, size: u64) -> Result<Self, ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::new(NO_IMAGE_ERROR));
        }
        if size > MAX_IMAGE_BYTES {
            return Err(ValidationError::new(IMAGE_TOO_LARGE_ERROR));
        }
        let ext = match file_extension(filename) {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => ext,
            _ => {
                let allowed: Vec<String> = IMAGE_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();
                return Err(ValidationError::new(format!(
                    "Unsupported file extension. Allowed: {}",
                    allowed.join(", ")
                )));
            }
        };

        let uploaded_at = Utc::now();
        let suffix = Uuid::new_v4().simple().to_string();
        let image = format!(
            "users/base_image/{uid}/{uid}_{ts}_{suffix}.{ext}",
            uid = user_id,
            ts = uploaded_at.format("%Y%m%d_%H%M%S"),
            suffix = &suffix[..8],
            ext = ext
        );
        Ok(Self {
            id: None,
            company_id,
            user_id,
            image,
            uploaded_at,
        })
    }
}
