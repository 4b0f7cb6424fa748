pub mod base_image;
pub mod company;
pub mod exam;
pub mod session;
pub mod session_photo;
pub mod session_record;
pub mod user;

pub use base_image::BaseImage;
pub use company::Company;
pub use exam::Exam;
pub use session::Session;
pub use session_photo::SessionPhoto;
pub use session_record::{RecordingType, SessionRecord};
pub use user::User;

use std::path::Path;

use thiserror::Error;

/// A record failed a field-level rule before reaching the store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Lowercased extension of `filename` without the dot
pub(crate) fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
