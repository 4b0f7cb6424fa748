// services/mod.rs - Proctoring business operations over the repositories
//
// Services never narrow queries themselves; every read and write they make
// goes through a Repository and therefore through the request's company scope.

pub mod companies;
pub mod proctoring;
pub mod users;

pub use companies::CompanyService;
pub use proctoring::ProctoringService;
pub use users::UserService;

use crate::database::manager::DatabaseError;
use crate::database::models::ValidationError;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The operation does not apply to the record in its current state
    #[error("{0}")]
    InvalidState(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid username or password")]
    InvalidCredentials,
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => e.into(),
            ServiceError::Validation(e) => e.into(),
            ServiceError::InvalidState(msg) => ApiError::bad_request(msg),
            ServiceError::AlreadyExists(msg) => ApiError::conflict(format!("Already exists: {}", msg)),
            ServiceError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                ApiError::not_found()
            }
            ServiceError::InvalidCredentials => ApiError::unauthorized("Invalid username or password"),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
