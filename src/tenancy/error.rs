use thiserror::Error;

pub const TENANT_REQUIRED_ERROR: &str = "tenant id is required";
pub const OBJECT_NOT_FOUND_ERROR: &str = "object not found in company scope";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenancyError {
    /// A tenant-scoped record was saved with no company on the record or in the context
    #[error("{}", TENANT_REQUIRED_ERROR)]
    TenantRequired,

    /// The object exists but belongs to another company
    #[error("{}", OBJECT_NOT_FOUND_ERROR)]
    NotFoundInScope,

    #[error("request context is not active")]
    ContextUnavailable,
}
