pub mod auth;
pub mod response;
pub mod tenant;

pub use auth::auth_middleware;
pub use response::{ApiJson, ApiResponse, ApiResult};
pub use tenant::{tenant_middleware, TenantState};
