// handlers/mod.rs - HTTP handlers
//
// Viewset modules serve company-scoped entities through a TenantEnforcer the
// request interceptor provides. Function modules read the request context
// directly.

pub mod registry;
pub mod viewset;

pub mod artifacts;
pub mod exams;
pub mod reports;
pub mod root;
pub mod sessions;
pub mod token;
pub mod users;

pub use registry::HandlerRegistry;
pub use viewset::{QueryParams, TenantEnforcer, ViewSet};
