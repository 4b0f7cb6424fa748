// tenancy/mod.rs - Company isolation layer
//
// context: per-request tenant/actor storage
// scope:   narrowing of reads to the current company
// entity:  company stamping on save

pub mod context;
pub mod entity;
pub mod error;
pub mod scope;

pub use context::{Actor, ContextGuard, TenantContext};
pub use entity::stamp_tenant;
pub use error::TenancyError;
pub use scope::filter_by_tenant;
