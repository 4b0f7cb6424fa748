pub mod entity;
pub mod manager;
pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod repository;
pub mod store;

pub use entity::Entity;
pub use manager::{DatabaseError, DatabaseManager};
pub use memory_store::MemoryStore;
pub use pg_store::PgStore;
pub use repository::Repository;
pub use store::Store;
