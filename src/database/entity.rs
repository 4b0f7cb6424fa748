use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;

/// Column holding the owning company on every tenant-scoped table
pub const TENANT_COLUMN: &str = "company_id";

/// A persisted record. Rows travel between the store and the entity as JSON objects.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;

    /// `None` marks tenant-independent reference data, which is never narrowed
    const TENANT_COLUMN: Option<&'static str> = Some(TENANT_COLUMN);

    fn id(&self) -> Option<i64>;

    fn tenant_id(&self) -> Option<i64> {
        None
    }

    fn set_tenant_id(&mut self, _tenant_id: i64) {}

    fn is_tenant_scoped() -> bool {
        Self::TENANT_COLUMN.is_some()
    }

    fn to_row(&self) -> Result<Map<String, Value>, DatabaseError> {
        match serde_json::to_value(self)? {
            Value::Object(mut map) => {
                if map.get("id").is_some_and(Value::is_null) {
                    map.remove("id");
                }
                Ok(map)
            }
            other => Err(DatabaseError::QueryError(format!(
                "{} must serialize to an object, got {}",
                Self::TABLE,
                other
            ))),
        }
    }

    fn from_row(row: Value) -> Result<Self, DatabaseError> {
        Ok(serde_json::from_value(row)?)
    }
}

/// Implements [`Entity`] for a struct with `id: Option<i64>` and `company_id: Option<i64>` fields
#[macro_export]
macro_rules! tenant_scoped_entity {
    ($ty:ty, $table:literal) => {
        impl $crate::database::entity::Entity for $ty {
            const TABLE: &'static str = $table;

            fn id(&self) -> Option<i64> {
                self.id
            }

            fn tenant_id(&self) -> Option<i64> {
                self.company_id
            }

            fn set_tenant_id(&mut self, tenant_id: i64) {
                self.company_id = Some(tenant_id);
            }
        }
    };
}
