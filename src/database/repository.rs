use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::database::entity::Entity;
use crate::database::manager::DatabaseError;
use crate::database::store::Store;
use crate::filter::FilterData;
use crate::tenancy::{filter_by_tenant, stamp_tenant};

/// Typed, company-narrowed access to one entity's table.
///
/// Every read, update and delete goes through `filter_by_tenant`, and every
/// save goes through `stamp_tenant`, so callers cannot skip isolation.
pub struct Repository<E> {
    store: Arc<dyn Store>,
    _phantom: PhantomData<E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn filter(&self, query: FilterData) -> Result<Vec<E>, DatabaseError> {
        let query = filter_by_tenant::<E>(query);
        let rows = self.store.select(E::TABLE, &query).await?;
        rows.into_iter().map(E::from_row).collect()
    }

    pub async fn all(&self) -> Result<Vec<E>, DatabaseError> {
        self.filter(FilterData::default()).await
    }

    /// Exactly one row; rows of other companies are indistinguishable from missing ones
    pub async fn get(&self, query: FilterData) -> Result<E, DatabaseError> {
        let mut query = filter_by_tenant::<E>(query);
        query.limit = Some(2);
        query.offset = None;

        let mut rows = self.store.select(E::TABLE, &query).await?;
        match rows.len() {
            0 => Err(DatabaseError::NotFound(format!("{} record not found", E::TABLE))),
            1 => E::from_row(rows.remove(0)),
            _ => Err(DatabaseError::QueryError(format!("{} lookup matched more than one row", E::TABLE))),
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<E, DatabaseError> {
        self.get(FilterData::by_id(id)).await
    }

    /// Like [`get`](Self::get) but a miss is `Ok(None)`
    pub async fn find(&self, query: FilterData) -> Result<Option<E>, DatabaseError> {
        match self.get(query).await {
            Ok(entity) => Ok(Some(entity)),
            Err(DatabaseError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn count(&self, query: FilterData) -> Result<i64, DatabaseError> {
        let query = filter_by_tenant::<E>(query);
        self.store.count(E::TABLE, &query).await
    }

    pub async fn exists(&self, query: FilterData) -> Result<bool, DatabaseError> {
        Ok(self.count(query).await? > 0)
    }

    /// Insert or update `entity`, writing the stored row (id, defaults) back into it
    pub async fn save(&self, entity: &mut E) -> Result<(), DatabaseError> {
        stamp_tenant(entity)?;
        let mut row = entity.to_row()?;

        let stored = match entity.id() {
            None => self.store.insert(E::TABLE, row).await?,
            Some(id) => {
                row.remove("id");
                if let Some(column) = E::TENANT_COLUMN {
                    // The owning company never changes after the first save
                    row.remove(column);
                }
                let query = filter_by_tenant::<E>(FilterData::by_id(id));
                let mut updated = self.store.update(E::TABLE, &query, row).await?;
                if updated.is_empty() {
                    return Err(DatabaseError::NotFound(format!("{} record not found", E::TABLE)));
                }
                updated.swap_remove(0)
            }
        };

        let id = stored.get("id").and_then(Value::as_i64);
        debug!("Saved {} id={:?}", E::TABLE, id);
        *entity = E::from_row(stored)?;
        Ok(())
    }

    pub async fn delete(&self, entity: &E) -> Result<(), DatabaseError> {
        let id = entity
            .id()
            .ok_or_else(|| DatabaseError::QueryError(format!("cannot delete unsaved {} record", E::TABLE)))?;
        match self.delete_where(FilterData::by_id(id)).await? {
            0 => Err(DatabaseError::NotFound(format!("{} record not found", E::TABLE))),
            _ => Ok(()),
        }
    }

    pub async fn delete_where(&self, query: FilterData) -> Result<u64, DatabaseError> {
        let query = filter_by_tenant::<E>(query);
        self.store.delete(E::TABLE, &query).await
    }
}
