// handlers/viewset.rs - Class-style handlers and their company-enforcing wrapper
//
// A viewset owns the base query and object lookup for one entity. Route
// handlers never talk to a bare viewset: they extract the TenantEnforcer the
// request interceptor placed in the request extensions.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use crate::database::{Entity, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::tenancy::{context, filter_by_tenant, TenancyError};

/// Query-string parameters of the current request
pub type QueryParams = HashMap<String, String>;

#[async_trait]
pub trait ViewSet: Send + Sync + 'static {
    type Model: Entity;

    fn repository(&self) -> &Repository<Self::Model>;

    /// Base query for list actions
    async fn get_queryset(&self, _params: &QueryParams) -> Result<FilterData, ApiError> {
        Ok(FilterData::default())
    }

    /// Look up one object through the base query
    async fn get_object(&self, params: &QueryParams, id: i64) -> Result<Self::Model, ApiError> {
        let query = self.get_queryset(params).await?.and_where(json!({ "id": id }));
        Ok(self.repository().get(query).await?)
    }

    async fn list(&self, params: &QueryParams) -> Result<Vec<Self::Model>, ApiError> {
        let query = self.get_queryset(params).await?;
        Ok(self.repository().filter(query).await?)
    }

    /// Delete one object, looked up the same way as [`ViewSet::get_object`]
    async fn destroy(&self, params: &QueryParams, id: i64) -> Result<(), ApiError> {
        let object = self.get_object(params, id).await?;
        Ok(self.repository().delete(&object).await?)
    }

    /// Number of enforcement wrappers around this viewset
    fn enforcement_layers(&self) -> usize {
        0
    }
}

/// Wraps a viewset so every queryset is narrowed to the caller's company and
/// every fetched object is checked against it.
pub struct TenantEnforcer<V> {
    inner: V,
}

impl<V: ViewSet> TenantEnforcer<V> {
    pub fn new(inner: V) -> Self {
        Self { inner }
    }

    /// The wrapped viewset, for actions beyond list/retrieve
    pub fn inner(&self) -> &V {
        &self.inner
    }
}

#[async_trait]
impl<V: ViewSet> ViewSet for TenantEnforcer<V> {
    type Model = V::Model;

    fn repository(&self) -> &Repository<V::Model> {
        self.inner.repository()
    }

    async fn get_queryset(&self, params: &QueryParams) -> Result<FilterData, ApiError> {
        let query = self.inner.get_queryset(params).await?;
        Ok(filter_by_tenant::<V::Model>(query))
    }

    async fn get_object(&self, params: &QueryParams, id: i64) -> Result<V::Model, ApiError> {
        let object = self.inner.get_object(params, id).await?;
        if !V::Model::is_tenant_scoped() {
            return Ok(object);
        }

        match context::current_actor() {
            Some(actor) if actor.is_super_actor => Ok(object),
            Some(actor) if actor.tenant_id.is_some() && actor.tenant_id == object.tenant_id() => Ok(object),
            actor => {
                warn!(
                    "{} id={} outside company scope of {}",
                    V::Model::TABLE,
                    id,
                    actor.map(|a| a.username).unwrap_or_else(|| "anonymous".to_string())
                );
                Err(TenancyError::NotFoundInScope.into())
            }
        }
    }

    fn enforcement_layers(&self) -> usize {
        self.inner.enforcement_layers() + 1
    }
}
