// tenancy/scope.rs - Query narrowing to the current company

use serde_json::json;

use crate::config;
use crate::database::entity::Entity;
use crate::filter::FilterData;

use super::context;

/// Narrow `query` to the current company.
///
/// Super-actors see every company. Tenant-independent entities are never
/// narrowed. The company predicate is AND-ed around the caller's predicate, so
/// nothing the caller wrote can widen it.
pub fn filter_by_tenant<E: Entity>(query: FilterData) -> FilterData {
    filter_by_tenant_with::<E>(query, config::config().tenancy.fail_closed)
}

pub(crate) fn filter_by_tenant_with<E: Entity>(query: FilterData, fail_closed: bool) -> FilterData {
    let ctx = context::current();

    if ctx.actor.as_ref().is_some_and(|actor| actor.is_super_actor) {
        return query;
    }

    let Some(column) = E::TENANT_COLUMN else {
        return query;
    };

    match ctx.tenant_id {
        Some(tenant_id) => {
            tracing::debug!("Narrowing {} to {} = {}", E::TABLE, column, tenant_id);
            query.and_where(json!({ column: tenant_id }))
        }
        None if fail_closed => {
            tracing::debug!("No company in context; {} narrowed to nothing", E::TABLE);
            query.and_where(json!({ column: { "$in": [] } }))
        }
        None => query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Company, Exam};
    use crate::tenancy::context::{sync_scope, Actor, ContextGuard};

    fn caller_query() -> FilterData {
        FilterData {
            where_clause: Some(json!({ "exam_code": "MATH101" })),
            ..Default::default()
        }
    }

    #[test]
    fn member_query_is_narrowed_after_caller_predicate() {
        sync_scope(|| {
            let _guard = ContextGuard::enter(Some(4), Some(Actor::member(1, "ana", Some(4)))).unwrap();
            let narrowed = filter_by_tenant_with::<Exam>(caller_query(), true);
            assert_eq!(
                narrowed.where_clause,
                Some(json!({ "$and": [{ "exam_code": "MATH101" }, { "company_id": 4 }] }))
            );
        });
    }

    #[test]
    fn super_actor_query_is_untouched() {
        sync_scope(|| {
            let _guard = ContextGuard::enter(Some(4), Some(Actor::superuser(1, "root", Some(4)))).unwrap();
            let narrowed = filter_by_tenant_with::<Exam>(caller_query(), true);
            assert_eq!(narrowed.where_clause, caller_query().where_clause);
        });
    }

    #[test]
    fn reference_data_is_never_narrowed() {
        sync_scope(|| {
            let _guard = ContextGuard::enter(Some(4), Some(Actor::member(1, "ana", Some(4)))).unwrap();
            let narrowed = filter_by_tenant_with::<Company>(FilterData::default(), true);
            assert!(narrowed.where_clause.is_none());
        });
    }

    #[test]
    fn missing_tenant_fails_closed() {
        sync_scope(|| {
            let narrowed = filter_by_tenant_with::<Exam>(FilterData::default(), true);
            assert_eq!(narrowed.where_clause, Some(json!({ "company_id": { "$in": [] } })));
        });
    }

    #[test]
    fn missing_tenant_can_fall_through_when_configured_open() {
        sync_scope(|| {
            let narrowed = filter_by_tenant_with::<Exam>(caller_query(), false);
            assert_eq!(narrowed.where_clause, caller_query().where_clause);
        });
    }
}
