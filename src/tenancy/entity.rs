use crate::database::entity::Entity;

use super::context;
use super::error::TenancyError;

/// Assign the owning company before a save.
///
/// An explicit company on the record wins over the context. Saves of
/// tenant-scoped records with no resolvable company are refused.
pub fn stamp_tenant<E: Entity>(entity: &mut E) -> Result<(), TenancyError> {
    let context_tenant = context::current_tenant_id();

    if !E::is_tenant_scoped() {
        return Ok(());
    }

    if entity.tenant_id().is_none() {
        if let Some(tenant_id) = context_tenant {
            entity.set_tenant_id(tenant_id);
        }
    }

    if entity.tenant_id().is_none() {
        tracing::warn!("Refusing to save {} without a company", E::TABLE);
        return Err(TenancyError::TenantRequired);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Company, Exam};
    use crate::tenancy::context::{sync_scope, Actor, ContextGuard};

    #[test]
    fn fills_company_from_context() {
        sync_scope(|| {
            let _guard = ContextGuard::enter(Some(9), Some(Actor::member(1, "ana", Some(9)))).unwrap();
            let mut exam = Exam::new("Algebra", "MATH101");
            stamp_tenant(&mut exam).unwrap();
            assert_eq!(exam.company_id, Some(9));
        });
    }

    #[test]
    fn keeps_preassigned_company() {
        sync_scope(|| {
            let _guard = ContextGuard::enter(Some(9), Some(Actor::member(1, "ana", Some(9)))).unwrap();
            let mut exam = Exam::new("Algebra", "MATH101");
            exam.company_id = Some(2);
            stamp_tenant(&mut exam).unwrap();
            assert_eq!(exam.company_id, Some(2));
        });
    }

    #[test]
    fn refuses_without_any_company() {
        sync_scope(|| {
            let _guard = ContextGuard::enter(None, Some(Actor::system())).unwrap();
            let mut exam = Exam::new("Algebra", "MATH101");
            assert_eq!(stamp_tenant(&mut exam), Err(TenancyError::TenantRequired));
        });

        let mut exam = Exam::new("Algebra", "MATH101");
        assert_eq!(stamp_tenant(&mut exam), Err(TenancyError::TenantRequired));
    }

    #[test]
    fn reference_data_needs_no_company() {
        let mut company = Company::new("Acme");
        assert!(stamp_tenant(&mut company).is_ok());
    }
}
