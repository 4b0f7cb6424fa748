// tenancy/context.rs - Request-scoped tenant context
//
// Every inbound request runs inside its own task-local scope holding the
// company id and actor for that request. Deeply nested code (repositories,
// services) reads it without threading parameters through every call.

use std::cell::RefCell;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::error::TenancyError;

tokio::task_local! {
    static REQUEST_CONTEXT: RefCell<TenantContext>;
}

/// Caller identity as produced by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Option<i64>,
    pub username: String,
    pub is_authenticated: bool,
    pub is_super_actor: bool,
    pub tenant_id: Option<i64>,
}

impl Actor {
    /// Authenticated actor bound to a company
    pub fn member(id: i64, username: impl Into<String>, tenant_id: Option<i64>) -> Self {
        Self {
            id: Some(id),
            username: username.into(),
            is_authenticated: true,
            is_super_actor: false,
            tenant_id,
        }
    }

    /// Authenticated actor exempt from company filtering
    pub fn superuser(id: i64, username: impl Into<String>, tenant_id: Option<i64>) -> Self {
        Self {
            is_super_actor: true,
            ..Self::member(id, username, tenant_id)
        }
    }

    pub fn anonymous() -> Self {
        Self {
            id: None,
            username: String::new(),
            is_authenticated: false,
            is_super_actor: false,
            tenant_id: None,
        }
    }

    /// Internal super-actor for token issuance and CLI tooling
    pub fn system() -> Self {
        Self {
            id: None,
            username: "system".to_string(),
            is_authenticated: true,
            is_super_actor: true,
            tenant_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_id: Option<i64>,
    pub actor: Option<Actor>,
}

impl TenantContext {
    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_none() && self.actor.is_none()
    }
}

/// Run `fut` inside a fresh, empty context confined to the current task
pub async fn scope<F>(fut: F) -> F::Output
where
    F: Future,
{
    REQUEST_CONTEXT.scope(RefCell::new(TenantContext::default()), fut).await
}

/// Synchronous variant of [`scope`], confined to the calling thread
pub fn sync_scope<R>(f: impl FnOnce() -> R) -> R {
    REQUEST_CONTEXT.sync_scope(RefCell::new(TenantContext::default()), f)
}

/// Run `fut` as `actor` inside its own scope; the context is cleared on every exit path
pub async fn run_as<F>(actor: Actor, fut: F) -> F::Output
where
    F: Future,
{
    scope(async move {
        // Cannot fail: the scope above was just opened
        let _guard = ContextGuard::enter(actor.tenant_id, Some(actor)).ok();
        fut.await
    })
    .await
}

pub fn set_context(tenant_id: Option<i64>, actor: Option<Actor>) -> Result<(), TenancyError> {
    REQUEST_CONTEXT
        .try_with(|cell| {
            *cell.borrow_mut() = TenantContext { tenant_id, actor };
        })
        .map_err(|_| TenancyError::ContextUnavailable)
}

/// Snapshot of the current context; empty outside any scope
pub fn current() -> TenantContext {
    REQUEST_CONTEXT
        .try_with(|cell| cell.borrow().clone())
        .unwrap_or_default()
}

pub fn current_tenant_id() -> Option<i64> {
    REQUEST_CONTEXT
        .try_with(|cell| cell.borrow().tenant_id)
        .ok()
        .flatten()
}

pub fn current_actor() -> Option<Actor> {
    REQUEST_CONTEXT
        .try_with(|cell| cell.borrow().actor.clone())
        .ok()
        .flatten()
}

pub fn clear() {
    // Outside a scope there is nothing to clear
    let _ = REQUEST_CONTEXT.try_with(|cell| {
        *cell.borrow_mut() = TenantContext::default();
    });
}

/// Scoped acquisition of the request context.
///
/// Populates the context on `enter` and clears it exactly once when dropped,
/// whether the guarded work returned, failed, panicked or was cancelled.
#[must_use = "the context is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ContextGuard {
    _private: (),
}

impl ContextGuard {
    pub fn enter(tenant_id: Option<i64>, actor: Option<Actor>) -> Result<Self, TenancyError> {
        set_context(tenant_id, actor)?;
        Ok(Self { _private: () })
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::time::Duration;

    #[test]
    fn reads_are_empty_outside_scope() {
        assert_eq!(current_tenant_id(), None);
        assert_eq!(current_actor(), None);
        assert!(current().is_empty());
    }

    #[test]
    fn set_outside_scope_is_rejected() {
        let err = set_context(Some(1), None).unwrap_err();
        assert!(matches!(err, TenancyError::ContextUnavailable));
        assert!(ContextGuard::enter(Some(1), None).is_err());
    }

    #[test]
    fn guard_sets_then_clears() {
        sync_scope(|| {
            {
                let _guard = ContextGuard::enter(Some(7), Some(Actor::member(1, "ana", Some(7)))).unwrap();
                assert_eq!(current_tenant_id(), Some(7));
                assert_eq!(current_actor().map(|a| a.username), Some("ana".to_string()));
            }
            assert!(current().is_empty());
        });
    }

    #[test]
    fn guard_clears_when_work_panics() {
        sync_scope(|| {
            let result = std::panic::catch_unwind(|| {
                let _guard = ContextGuard::enter(Some(3), None).unwrap();
                panic!("handler blew up");
            });
            assert!(result.is_err());
            assert!(current().is_empty());
        });
    }

    #[test]
    fn threads_observe_independent_contexts() {
        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [1_i64, 2_i64]
            .into_iter()
            .map(|tenant| {
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    sync_scope(|| {
                        let _guard =
                            ContextGuard::enter(Some(tenant), Some(Actor::member(tenant, "t", Some(tenant)))).unwrap();
                        // Both threads hold their context at the same time
                        barrier.wait();
                        assert_eq!(current_tenant_id(), Some(tenant));
                        barrier.wait();
                        assert_eq!(current_actor().and_then(|a| a.tenant_id), Some(tenant));
                    })
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[tokio::test]
    async fn interleaved_tasks_never_see_each_other() {
        let run = |tenant: i64| async move {
            run_as(Actor::member(tenant, format!("user{tenant}"), Some(tenant)), async move {
                for _ in 0..50 {
                    assert_eq!(current_tenant_id(), Some(tenant));
                    tokio::task::yield_now().await;
                    assert_eq!(current_actor().and_then(|a| a.id), Some(tenant));
                }
            })
            .await
        };

        let a = tokio::spawn(run(10));
        let b = tokio::spawn(run(20));
        let (a, b) = futures::join!(a, b);
        a.unwrap();
        b.unwrap();
    }

    #[tokio::test]
    async fn run_as_leaves_no_residue() {
        run_as(Actor::system(), async {
            assert!(current_actor().is_some_and(|a| a.is_super_actor));
        })
        .await;

        scope(async {
            assert!(current().is_empty());
        })
        .await;
    }

    #[tokio::test]
    async fn run_as_always_installs_its_actor() {
        // No enclosing scope at all
        let outside = run_as(Actor::member(4, "dee", Some(9)), async { current() }).await;
        assert_eq!(outside.tenant_id, Some(9));
        assert_eq!(outside.actor.map(|a| a.username), Some("dee".to_string()));

        // Nested under a request scope: the inner actor wins, the outer one is restored
        scope(async {
            let _guard = ContextGuard::enter(Some(1), Some(Actor::member(1, "ann", Some(1)))).unwrap();
            let inner = run_as(Actor::system(), async { current() }).await;
            assert!(inner.actor.is_some_and(|a| a.is_super_actor));
            assert_eq!(current_tenant_id(), Some(1));
        })
        .await;
    }

    #[tokio::test]
    async fn cancelled_request_does_not_leak() {
        let observed = scope(async {
            let slow = async {
                let _guard = ContextGuard::enter(Some(5), None).unwrap();
                tokio::time::sleep(Duration::from_secs(30)).await;
            };
            // Dropped after the timeout fires; the guard is dropped with it
            let _ = tokio::time::timeout(Duration::from_millis(10), slow).await;
            current()
        })
        .await;

        assert!(observed.is_empty());
    }
}
