// middleware/tenant.rs - Request interceptor binding each request to its company
//
// Runs after auth_middleware. Exempt paths pass straight through. Everything
// else runs inside a fresh context scope populated from the authenticated
// Actor, with the route's viewset instrumented before the handler runs.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::config::TenancyConfig;
use crate::error::ApiError;
use crate::handlers::registry::HandlerRegistry;
use crate::tenancy::{context, Actor, ContextGuard};

#[derive(Clone)]
pub struct TenantState {
    pub registry: Arc<HandlerRegistry>,
    pub tenancy: Arc<TenancyConfig>,
}

pub async fn tenant_middleware(State(state): State<TenantState>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if state.tenancy.is_exempt(&path) {
        debug!("{} is exempt from company scoping", path);
        return next.run(request).await;
    }

    context::scope(scoped(state, path, request, next)).await
}

async fn scoped(state: TenantState, path: String, mut request: Request, next: Next) -> Response {
    let actor = request
        .extensions()
        .get::<Actor>()
        .filter(|actor| actor.is_authenticated)
        .cloned();
    let tenant_id = actor.as_ref().and_then(|actor| actor.tenant_id);

    // Cleared when the guard drops, on every exit path
    let _guard = match ContextGuard::enter(tenant_id, actor) {
        Ok(guard) => guard,
        Err(e) => return ApiError::from(e).into_response(),
    };
    debug!("Context set for {} (company={:?})", path, tenant_id);

    match state.registry.resolve(&path) {
        Some(route) => {
            if route.instrument(&state.registry, request.extensions_mut()) {
                debug!("Instrumented handler for {}", route.pattern);
            } else {
                debug!("Function handler for {}; not instrumented", route.pattern);
            }
        }
        None => debug!("No registered handler for {}", path),
    }

    next.run(request).await
}
