// app.rs - Router assembly
//
// Every route is registered twice: with axum for dispatch and with the
// HandlerRegistry so the tenant interceptor can tell viewset routes from
// function routes.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::MethodRouter,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, HttpMakeClassifier, TraceLayer},
};
use tracing::Level;

use crate::config::{config, SecurityConfig, TenancyConfig};
use crate::database::Store;
use crate::handlers::{
    artifacts::{self, SessionPhotoViewSet, SessionRecordViewSet},
    exams::{self, ExamViewSet},
    reports, root,
    sessions::{self, SessionViewSet},
    token,
    users::{self, UserViewSet},
    HandlerRegistry, ViewSet,
};
use crate::middleware::{auth_middleware, tenant_middleware, TenantState};
use crate::services::{ProctoringService, UserService};

type Routes = Vec<(&'static str, MethodRouter<AppState>)>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: Arc<HandlerRegistry>,
    pub proctoring: Arc<ProctoringService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            registry: Arc::new(HandlerRegistry::new()),
            proctoring: Arc::new(ProctoringService::new(store.clone())),
            users: Arc::new(UserService::new(store.clone())),
            store,
        }
    }
}

pub fn build_app(store: Arc<dyn Store>) -> Router {
    build_router(AppState::new(store))
}

pub fn build_router(state: AppState) -> Router {
    build_router_with(state, config().tenancy.clone())
}

/// Same as [`build_router`] with an explicit tenancy policy
pub fn build_router_with(state: AppState, tenancy: TenancyConfig) -> Router {
    let registry = state.registry.clone();
    let mut router = Router::new();

    router = mount_functions(router, &registry, root::routes());
    router = mount_functions(router, &registry, token::routes());
    router = mount_functions(router, &registry, reports::routes());

    let store = state.store.clone();
    router = mount_viewset(router, &registry, move || ExamViewSet::new(store.clone()), exams::routes());

    let user_service = state.users.clone();
    router = mount_viewset(router, &registry, move || UserViewSet::new(user_service.clone()), users::routes());

    let (store, proctoring) = (state.store.clone(), state.proctoring.clone());
    router = mount_viewset(
        router,
        &registry,
        move || SessionViewSet::new(store.clone(), proctoring.clone()),
        sessions::routes(),
    );

    let store = state.store.clone();
    router = mount_viewset(router, &registry, move || SessionPhotoViewSet::new(store.clone()), artifacts::photo_routes());

    let store = state.store.clone();
    router = mount_viewset(router, &registry, move || SessionRecordViewSet::new(store.clone()), artifacts::record_routes());

    let tenant_state = TenantState {
        registry,
        tenancy: Arc::new(tenancy),
    };

    // Layers run outermost-last: auth resolves the Actor before the tenant interceptor reads it
    router
        .layer(from_fn_with_state(tenant_state, tenant_middleware))
        .layer(from_fn(auth_middleware))
        .layer(DefaultBodyLimit::max(config().api.max_request_size_bytes))
        .layer(trace_layer())
        .layer(cors_layer(&config().security))
        .with_state(state)
}

fn mount_viewset<V, F>(mut router: Router<AppState>, registry: &HandlerRegistry, make: F, routes: Routes) -> Router<AppState>
where
    V: ViewSet,
    F: Fn() -> V + Clone + Send + Sync + 'static,
{
    for (pattern, method_router) in routes {
        registry.register_viewset(pattern, make.clone());
        router = router.route(pattern, method_router);
    }
    router
}

fn mount_functions(mut router: Router<AppState>, registry: &HandlerRegistry, routes: Routes) -> Router<AppState> {
    for (pattern, method_router) in routes {
        registry.register_function(pattern);
        router = router.route(pattern, method_router);
    }
    router
}

/// Request spans at INFO when request logging is on, DEBUG otherwise
fn trace_layer() -> TraceLayer<HttpMakeClassifier> {
    let level = if config().api.enable_request_logging { Level::INFO } else { Level::DEBUG };
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(level))
        .on_response(DefaultOnResponse::new().level(level))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
