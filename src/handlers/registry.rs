// handlers/registry.rs - Route table and per-type enforcer cache
//
// Routes are registered when the router is built. At request time the
// interceptor resolves the path here; viewset routes get their memoized
// TenantEnforcer inserted into the request extensions, function routes are
// left alone.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::Extensions;
use tracing::{debug, info};

use super::viewset::{TenantEnforcer, ViewSet};

type Instrument = Arc<dyn Fn(&HandlerRegistry, &mut Extensions) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| if s.starts_with(':') { Segment::Param } else { Segment::Literal(s.to_string()) })
        .collect()
}

#[derive(Clone)]
pub enum HandlerKind {
    /// Class-style handler; carries the closure that instruments it
    ViewSet { type_name: &'static str, instrument: Instrument },
    /// Plain function handler, never instrumented
    Function,
}

impl std::fmt::Debug for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HandlerKind::ViewSet { type_name, .. } => write!(f, "ViewSet({})", type_name),
            HandlerKind::Function => f.write_str("Function"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedRoute {
    pub pattern: String,
    pub kind: HandlerKind,
}

impl ResolvedRoute {
    pub fn is_viewset(&self) -> bool {
        matches!(self.kind, HandlerKind::ViewSet { .. })
    }

    /// Insert the enforcer for a viewset route; returns false for function routes
    pub fn instrument(&self, registry: &HandlerRegistry, extensions: &mut Extensions) -> bool {
        match &self.kind {
            HandlerKind::ViewSet { instrument, .. } => {
                instrument(registry, extensions);
                true
            }
            HandlerKind::Function => false,
        }
    }
}

struct Route {
    segments: Vec<Segment>,
    resolved: ResolvedRoute,
}

#[derive(Default)]
pub struct HandlerRegistry {
    enforcers: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    routes: RwLock<Vec<Route>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pattern` with viewset `V`, built by `make` on first use
    pub fn register_viewset<V, F>(&self, pattern: &str, make: F)
    where
        V: ViewSet,
        F: Fn() -> V + Send + Sync + 'static,
    {
        let instrument: Instrument = Arc::new(move |registry: &HandlerRegistry, extensions: &mut Extensions| {
            let enforcer = registry.instrument(&make);
            extensions.insert(enforcer);
        });
        self.add_route(pattern, HandlerKind::ViewSet { type_name: type_name::<V>(), instrument });
    }

    pub fn register_function(&self, pattern: &str) {
        self.add_route(pattern, HandlerKind::Function);
    }

    fn add_route(&self, pattern: &str, kind: HandlerKind) {
        debug!("Registered route {} -> {:?}", pattern, kind);
        let route = Route {
            segments: parse_pattern(pattern),
            resolved: ResolvedRoute { pattern: pattern.to_string(), kind },
        };
        self.routes.write().unwrap_or_else(PoisonError::into_inner).push(route);
    }

    /// First registered route whose pattern matches `path`
    pub fn resolve(&self, path: &str) -> Option<ResolvedRoute> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        routes
            .iter()
            .find(|route| {
                route.segments.len() == parts.len()
                    && route.segments.iter().zip(&parts).all(|(segment, part)| match segment {
                        Segment::Literal(lit) => lit == part,
                        Segment::Param => true,
                    })
            })
            .map(|route| route.resolved.clone())
    }

    /// The enforcer for `V`, wrapping a fresh viewset exactly once per process
    pub fn instrument<V, F>(&self, make: F) -> Arc<TenantEnforcer<V>>
    where
        V: ViewSet,
        F: FnOnce() -> V,
    {
        let key = TypeId::of::<V>();
        if let Some(existing) = self.lookup::<V>(key) {
            return existing;
        }

        let mut enforcers = self.enforcers.write().unwrap_or_else(PoisonError::into_inner);
        // Another request may have won the race between the two locks
        if let Some(existing) = enforcers.get(&key).cloned().and_then(|any| any.downcast::<TenantEnforcer<V>>().ok()) {
            return existing;
        }

        let enforcer = Arc::new(TenantEnforcer::new(make()));
        enforcers.insert(key, enforcer.clone());
        info!("Instrumented {} with company enforcement", type_name::<V>());
        enforcer
    }

    fn lookup<V: ViewSet>(&self, key: TypeId) -> Option<Arc<TenantEnforcer<V>>> {
        let enforcers = self.enforcers.read().unwrap_or_else(PoisonError::into_inner);
        enforcers.get(&key).cloned().and_then(|any| any.downcast::<TenantEnforcer<V>>().ok())
    }

    pub fn is_instrumented<V: ViewSet>(&self) -> bool {
        self.lookup::<V>(TypeId::of::<V>()).is_some()
    }

    /// Number of viewset types wrapped so far
    pub fn instrumented_count(&self) -> usize {
        self.enforcers.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
