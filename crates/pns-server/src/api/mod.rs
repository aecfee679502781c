//! HTTP API for the registry.

mod handlers;
mod middleware;
mod types;

pub use handlers::*;
pub use middleware::{
    logging_middleware, rate_limit_middleware, Caller, RateLimitState, CALLER_HEADER,
};
pub use types::*;

use crate::persistence::Store;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use pns_core::{DeferredEventSink, MemoryEventSink, Registry};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Phone number registry
    pub registry: Arc<RwLock<Registry>>,
    /// Snapshot storage backend
    pub store: Arc<Store>,
    /// Recent events, fed by the registry's event sink
    pub events: MemoryEventSink,
    /// Events of the mutation in flight, published once it is saved
    pub pending: DeferredEventSink,
}

impl AppState {
    /// Create new application state.
    ///
    /// The registry should emit into `pending`, and `pending` should
    /// forward to `events`.
    pub fn new(
        registry: Registry,
        store: Store,
        events: MemoryEventSink,
        pending: DeferredEventSink,
    ) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            store: Arc::new(store),
            events,
            pending,
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(60))
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Verification
        .route(
            "/v1/verifications/:phone_hash",
            post(handlers::set_verification_status),
        )
        // Record lifecycle
        .route(
            "/v1/records/:phone_hash",
            post(handlers::create_record).get(handlers::get_record),
        )
        .route("/v1/records/:phone_hash/renew", post(handlers::renew))
        .route("/v1/records/:phone_hash/claim", post(handlers::claim))
        .route(
            "/v1/records/:phone_hash/resolvers",
            post(handlers::link_resolver).get(handlers::get_resolvers),
        )
        // Administration
        .route("/v1/admin/expiry-time", put(handlers::set_expiry_time))
        .route("/v1/admin/grace-period", put(handlers::set_grace_period))
        .route("/v1/config", get(handlers::get_config))
        .route("/v1/events", get(handlers::list_events))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
