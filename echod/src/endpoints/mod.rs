//! HTTP endpoints served by echod
//!
//! - **echo**: diagnostic envelopes describing the request and the host
//! - **items**: CRUD access to the in-memory item store
//! - **status**: liveness probe

use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use instance_metadata::Resolver;
use tower_http::trace::TraceLayer;

use crate::store::ItemStore;

pub mod echo;
pub mod items;
pub mod status;

/// Fixed tags reported in every diagnostic envelope
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceTags {
    pub platform: String,
    pub deployment: String,
}

/// Everything the handlers share. Built once at startup and cloned into each request.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: Arc<ItemStore>,
    pub resolver: Arc<dyn Resolver>,
    pub tags: Arc<ServiceTags>,
}

impl AppState {
    pub fn new(store: ItemStore, resolver: impl Into<Arc<dyn Resolver>>, tags: ServiceTags) -> Self {
        Self {
            store: Arc::new(store),
            resolver: resolver.into(),
            tags: Arc::new(tags),
        }
    }
}

/// Static segments take precedence over the `:pathParam` catch-alls
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(echo::root))
        .route("/status", status::create_endpoint())
        .route("/items", get(items::list).post(items::create))
        .route(
            "/items/:id",
            get(items::get).put(items::update).delete(items::delete),
        )
        .route("/:pathParam", get(echo::path_param))
        .route("/:pathParam/query", get(echo::path_param_query))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
