// Host agent: serves the volume query and resize capabilities over HTTP

mod auth;
mod http;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::remote::Credentials;
use crate::storage::StorageBackend;

/// Header carrying the account name; the password travels as a bearer token.
pub const USER_HEADER: &str = "x-volshrink-user";

#[derive(Clone)]
pub(crate) struct AgentState {
    pub(crate) storage: Arc<dyn StorageBackend>,
    pub(crate) credentials: Arc<Credentials>,
}

pub fn app(storage: Arc<dyn StorageBackend>, credentials: Credentials) -> Router {
    let state = AgentState {
        storage,
        credentials: Arc::new(credentials),
    };
    let api = Router::new()
        .route("/volume", get(http::describe_volume)) // GET /api/volume?resource=
        .route("/volume/resize", post(http::resize_volume)) // POST /api/volume/resize
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_credentials,
        ));
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
