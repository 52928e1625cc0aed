use std::sync::Arc;

use axum::{routing::get, Router};

use auth_cell::router::auth_routes;
use roster_cell::router::roster_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "On-call roster API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/roster", roster_routes(state))
}
