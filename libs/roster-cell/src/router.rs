use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn roster_routes(state: Arc<AppConfig>) -> Router {
    // Every roster route acts on the caller's own doctors.
    Router::new()
        .route("/", get(handlers::get_roster))
        .route("/agenda", get(handlers::get_agenda))
        .route("/doctors", get(handlers::list_doctors).post(handlers::create_doctor))
        .route(
            "/doctors/{doctor_id}",
            get(handlers::get_doctor)
                .put(handlers::update_doctor)
                .delete(handlers::delete_doctor),
        )
        .route("/doctors/{doctor_id}/editor", get(handlers::get_doctor_editor))
        .route("/specialties", post(handlers::add_specialty))
        .route("/neighborhoods", post(handlers::add_neighborhood))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
