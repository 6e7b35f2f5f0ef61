use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_utils::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn slot_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_all_slots))
        .route("/open", get(handlers::get_open_slots))
        .route("/rollover", post(handlers::run_rollover))
        .route("/doctors/{doctor_id}", get(handlers::get_slots_by_doctor))
        .route("/{slot_id}", get(handlers::get_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
