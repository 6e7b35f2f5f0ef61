use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_utils::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::get_all_windows).post(handlers::create_window))
        .route("/doctors/{doctor_id}", get(handlers::get_windows_by_doctor))
        .route("/{schedule_id}", get(handlers::get_window).delete(handlers::delete_window))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
