use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_cell::router::booking_routes;
use schedule_cell::router::schedule_routes;
use shared_utils::AppState;
use slot_cell::router::slot_routes;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/schedules", schedule_routes(state.clone()))
        .nest("/slots", slot_routes(state.clone()))
        .nest("/bookings", booking_routes(state))
}
